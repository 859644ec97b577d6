use anyhow::{Result, anyhow};
use std::env;

pub const DEFAULT_GEMINI_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
pub const DEFAULT_TRANSFER_API_URL: &str = "https://ens-asset-sender.onrender.com/send-asset";
pub const DEFAULT_EXPLORER_URL: &str = "https://sepolia.basescan.org";
pub const DEFAULT_TOP_UP_URL: &str = "https://zapbase-imara1.vercel.app/";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Runtime settings, read once from the process environment at startup.
///
/// Deliberately not `Debug`: it carries the bot token and the Gemini key.
#[derive(Clone)]
pub struct ZapConfig {
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub transfer_api_url: String,
    pub explorer_url: String,
    pub top_up_url: String,
    pub state_db_path: Option<String>,
    pub http_addr: String,
}

impl ZapConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN environment variable not set"))?;

        let gemini_api_key = get("GEMINI_API_KEY").unwrap_or_else(|| {
            log::warn!("GEMINI_API_KEY not set, completion requests will be unauthenticated");
            String::new()
        });

        Ok(Self {
            telegram_bot_token,
            gemini_api_key,
            gemini_api_url: get("GEMINI_API_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            transfer_api_url: get("TRANSFER_API_URL")
                .unwrap_or_else(|| DEFAULT_TRANSFER_API_URL.to_string()),
            explorer_url: get("EXPLORER_URL").unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string()),
            top_up_url: get("TOP_UP_URL").unwrap_or_else(|| DEFAULT_TOP_UP_URL.to_string()),
            state_db_path: get("ZAPBASE_STATE_DB"),
            http_addr: get("ZAPBASE_HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string()),
        })
    }
}
