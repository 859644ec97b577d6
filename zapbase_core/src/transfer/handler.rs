use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde_json::{Map, Value};

use super::dto::{TransferReceipt, TransferRequest};
use crate::{
    error::TransferError,
    helpers::{config::ZapConfig, utils::explorer_tx_url},
};

/// Executes a confirmed transfer.
#[async_trait]
pub trait AssetTransfer: Send + Sync {
    async fn send_asset(
        &self,
        amount: f64,
        token: &str,
        recipient: &str,
    ) -> Result<TransferReceipt, TransferError>;
}

/// Client for the remote asset-sender service, which resolves the base name and
/// signs the transaction on its side.
#[derive(Clone)]
pub struct AssetSender {
    client: Client,
    url: String,
    explorer_url: String,
    top_up_url: String,
}

impl AssetSender {
    pub fn new(url: String, explorer_url: String, top_up_url: String) -> Self {
        Self {
            client: Client::new(),
            url,
            explorer_url,
            top_up_url,
        }
    }

    pub fn from_config(config: &ZapConfig) -> Self {
        Self::new(
            config.transfer_api_url.clone(),
            config.explorer_url.clone(),
            config.top_up_url.clone(),
        )
    }
}

#[async_trait]
impl AssetTransfer for AssetSender {
    async fn send_asset(
        &self,
        amount: f64,
        token: &str,
        recipient: &str,
    ) -> Result<TransferReceipt, TransferError> {
        let request = TransferRequest::new(amount, token, recipient);
        info!(
            "💸 Sending {} to {} (isEth: {})",
            request.amount, request.recipient, request.is_eth
        );

        let payload = serde_json::to_vec(&request).map_err(|e| {
            error!("❌ Error marshaling transfer payload: {}", e);
            TransferError::Prepare(e)
        })?;

        let http_request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .build()
            .map_err(|e| {
                error!("❌ Error creating transfer request: {}", e);
                TransferError::Build(e)
            })?;

        debug!("🌐 Making transfer service request to: {}", self.url);
        let response = self.client.execute(http_request).await.map_err(|e| {
            error!("❌ Network error during transfer service call: {}", e);
            if e.is_timeout() {
                error!("⏰ Request timed out");
            } else if e.is_connect() {
                error!("🔌 Connection failed - server may be down");
            }
            TransferError::Unreachable(e)
        })?;

        let status = response.status();
        debug!("📡 Transfer service response status: {}", status);

        let body = response.bytes().await.map_err(|e| {
            error!("❌ Error reading transfer service response: {}", e);
            TransferError::ReadBody(e)
        })?;

        if status != StatusCode::OK {
            let body = String::from_utf8_lossy(&body).into_owned();
            error!("❌ Transfer service responded with {}: {}", status, body);
            return Err(TransferError::Rejected { status, body });
        }

        let result: Map<String, Value> = serde_json::from_slice(&body).map_err(|e| {
            error!("❌ Error parsing transfer response JSON: {}", e);
            TransferError::InvalidResponse(e)
        })?;

        match result.get("txHash").and_then(Value::as_str) {
            Some(tx_hash) => {
                info!("✅ Transfer submitted with hash {}", tx_hash);
                Ok(TransferReceipt {
                    tx_hash: tx_hash.to_string(),
                    explorer_url: explorer_tx_url(&self.explorer_url, tx_hash),
                })
            }
            None => {
                warn!("⚠️ Transfer response carried no txHash, treating as insufficient funds");
                Err(TransferError::InsufficientFunds {
                    top_up_url: self.top_up_url.clone(),
                })
            }
        }
    }
}
