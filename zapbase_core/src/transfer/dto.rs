use serde::{Deserialize, Serialize};

use crate::error::IntentError;

/// Symbol of the chain's base currency.
pub const NATIVE_ASSET_SYMBOL: &str = "eth";

/// Body posted to the asset-transfer service.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: f64,
    #[serde(rename = "isEth")]
    pub is_eth: bool,
}

impl TransferRequest {
    pub fn new(amount: f64, token: &str, recipient: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            amount,
            is_eth: token.eq_ignore_ascii_case(NATIVE_ASSET_SYMBOL),
        }
    }
}

/// Raw strings pulled out of a transfer message, not yet validated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PendingTransferFields {
    pub amount: String,
    pub token: String,
    pub recipient: String,
}

/// A validated transfer waiting for the user to reply "yes".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransferIntent {
    pub amount: f64,
    pub token: String,
    pub recipient: String,
}

/// Successful transfer as reported by the transfer service.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub tx_hash: String,
    pub explorer_url: String,
}

impl std::fmt::Display for TransferReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transfer succeeded! Check the Transaction hash {}", self.explorer_url)
    }
}

impl PendingTransferFields {
    /// Turns the extracted strings into a transfer intent.
    ///
    /// The amount must parse as a finite decimal greater than zero, and the token
    /// and recipient must both be present.
    pub fn resolve(&self) -> Result<TransferIntent, IntentError> {
        let amount: f64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| IntentError::InvalidAmount(self.amount.clone()))?;

        if !amount.is_finite() {
            return Err(IntentError::InvalidAmount(self.amount.clone()));
        }
        if amount <= 0.0 {
            return Err(IntentError::NonPositiveAmount(self.amount.clone()));
        }

        let token = self.token.trim();
        if token.is_empty() {
            return Err(IntentError::MissingToken);
        }

        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(IntentError::MissingRecipient);
        }

        Ok(TransferIntent {
            amount,
            token: token.to_string(),
            recipient: recipient.to_string(),
        })
    }
}

impl TransferIntent {
    pub fn confirmation_prompt(&self) -> String {
        format!(
            "Kindly confirm you want to send {} {} to {}. Reply with 'yes' to confirm.",
            self.amount, self.token, self.recipient
        )
    }

    pub fn cancellation_notice(&self) -> String {
        format!(
            "Your pending transfer of {} {} to {} was cancelled.",
            self.amount, self.token, self.recipient
        )
    }
}
