use reqwest::StatusCode;
use thiserror::Error;

pub const FORMAT_HINT: &str = "Please specify it in the format 'send <amount> eth to <recipient>'";

/// Ways a transfer can fail. The `Display` text is what the user is sent.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to prepare transaction")]
    Prepare(#[source] serde_json::Error),
    #[error("Failed to send transaction")]
    Build(#[source] reqwest::Error),
    #[error("Failed to reach transaction server")]
    Unreachable(#[source] reqwest::Error),
    #[error("Failed to read server response")]
    ReadBody(#[source] reqwest::Error),
    #[error("Transaction failed: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("Invalid response from server")]
    InvalidResponse(#[source] serde_json::Error),
    #[error("Transfer failed due to insufficient funds. Top up your wallet here: {top_up_url}")]
    InsufficientFunds { top_up_url: String },
}

/// Extracted transfer fields that cannot become a transfer intent.
#[derive(Debug, Error, PartialEq)]
pub enum IntentError {
    #[error("I couldn't parse the amount you provided. {}", FORMAT_HINT)]
    InvalidAmount(String),
    #[error("The amount to send must be greater than zero. {}", FORMAT_HINT)]
    NonPositiveAmount(String),
    #[error("I couldn't find the token you want to send. {}", FORMAT_HINT)]
    MissingToken,
    #[error("I couldn't find the recipient you want to send to. {}", FORMAT_HINT)]
    MissingRecipient,
}
