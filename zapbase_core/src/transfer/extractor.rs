//! Pulls transfer parameters out of free text such as
//! "Send 0.5 ETH to alice.base.eth".

use regex::Regex;
use std::sync::LazyLock;

use super::dto::PendingTransferFields;
use crate::error::FORMAT_HINT;

static TRANSFER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // The recipient must end the word; trailing punctuation is allowed
    Regex::new(
        r"(?i)send\s+(\d+(?:\.\d+)?)\s*(eth|token)?\s+to\s+([a-z0-9.-]+\.base\.eth)[.,!?;:]*(?:\s|$)",
    )
    .expect("transfer pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Matched(PendingTransferFields),
    NoMatch { clarification: String },
}

pub fn extract_transfer(text: &str) -> Extraction {
    let Some(captures) = TRANSFER_PATTERN.captures(text) else {
        return Extraction::NoMatch {
            clarification: format!("I couldn't find the transfer details. {}", FORMAT_HINT),
        };
    };

    let field = |index: usize| {
        captures
            .get(index)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    Extraction::Matched(PendingTransferFields {
        amount: field(1),
        token: field(2),
        recipient: field(3),
    })
}
