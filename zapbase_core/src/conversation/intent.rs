use std::borrow::Cow;

pub const BALANCE_CONTEXT: &str = "Check my balance.";
pub const HELP_CONTEXT: &str = "I want to know about Zapbase.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Affirmative reply to a pending transfer.
    Confirm,
    Transfer,
    Balance,
    Help,
    General,
}

/// Keyword routing, first match wins.
pub fn classify(text: &str) -> Intent {
    if text.trim().eq_ignore_ascii_case("yes") {
        return Intent::Confirm;
    }

    let lower = text.to_lowercase();
    if lower.contains("send") && lower.contains("eth") {
        Intent::Transfer
    } else if lower.contains("balance") {
        Intent::Balance
    } else if lower.contains("help") {
        Intent::Help
    } else {
        Intent::General
    }
}

impl Intent {
    /// Context handed to the AI responder when this intent falls through to it.
    pub fn ai_context<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            Intent::Balance => Cow::Borrowed(BALANCE_CONTEXT),
            Intent::Help => Cow::Borrowed(HELP_CONTEXT),
            Intent::Confirm | Intent::Transfer | Intent::General => Cow::Borrowed(text),
        }
    }
}
