//! Per-message state machine.
//!
//! A conversation is `idle` until a transfer request resolves into an intent,
//! then `awaiting-confirmation` until the next exact "yes" executes it. The
//! intent is removed from the store before the transfer runs, so a confirmation
//! can never execute it twice. A new transfer request that fails validation
//! cancels the pending intent; anything else is answered by the AI responder and
//! leaves it in place.

use log::{debug, error, info, warn};
use std::sync::Arc;

use super::{
    intent::{Intent, classify},
    storage::ConversationStore,
};
use crate::{
    ai::handler::Responder,
    helpers::utils::count_phrase,
    transfer::{
        dto::TransferIntent,
        extractor::{Extraction, extract_transfer},
        handler::AssetTransfer,
    },
};

pub const APOLOGY: &str = "Oops! Something went wrong.";
pub const REPHRASE_REQUEST: &str = "Hmm... I didn't quite get that. Could you rephrase?";
pub const STORE_FAILURE: &str =
    "I couldn't save your transfer details right now. Please try again in a moment.";

const APOLOGY_PHRASE: &str = "I'm sorry";
const MAX_APOLOGIES: usize = 3;

#[derive(Clone)]
pub struct ConversationFlow {
    store: Arc<dyn ConversationStore>,
    responder: Arc<dyn Responder>,
    transfers: Arc<dyn AssetTransfer>,
}

impl ConversationFlow {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        responder: Arc<dyn Responder>,
        transfers: Arc<dyn AssetTransfer>,
    ) -> Self {
        Self {
            store,
            responder,
            transfers,
        }
    }

    /// Handles one inbound text and returns the reply to send back.
    pub async fn handle_text(&self, conversation_id: i64, text: &str) -> String {
        let intent = classify(text);
        debug!("Conversation {} classified as {:?}", conversation_id, intent);

        match intent {
            Intent::Confirm => {
                match self.store.take_intent(conversation_id) {
                    Ok(Some(pending)) => {
                        return self.execute_transfer(conversation_id, pending).await;
                    }
                    Ok(None) => {
                        debug!("No pending transfer for conversation {}", conversation_id)
                    }
                    Err(e) => {
                        error!("Failed to take transfer intent for {}: {}", conversation_id, e);
                        return STORE_FAILURE.to_string();
                    }
                }
            }
            Intent::Transfer => return self.prepare_transfer(conversation_id, text),
            Intent::Balance | Intent::Help | Intent::General => {}
        }

        self.ai_reply(&intent.ai_context(text)).await
    }

    fn prepare_transfer(&self, conversation_id: i64, text: &str) -> String {
        let fields = match extract_transfer(text) {
            Extraction::Matched(fields) => fields,
            Extraction::NoMatch { clarification } => {
                debug!("No transfer pattern in conversation {}", conversation_id);
                return clarification;
            }
        };

        if let Err(e) = self.store.set_pending_fields(conversation_id, fields.clone()) {
            error!("Failed to store transfer fields for {}: {}", conversation_id, e);
            return STORE_FAILURE.to_string();
        }

        let intent = match fields.resolve() {
            Ok(intent) => intent,
            Err(e) => {
                info!("Unresolved transfer in conversation {}: {:?}", conversation_id, e);
                return match self.store.take_intent(conversation_id) {
                    Ok(Some(stale)) => format!("{}\n\n{}", e, stale.cancellation_notice()),
                    Ok(None) => e.to_string(),
                    Err(e) => {
                        error!("Failed to cancel transfer intent for {}: {}", conversation_id, e);
                        STORE_FAILURE.to_string()
                    }
                };
            }
        };

        let prompt = intent.confirmation_prompt();
        if let Err(e) = self.store.set_intent(conversation_id, intent) {
            error!("Failed to store transfer intent for {}: {}", conversation_id, e);
            return STORE_FAILURE.to_string();
        }

        info!("Transfer awaiting confirmation in conversation {}", conversation_id);
        prompt
    }

    async fn execute_transfer(&self, conversation_id: i64, intent: TransferIntent) -> String {
        info!(
            "Executing confirmed transfer of {} {} to {} for conversation {}",
            intent.amount, intent.token, intent.recipient, conversation_id
        );

        match self
            .transfers
            .send_asset(intent.amount, &intent.token, &intent.recipient)
            .await
        {
            Ok(receipt) => receipt.to_string(),
            Err(e) => {
                warn!("Transfer failed for conversation {}: {:?}", conversation_id, e);
                e.to_string()
            }
        }
    }

    async fn ai_reply(&self, context: &str) -> String {
        match self.responder.respond(context).await {
            Ok(reply) => guard_repetition(reply),
            Err(e) => {
                error!("Error getting AI response: {}", e);
                APOLOGY.to_string()
            }
        }
    }
}

/// Replaces replies that keep apologising with a request to rephrase.
pub fn guard_repetition(reply: String) -> String {
    if count_phrase(&reply, APOLOGY_PHRASE) > MAX_APOLOGIES {
        REPHRASE_REQUEST.to_string()
    } else {
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        conversation::{
            intent::{BALANCE_CONTEXT, HELP_CONTEXT},
            storage::InMemoryConversationStore,
        },
        error::TransferError,
        transfer::dto::{PendingTransferFields, TransferReceipt},
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const CHAT: i64 = 1001;

    struct FakeResponder {
        reply: Option<String>,
        contexts: Mutex<Vec<String>>,
    }

    impl FakeResponder {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                contexts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                contexts: Mutex::new(Vec::new()),
            })
        }

        fn contexts(&self) -> Vec<String> {
            self.contexts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Responder for FakeResponder {
        async fn respond(&self, context: &str) -> anyhow::Result<String> {
            self.contexts.lock().unwrap().push(context.to_string());
            self.reply.clone().ok_or_else(|| anyhow!("connection refused"))
        }
    }

    struct FakeTransfers {
        succeed: bool,
        calls: Mutex<Vec<(f64, String, String)>>,
    }

    impl FakeTransfers {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(f64, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AssetTransfer for FakeTransfers {
        async fn send_asset(
            &self,
            amount: f64,
            token: &str,
            recipient: &str,
        ) -> Result<TransferReceipt, TransferError> {
            self.calls
                .lock()
                .unwrap()
                .push((amount, token.to_string(), recipient.to_string()));
            if self.succeed {
                Ok(TransferReceipt {
                    tx_hash: "0xabc".to_string(),
                    explorer_url: "https://sepolia.basescan.org/tx/0xabc".to_string(),
                })
            } else {
                Err(TransferError::InsufficientFunds {
                    top_up_url: "https://zapbase-imara1.vercel.app/".to_string(),
                })
            }
        }
    }

    /// Wraps the in-memory store and fails every intent removal.
    struct StuckIntentStore {
        inner: InMemoryConversationStore,
    }

    impl ConversationStore for StuckIntentStore {
        fn set_pending_fields(&self, id: i64, fields: PendingTransferFields) -> anyhow::Result<()> {
            self.inner.set_pending_fields(id, fields)
        }

        fn get_pending_fields(&self, id: i64) -> Option<PendingTransferFields> {
            self.inner.get_pending_fields(id)
        }

        fn set_intent(&self, id: i64, intent: TransferIntent) -> anyhow::Result<()> {
            self.inner.set_intent(id, intent)
        }

        fn get_intent(&self, id: i64) -> Option<TransferIntent> {
            self.inner.get_intent(id)
        }

        fn clear_intent(&self, _id: i64) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }

        fn take_intent(&self, _id: i64) -> anyhow::Result<Option<TransferIntent>> {
            Err(anyhow!("disk full"))
        }
    }

    struct Harness {
        flow: ConversationFlow,
        store: Arc<InMemoryConversationStore>,
        responder: Arc<FakeResponder>,
        transfers: Arc<FakeTransfers>,
    }

    fn harness(responder: Arc<FakeResponder>, transfers: Arc<FakeTransfers>) -> Harness {
        let store = Arc::new(InMemoryConversationStore::new());
        let flow = ConversationFlow::new(store.clone(), responder.clone(), transfers.clone());
        Harness {
            flow,
            store,
            responder,
            transfers,
        }
    }

    #[tokio::test]
    async fn test_transfer_request_asks_for_confirmation() {
        let h = harness(FakeResponder::replying("unused"), FakeTransfers::new(true));

        let reply = h.flow.handle_text(CHAT, "Send 0.5 ETH to alice.base.eth").await;

        assert_eq!(
            reply,
            "Kindly confirm you want to send 0.5 ETH to alice.base.eth. Reply with 'yes' to confirm."
        );
        assert_eq!(
            h.store.get_pending_fields(CHAT),
            Some(PendingTransferFields {
                amount: "0.5".to_string(),
                token: "ETH".to_string(),
                recipient: "alice.base.eth".to_string(),
            })
        );
        assert_eq!(
            h.store.get_intent(CHAT),
            Some(TransferIntent {
                amount: 0.5,
                token: "ETH".to_string(),
                recipient: "alice.base.eth".to_string(),
            })
        );
        assert!(h.responder.contexts().is_empty());
        assert!(h.transfers.calls().is_empty());
    }

    #[tokio::test]
    async fn test_yes_executes_once_and_clears() {
        let h = harness(FakeResponder::replying("unused"), FakeTransfers::new(true));

        h.flow.handle_text(CHAT, "Send 0.5 ETH to alice.base.eth").await;
        let reply = h.flow.handle_text(CHAT, "  Yes ").await;

        assert_eq!(
            reply,
            "Transfer succeeded! Check the Transaction hash https://sepolia.basescan.org/tx/0xabc"
        );
        assert_eq!(
            h.transfers.calls(),
            vec![(0.5, "ETH".to_string(), "alice.base.eth".to_string())]
        );
        assert!(h.store.get_intent(CHAT).is_none());

        // A second "yes" has nothing to confirm and goes to the AI
        h.flow.handle_text(CHAT, "yes").await;
        assert_eq!(h.transfers.calls().len(), 1);
        assert_eq!(h.responder.contexts(), vec!["yes".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_transfer_still_clears_intent() {
        let h = harness(FakeResponder::replying("unused"), FakeTransfers::new(false));

        h.flow.handle_text(CHAT, "send 2 eth to bob.base.eth").await;
        let reply = h.flow.handle_text(CHAT, "YES").await;

        assert!(reply.starts_with("Transfer failed due to insufficient funds"));
        assert_eq!(h.transfers.calls().len(), 1);
        assert!(h.store.get_intent(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_yes_without_pending_goes_to_ai() {
        let h = harness(FakeResponder::replying("What would you like to do?"), FakeTransfers::new(true));

        let reply = h.flow.handle_text(CHAT, "yes").await;

        assert_eq!(reply, "What would you like to do?");
        assert_eq!(h.responder.contexts(), vec!["yes".to_string()]);
        assert!(h.transfers.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pending_intent_is_scoped_to_conversation() {
        let h = harness(FakeResponder::replying("ok"), FakeTransfers::new(true));

        h.flow.handle_text(CHAT, "send 1 eth to alice.base.eth").await;
        h.flow.handle_text(CHAT + 1, "yes").await;

        assert!(h.transfers.calls().is_empty());
        assert!(h.store.get_intent(CHAT).is_some());
    }

    #[tokio::test]
    async fn test_other_message_keeps_pending_intent() {
        let h = harness(FakeResponder::replying("Sure."), FakeTransfers::new(true));

        h.flow.handle_text(CHAT, "send 1 eth to alice.base.eth").await;
        let reply = h.flow.handle_text(CHAT, "wait, what are the fees?").await;

        assert_eq!(reply, "Sure.");
        assert!(h.store.get_intent(CHAT).is_some());
        assert!(h.transfers.calls().is_empty());

        // Confirmation still works afterwards
        h.flow.handle_text(CHAT, "yes").await;
        assert_eq!(h.transfers.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_new_request_overwrites_pending_intent() {
        let h = harness(FakeResponder::replying("unused"), FakeTransfers::new(true));

        h.flow.handle_text(CHAT, "send 1 eth to alice.base.eth").await;
        h.flow.handle_text(CHAT, "send 3 token to bob.base.eth").await;
        h.flow.handle_text(CHAT, "yes").await;

        assert_eq!(
            h.transfers.calls(),
            vec![(3.0, "token".to_string(), "bob.base.eth".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unmatched_request_asks_for_details() {
        let h = harness(FakeResponder::replying("unused"), FakeTransfers::new(true));

        h.flow.handle_text(CHAT, "send 1 eth to alice.base.eth").await;
        let reply = h.flow.handle_text(CHAT, "send eth to my friend").await;

        assert!(reply.contains("send <amount> eth to <recipient>"));
        // Earlier fields and intent are untouched
        assert_eq!(h.store.get_pending_fields(CHAT).unwrap().recipient, "alice.base.eth");
        assert!(h.store.get_intent(CHAT).is_some());
        assert!(h.responder.contexts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_stays_idle() {
        let h = harness(FakeResponder::replying("unused"), FakeTransfers::new(true));

        let reply = h.flow.handle_text(CHAT, "send 1 to alice.base.eth").await;

        assert!(reply.starts_with("I couldn't find the token"));
        assert!(h.store.get_pending_fields(CHAT).is_some());
        assert!(h.store.get_intent(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_zero_amount_stays_idle() {
        let h = harness(FakeResponder::replying("unused"), FakeTransfers::new(true));

        let reply = h.flow.handle_text(CHAT, "send 0.0 eth to alice.base.eth").await;

        assert!(reply.starts_with("The amount to send must be greater than zero"));
        assert!(h.store.get_intent(CHAT).is_none());
    }

    #[tokio::test]
    async fn test_balance_and_help_use_fixed_context() {
        let h = harness(FakeResponder::replying("ok"), FakeTransfers::new(true));

        h.flow.handle_text(CHAT, "what is my balance").await;
        h.flow.handle_text(CHAT, "help").await;
        h.flow.handle_text(CHAT, "gm frechi").await;

        assert_eq!(
            h.responder.contexts(),
            vec![
                BALANCE_CONTEXT.to_string(),
                HELP_CONTEXT.to_string(),
                "gm frechi".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_ai_failure_sends_apology() {
        let h = harness(FakeResponder::failing(), FakeTransfers::new(true));

        let reply = h.flow.handle_text(CHAT, "tell me about base").await;
        assert_eq!(reply, APOLOGY);
    }

    #[tokio::test]
    async fn test_repeated_apologies_are_replaced() {
        let sorry = "I'm sorry. ".repeat(5);
        let h = harness(FakeResponder::replying(&sorry), FakeTransfers::new(true));

        let reply = h.flow.handle_text(CHAT, "price of eth?").await;
        assert_eq!(reply, REPHRASE_REQUEST);
    }

    #[test]
    fn test_guard_repetition_threshold() {
        let three = "I'm sorry, I'm sorry, I'm sorry, but no.".to_string();
        assert_eq!(guard_repetition(three.clone()), three);

        let four = "I'm sorry ".repeat(4);
        assert_eq!(guard_repetition(four), REPHRASE_REQUEST);
    }

    #[tokio::test]
    async fn test_store_failure_never_repeats_a_transfer() {
        let store = Arc::new(StuckIntentStore {
            inner: InMemoryConversationStore::new(),
        });
        let responder = FakeResponder::replying("unused");
        let transfers = FakeTransfers::new(true);
        let flow = ConversationFlow::new(store.clone(), responder.clone(), transfers.clone());

        flow.handle_text(CHAT, "send 1 eth to alice.base.eth").await;
        let first = flow.handle_text(CHAT, "yes").await;
        let second = flow.handle_text(CHAT, "yes").await;

        assert_eq!(first, STORE_FAILURE);
        assert_eq!(second, STORE_FAILURE);
        assert!(transfers.calls().is_empty());
        assert!(responder.contexts().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_cancels_pending_intent() {
        let h = harness(FakeResponder::replying("ok"), FakeTransfers::new(true));

        h.flow.handle_text(CHAT, "send 1 eth to alice.base.eth").await;
        let reply = h.flow.handle_text(CHAT, "send 0 eth to bob.base.eth").await;

        assert!(reply.starts_with("The amount to send must be greater than zero"));
        assert!(reply.contains("pending transfer of 1 eth to alice.base.eth was cancelled"));
        assert!(h.store.get_intent(CHAT).is_none());

        h.flow.handle_text(CHAT, "yes").await;
        assert!(h.transfers.calls().is_empty());
        assert_eq!(h.responder.contexts(), vec!["yes".to_string()]);
    }
}
