use anyhow::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sled::Db;

use crate::transfer::dto::{PendingTransferFields, TransferIntent};

const TREE_NAME: &str = "conversation_state";

/// Everything remembered about one conversation.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ConversationState {
    pub pending_fields: Option<PendingTransferFields>,
    pub intent: Option<TransferIntent>,
}

/// Per-conversation transfer state, keyed by conversation (chat) id.
///
/// Implementations must be safe to share between concurrently handled chats.
pub trait ConversationStore: Send + Sync {
    fn set_pending_fields(&self, conversation_id: i64, fields: PendingTransferFields) -> Result<()>;
    fn get_pending_fields(&self, conversation_id: i64) -> Option<PendingTransferFields>;
    fn set_intent(&self, conversation_id: i64, intent: TransferIntent) -> Result<()>;
    fn get_intent(&self, conversation_id: i64) -> Option<TransferIntent>;
    fn clear_intent(&self, conversation_id: i64) -> Result<()>;
    /// Removes and returns the pending intent in one step.
    fn take_intent(&self, conversation_id: i64) -> Result<Option<TransferIntent>>;
}

/// Process-lifetime store; state is lost on restart.
#[derive(Default)]
pub struct InMemoryConversationStore {
    states: DashMap<i64, ConversationState>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn set_pending_fields(&self, conversation_id: i64, fields: PendingTransferFields) -> Result<()> {
        self.states.entry(conversation_id).or_default().pending_fields = Some(fields);
        Ok(())
    }

    fn get_pending_fields(&self, conversation_id: i64) -> Option<PendingTransferFields> {
        self.states
            .get(&conversation_id)
            .and_then(|state| state.pending_fields.clone())
    }

    fn set_intent(&self, conversation_id: i64, intent: TransferIntent) -> Result<()> {
        self.states.entry(conversation_id).or_default().intent = Some(intent);
        Ok(())
    }

    fn get_intent(&self, conversation_id: i64) -> Option<TransferIntent> {
        self.states
            .get(&conversation_id)
            .and_then(|state| state.intent.clone())
    }

    fn clear_intent(&self, conversation_id: i64) -> Result<()> {
        if let Some(mut state) = self.states.get_mut(&conversation_id) {
            state.intent = None;
        }
        Ok(())
    }

    fn take_intent(&self, conversation_id: i64) -> Result<Option<TransferIntent>> {
        Ok(self
            .states
            .get_mut(&conversation_id)
            .and_then(|mut state| state.intent.take()))
    }
}

/// sled-backed store so pending confirmations survive a restart.
#[derive(Clone)]
pub struct SledConversationStore {
    tree: sled::Tree,
}

impl SledConversationStore {
    pub fn new(db: &Db) -> sled::Result<Self> {
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { tree })
    }

    pub fn open(path: &str) -> sled::Result<Self> {
        let db = sled::open(path)?;
        Self::new(&db)
    }

    fn read_state(&self, conversation_id: i64) -> Result<Option<ConversationState>> {
        match self.tree.get(conversation_id.to_be_bytes())? {
            Some(ivec) => Ok(Some(serde_json::from_slice(&ivec)?)),
            None => Ok(None),
        }
    }

    fn get_state(&self, conversation_id: i64) -> Option<ConversationState> {
        self.read_state(conversation_id).unwrap_or_else(|e| {
            log::error!("Failed to read state for conversation {}: {}", conversation_id, e);
            None
        })
    }

    /// Read-modify-write; a state that cannot be read is left as it is.
    fn update_state<F, T>(&self, conversation_id: i64, update: F) -> Result<T>
    where
        F: FnOnce(&mut ConversationState) -> T,
    {
        let mut state = self.read_state(conversation_id)?.unwrap_or_default();
        let output = update(&mut state);
        let encoded = serde_json::to_vec(&state)?;
        self.tree.insert(conversation_id.to_be_bytes(), encoded)?;
        self.tree.flush()?;
        Ok(output)
    }
}

impl ConversationStore for SledConversationStore {
    fn set_pending_fields(&self, conversation_id: i64, fields: PendingTransferFields) -> Result<()> {
        self.update_state(conversation_id, |state| state.pending_fields = Some(fields))
    }

    fn get_pending_fields(&self, conversation_id: i64) -> Option<PendingTransferFields> {
        self.get_state(conversation_id)
            .and_then(|state| state.pending_fields)
    }

    fn set_intent(&self, conversation_id: i64, intent: TransferIntent) -> Result<()> {
        self.update_state(conversation_id, |state| state.intent = Some(intent))
    }

    fn get_intent(&self, conversation_id: i64) -> Option<TransferIntent> {
        self.get_state(conversation_id).and_then(|state| state.intent)
    }

    fn clear_intent(&self, conversation_id: i64) -> Result<()> {
        self.update_state(conversation_id, |state| state.intent = None)
    }

    fn take_intent(&self, conversation_id: i64) -> Result<Option<TransferIntent>> {
        self.update_state(conversation_id, |state| state.intent.take())
    }
}
