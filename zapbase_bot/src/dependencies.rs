use zapbase_core::conversation::handler::ConversationFlow;

#[derive(Clone)]
pub struct BotDependencies {
    pub flow: ConversationFlow,
}
