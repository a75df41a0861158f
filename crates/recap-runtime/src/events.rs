use recap_core::ConversationId;

/// Notifications a host chat application sends to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A user or assistant message was added to the active conversation.
    MessageAppended,
    /// The host opened another conversation, or closed the current one.
    ConversationSwitched(Option<ConversationId>),
    ManualSummarize,
    ClearAll,
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::MessageAppended => "message_appended",
            HostEvent::ConversationSwitched(_) => "conversation_switched",
            HostEvent::ManualSummarize => "manual_summarize",
            HostEvent::ClearAll => "clear_all",
        }
    }
}
