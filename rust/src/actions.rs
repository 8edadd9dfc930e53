use crate::state::PeerId;

#[derive(Debug, Clone)]
pub enum ChatAction {
    /// Binds the controller to a conversation with `peer_id`, superseding
    /// any conversation that is currently open.
    OpenConversation {
        peer_id: PeerId,
    },
    CloseConversation,
    TypingStarted,
    SendMessage {
        content: String,
    },
}

impl ChatAction {
    /// Log-safe action tag (never includes message content).
    pub fn tag(&self) -> &'static str {
        match self {
            ChatAction::OpenConversation { .. } => "OpenConversation",
            ChatAction::CloseConversation => "CloseConversation",
            ChatAction::TypingStarted => "TypingStarted",
            ChatAction::SendMessage { .. } => "SendMessage",
        }
    }
}
