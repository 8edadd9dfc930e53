use crate::actions::ChatAction;
use crate::state::{ChatMessage, ChatState, Emoticon, PeerId, PeerRecord};

/// Fatal session faults. These terminate the session and must surface to the
/// presentation layer; everything else is either silently dropped or the
/// collaborator's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionFault {
    #[error("peer record no longer resolves for {peer_id}")]
    PeerNotFound { peer_id: PeerId },
}

#[derive(Debug, Clone)]
pub enum ChatUpdate {
    /// Primary update stream: always a full snapshot.
    FullState(ChatState),
    /// Side channel for the fatal fault so the owner can react (show an
    /// error, navigate away) without diffing snapshots.
    SessionFaulted {
        rev: u64,
        peer_id: PeerId,
        fault: SessionFault,
    },
}

impl ChatUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            ChatUpdate::FullState(s) => s.rev,
            ChatUpdate::SessionFaulted { rev, .. } => *rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(ChatAction),
    Internal(InternalEvent),
}

/// Results of session-scoped async work, routed back through the actor.
/// Every variant carries the epoch of the session that produced it so the
/// actor can drop anything a superseded session left in the queue.
#[derive(Debug)]
pub enum InternalEvent {
    PeerUpdated {
        epoch: u64,
        peer: PeerRecord,
    },
    /// The peer-record stream delivered an absent record.
    PeerMissing {
        epoch: u64,
    },
    MessagesUpdated {
        epoch: u64,
        messages: Vec<ChatMessage>,
    },
    EmoticonsUpdated {
        epoch: u64,
        emoticons: Vec<Emoticon>,
    },
    /// A typing-notification dispatch finished. `ok` means the collaborator
    /// reported it sent.
    TypingDispatched {
        epoch: u64,
        ok: bool,
    },
}

impl InternalEvent {
    pub(crate) fn epoch(&self) -> u64 {
        match self {
            InternalEvent::PeerUpdated { epoch, .. }
            | InternalEvent::PeerMissing { epoch }
            | InternalEvent::MessagesUpdated { epoch, .. }
            | InternalEvent::EmoticonsUpdated { epoch, .. }
            | InternalEvent::TypingDispatched { epoch, .. } => *epoch,
        }
    }
}
