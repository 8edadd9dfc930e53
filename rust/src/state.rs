//! Published conversation state and the plain data records it carries.

use serde::{Deserialize, Serialize};

const REALM_SHIFT: u32 = 56;
const KIND_SHIFT: u32 = 52;
const KIND_USER: u8 = 1;

/// Packed 64-bit platform identity for a remote peer.
///
/// Layout: realm in the high byte, account kind in the next nibble, account
/// number in the low 32 bits. The bits in between carry instance data this
/// core never interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(u64);

impl PeerId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Builds an individual-user id in the given realm.
    pub const fn user(realm: u8, account: u32) -> Self {
        Self(((realm as u64) << REALM_SHIFT) | ((KIND_USER as u64) << KIND_SHIFT) | account as u64)
    }

    fn realm(self) -> u8 {
        (self.0 >> REALM_SHIFT) as u8
    }

    fn kind(self) -> u8 {
        ((self.0 >> KIND_SHIFT) & 0xF) as u8
    }

    fn account(self) -> u32 {
        self.0 as u32
    }

    /// Structural validity: known realm, individual-user kind, nonzero
    /// account number. Says nothing about whether the account exists.
    pub fn is_valid(self) -> bool {
        matches!(self.realm(), 1..=4) && self.kind() == KIND_USER && self.account() != 0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.realm(), self.kind(), self.account())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceState {
    Offline,
    Online,
    Away,
    Snooze,
    InGame,
}

/// Profile/presence record for the remote peer, as supplied by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub id: PeerId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub presence: PresenceState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Store-assigned, unique within the conversation.
    pub id: i64,
    pub content: String,
    /// Unix seconds, assigned by the store.
    pub timestamp: i64,
    pub is_mine: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmoticonKind {
    Emoticon,
    Sticker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emoticon {
    pub name: String,
    pub kind: EmoticonKind,
}

/// Where the conversation binding currently stands. `Faulted` is terminal
/// until the next open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationPhase {
    Idle,
    Active,
    Faulted,
}

/// Full conversation snapshot. Replaced wholesale on every publication, so
/// readers never observe a partially applied update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    pub rev: u64,
    pub phase: ConversationPhase,
    /// The peer this snapshot describes. Sole source of truth while a
    /// conversation is open.
    pub peer_id: Option<PeerId>,
    pub peer: Option<PeerRecord>,
    /// Chronological, as ordered by the store.
    pub messages: Vec<ChatMessage>,
    pub emoticons: Vec<Emoticon>,
}

impl ChatState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            phase: ConversationPhase::Idle,
            peer_id: None,
            peer: None,
            messages: vec![],
            emoticons: vec![],
        }
    }
}

/// List scroll anchor for the conversation view. Kept by the facade so it
/// survives conversation switches; the core never reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub item_index: u32,
    pub pixel_offset: u32,
}
