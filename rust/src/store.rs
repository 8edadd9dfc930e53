use futures::stream::BoxStream;

use crate::state::{ChatMessage, Emoticon, PeerId, PeerRecord};

/// Persistence collaborator. Each method returns a live stream that emits
/// the current value and re-emits on every change. `None` from the peer
/// stream means the record is gone, which the session treats as fatal.
pub trait ChatStore: Send + Sync + 'static {
    fn peer_record_stream(&self, peer: PeerId) -> BoxStream<'static, Option<PeerRecord>>;

    /// Full ordered message list for the peer on every change.
    fn message_stream(&self, peer: PeerId) -> BoxStream<'static, Vec<ChatMessage>>;

    /// Full catalog on every change. Not scoped to a peer.
    fn emoticon_catalog_stream(&self) -> BoxStream<'static, Vec<Emoticon>>;
}
