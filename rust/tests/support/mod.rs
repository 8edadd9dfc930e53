//! Mock collaborators and polling helpers for the session flow tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::stream::BoxStream;
use futures::StreamExt;
use marten_core::{
    ChatMessage, ChatReconciler, ChatStore, ChatUpdate, Emoticon, EmoticonKind, NetworkService,
    PeerId, PeerRecord, PresenceState,
};

/// Polls `f` until it holds or panics after `timeout`.
pub fn wait_until(what: &str, timeout: Duration, mut f: impl FnMut() -> bool) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("{what}: condition not met within {timeout:?}");
}

pub fn peer_record(id: PeerId, display_name: &str) -> PeerRecord {
    PeerRecord {
        id,
        display_name: display_name.to_string(),
        avatar_url: None,
        presence: PresenceState::Online,
    }
}

pub fn message(id: i64, content: &str) -> ChatMessage {
    ChatMessage {
        id,
        content: content.to_string(),
        timestamp: 1_700_000_000 + id,
        is_mine: false,
    }
}

pub fn emoticon(name: &str) -> Emoticon {
    Emoticon {
        name: name.to_string(),
        kind: EmoticonKind::Emoticon,
    }
}

/// What the mock network was asked to do, in completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkCall {
    RefreshEmoticonCatalog,
    RefreshRecentMessages(PeerId),
    AcknowledgeReceived(PeerId),
    SendTypingNotification(PeerId),
    SendMessage(PeerId, String),
}

/// Records every collaborator call; optionally stalls typing notifications
/// so cancellation paths can be exercised.
#[derive(Default)]
pub struct MockNetwork {
    calls: Mutex<Vec<NetworkCall>>,
    typing_delay: Option<Duration>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_typing_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(vec![]),
            typing_delay: Some(delay),
        })
    }

    pub fn calls(&self) -> Vec<NetworkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn typing_notifications(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, NetworkCall::SendTypingNotification(_)))
            .count()
    }

    pub fn sent_messages(&self) -> Vec<(PeerId, String)> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                NetworkCall::SendMessage(peer, content) => Some((*peer, content.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: NetworkCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl NetworkService for MockNetwork {
    async fn refresh_emoticon_catalog(&self) -> anyhow::Result<()> {
        self.record(NetworkCall::RefreshEmoticonCatalog);
        Ok(())
    }

    async fn refresh_recent_messages(&self, peer: PeerId) -> anyhow::Result<()> {
        self.record(NetworkCall::RefreshRecentMessages(peer));
        Ok(())
    }

    async fn acknowledge_received(&self, peer: PeerId) -> anyhow::Result<()> {
        self.record(NetworkCall::AcknowledgeReceived(peer));
        Ok(())
    }

    async fn send_typing_notification(&self, peer: PeerId) -> anyhow::Result<()> {
        if let Some(delay) = self.typing_delay {
            tokio::time::sleep(delay).await;
        }
        self.record(NetworkCall::SendTypingNotification(peer));
        Ok(())
    }

    async fn send_message(&self, peer: PeerId, content: String) -> anyhow::Result<()> {
        self.record(NetworkCall::SendMessage(peer, content));
        Ok(())
    }
}

#[derive(Default)]
struct StoreInner {
    peer_subs: Vec<(PeerId, flume::Sender<Option<PeerRecord>>)>,
    message_subs: Vec<(PeerId, flume::Sender<Vec<ChatMessage>>)>,
    emoticon_subs: Vec<flume::Sender<Vec<Emoticon>>>,
}

/// Channel-backed store: each subscription gets its own stream, and tests
/// push values into every live subscription for the targeted peer.
#[derive(Default)]
pub struct MockStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_peer(&self, peer: PeerId, record: Option<PeerRecord>) {
        let inner = self.inner.lock().unwrap();
        for (id, tx) in &inner.peer_subs {
            if *id == peer {
                let _ = tx.send(record.clone());
            }
        }
    }

    pub fn push_messages(&self, peer: PeerId, messages: Vec<ChatMessage>) {
        let inner = self.inner.lock().unwrap();
        for (id, tx) in &inner.message_subs {
            if *id == peer {
                let _ = tx.send(messages.clone());
            }
        }
    }

    pub fn push_emoticons(&self, emoticons: Vec<Emoticon>) {
        let inner = self.inner.lock().unwrap();
        for tx in &inner.emoticon_subs {
            let _ = tx.send(emoticons.clone());
        }
    }

    /// Live peer-stream subscriptions; receivers dropped by cancelled
    /// sessions are pruned first.
    pub fn live_peer_subs(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.peer_subs.retain(|(_, tx)| !tx.is_disconnected());
        inner.peer_subs.len()
    }
}

impl ChatStore for MockStore {
    fn peer_record_stream(&self, peer: PeerId) -> BoxStream<'static, Option<PeerRecord>> {
        let (tx, rx) = flume::unbounded();
        self.inner.lock().unwrap().peer_subs.push((peer, tx));
        rx.into_stream().boxed()
    }

    fn message_stream(&self, peer: PeerId) -> BoxStream<'static, Vec<ChatMessage>> {
        let (tx, rx) = flume::unbounded();
        self.inner.lock().unwrap().message_subs.push((peer, tx));
        rx.into_stream().boxed()
    }

    fn emoticon_catalog_stream(&self) -> BoxStream<'static, Vec<Emoticon>> {
        let (tx, rx) = flume::unbounded();
        self.inner.lock().unwrap().emoticon_subs.push(tx);
        rx.into_stream().boxed()
    }
}

/// Accumulates every update pushed to the presentation layer.
#[derive(Clone, Default)]
pub struct Collector {
    updates: Arc<Mutex<Vec<ChatUpdate>>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ChatUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<marten_core::ChatState> {
        self.updates()
            .into_iter()
            .filter_map(|u| match u {
                ChatUpdate::FullState(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl ChatReconciler for Collector {
    fn reconcile(&self, update: ChatUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}
