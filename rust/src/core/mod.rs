mod config;
mod session;

use std::sync::{Arc, RwLock};
use std::time::Instant;

use flume::Sender;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::actions::ChatAction;
use crate::service::NetworkService;
use crate::state::{ChatState, ConversationPhase, PeerId};
use crate::store::ChatStore;
use crate::updates::{ChatUpdate, CoreMsg, InternalEvent, SessionFault};

use session::Session;

/// Outgoing typing-notification bookkeeping. Scoped to the live session and
/// never carried across conversations.
#[derive(Default)]
struct TypingState {
    /// Stamped on successful dispatch only; monotonic.
    last_sent: Option<Instant>,
    /// Cancel handle for the in-flight dispatch, if any.
    pending: Option<CancellationToken>,
}

impl TypingState {
    fn reset(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
        self.last_sent = None;
    }
}

pub(crate) struct ChatCore {
    state: ChatState,
    rev: u64,

    update_sender: Sender<ChatUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<ChatState>>,

    config: config::AppConfig,
    runtime: tokio::runtime::Runtime,

    network: Arc<dyn NetworkService>,
    store: Arc<dyn ChatStore>,

    session: Option<Session>,
    session_epoch: u64,
    typing: TypingState,
}

impl ChatCore {
    pub fn new(
        update_sender: Sender<ChatUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<ChatState>>,
        network: Arc<dyn NetworkService>,
        store: Arc<dyn ChatStore>,
    ) -> Self {
        let config = config::load_app_config(&data_dir);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .enable_io()
            .build()
            .expect("tokio runtime");

        let this = Self {
            state: ChatState::empty(),
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            config,
            runtime,
            network,
            store,
            session: None,
            session_epoch: 0,
            typing: TypingState::default(),
        };

        // Ensure ChatApp::state() has an immediately-available snapshot.
        this.commit_state_snapshot(&this.state);
        this
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                tracing::debug!(action = action.tag(), "handle_action");
                self.handle_action(action);
            }
            CoreMsg::Internal(ev) => self.handle_internal(ev),
        }
    }

    fn handle_action(&mut self, action: ChatAction) {
        match action {
            ChatAction::OpenConversation { peer_id } => self.open_conversation(peer_id),
            ChatAction::CloseConversation => self.close_conversation(),
            ChatAction::TypingStarted => self.on_typing(),
            ChatAction::SendMessage { content } => self.send_chat_message(content),
        }
    }

    fn handle_internal(&mut self, ev: InternalEvent) {
        // Session work outlives its session only up to this point: anything
        // stamped with a superseded epoch is dropped here.
        if !self.session_event_is_current(ev.epoch()) {
            tracing::trace!(epoch = ev.epoch(), "dropping event from superseded session");
            return;
        }

        match ev {
            InternalEvent::PeerUpdated { peer, .. } => {
                tracing::debug!(peer = %peer.id, "peer record update");
                self.state.peer = Some(peer);
                self.emit_state();
            }
            InternalEvent::MessagesUpdated { messages, .. } => {
                tracing::debug!(count = messages.len(), "message list update");
                self.state.messages = messages;
                self.emit_state();
            }
            InternalEvent::EmoticonsUpdated { emoticons, .. } => {
                tracing::debug!(count = emoticons.len(), "emoticon catalog update");
                self.state.emoticons = emoticons;
                self.emit_state();
            }
            InternalEvent::PeerMissing { .. } => self.fault_session(),
            InternalEvent::TypingDispatched { ok, .. } => {
                // A send or a conversation switch may already have cleared
                // the slot; a completion that raced it must not restamp the
                // throttle.
                if self.typing.pending.take().is_some() && ok {
                    self.typing.last_sent = Some(Instant::now());
                }
            }
        }
    }

    fn session_event_is_current(&self, epoch: u64) -> bool {
        self.session.as_ref().is_some_and(|s| s.epoch == epoch)
    }

    /// Throttled outgoing typing notification: at most one dispatch per
    /// throttle window, measured from the last successful dispatch, and
    /// never more than one in flight.
    fn on_typing(&mut self) {
        let Some(sess) = self.session.as_ref() else {
            return;
        };
        if self.typing.pending.is_some() {
            return;
        }
        if let Some(last) = self.typing.last_sent {
            if last.elapsed() < self.config.typing_throttle() {
                return;
            }
        }

        let token = sess.cancel.child_token();
        self.typing.pending = Some(token.clone());

        let network = self.network.clone();
        let tx = self.core_sender.clone();
        let peer_id = sess.peer_id;
        let epoch = sess.epoch;
        sess.tasks.spawn_on(
            async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    res = network.send_typing_notification(peer_id) => {
                        if let Err(e) = &res {
                            tracing::warn!(peer = %peer_id, %e, "typing notification failed");
                        }
                        let _ = tx.send(CoreMsg::Internal(InternalEvent::TypingDispatched {
                            epoch,
                            ok: res.is_ok(),
                        }));
                    }
                }
            },
            self.runtime.handle(),
        );
    }

    /// Outgoing send gate: typing stops, the peer identity must be
    /// structurally valid, then delivery belongs to the network collaborator.
    fn send_chat_message(&mut self, content: String) {
        self.typing.reset();

        let Some(sess) = self.session.as_ref() else {
            tracing::warn!("no open conversation, dropping outgoing message");
            return;
        };

        let content = content.trim().to_string();
        if content.is_empty() {
            return;
        }
        if !sess.peer_id.is_valid() {
            tracing::warn!(peer = %sess.peer_id, "peer id malformed, not sending message");
            return;
        }

        let network = self.network.clone();
        let peer_id = sess.peer_id;
        let cancel = sess.cancel.clone();
        sess.tasks.spawn_on(
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    res = network.send_message(peer_id, content) => {
                        if let Err(e) = res {
                            // Delivery failures (and any retry) are the
                            // collaborator's concern.
                            tracing::warn!(peer = %peer_id, %e, "send_message failed");
                        }
                    }
                }
            },
            self.runtime.handle(),
        );
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &ChatState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(ChatUpdate::FullState(snapshot));
    }
}
