// Session lifecycle: one structured scope per open conversation.

use super::*;

/// One open conversation and the scope that owns all of its concurrent
/// work. Cancelling `cancel` and awaiting `tasks` stops 100% of it.
pub(super) struct Session {
    pub peer_id: PeerId,
    /// Stamp for events produced by this session's tasks.
    pub epoch: u64,
    pub cancel: CancellationToken,
    pub tasks: TaskTracker,
}

impl ChatCore {
    pub(super) fn open_conversation(&mut self, peer_id: PeerId) {
        // Tear down any existing session first; its work must be fully
        // stopped before the new session starts any of its own.
        self.stop_session();

        self.session_epoch += 1;
        let epoch = self.session_epoch;
        tracing::info!(peer = %peer_id, epoch, "open_conversation");

        let sess = Session {
            peer_id,
            epoch,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        };

        // Fresh conversation, fresh snapshot. Fields fill in as each source
        // delivers its first value.
        self.state = ChatState::empty();
        self.state.phase = ConversationPhase::Active;
        self.state.peer_id = Some(peer_id);
        self.emit_state();

        self.spawn_refreshes(&sess);
        self.spawn_subscriptions(&sess);

        self.session = Some(sess);
    }

    pub(super) fn close_conversation(&mut self) {
        self.stop_session();
        if self.state.phase == ConversationPhase::Idle && self.state.peer_id.is_none() {
            // Nothing was open; stay idempotent.
            return;
        }
        self.state = ChatState::empty();
        self.emit_state();
    }

    /// Cancels the live session's scope and waits for every task in it to
    /// finish. After this returns, nothing can write to the snapshot except
    /// the actor itself.
    pub(super) fn stop_session(&mut self) {
        self.typing.reset();
        if let Some(sess) = self.session.take() {
            tracing::debug!(peer = %sess.peer_id, epoch = sess.epoch, "stop_session");
            sess.cancel.cancel();
            sess.tasks.close();
            self.runtime.block_on(sess.tasks.wait());
        }
    }

    /// The bound peer no longer resolves to a record. Not retried: a missing
    /// friend row means the conversation itself is gone, not a transient
    /// glitch.
    pub(super) fn fault_session(&mut self) {
        let Some(peer_id) = self.session.as_ref().map(|s| s.peer_id) else {
            return;
        };
        let fault = SessionFault::PeerNotFound { peer_id };
        tracing::error!(peer = %peer_id, %fault, "session faulted");

        self.stop_session();
        self.state.phase = ConversationPhase::Faulted;
        self.emit_state();

        let rev = self.rev;
        let _ = self.update_sender.send(ChatUpdate::SessionFaulted {
            rev,
            peer_id,
            fault,
        });
    }

    // Three independent one-shot refreshes against the network collaborator.
    // Opening a chat is the natural point to pull a fresh emoticon/sticker
    // catalog, backfill recent history and ack receipt; none of them blocks
    // the subscriptions or each other, and a failure only costs freshness.
    fn spawn_refreshes(&self, sess: &Session) {
        let network = self.network.clone();
        let cancel = sess.cancel.clone();
        sess.tasks.spawn_on(
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    res = network.refresh_emoticon_catalog() => {
                        if let Err(e) = res {
                            tracing::warn!(%e, "emoticon catalog refresh failed");
                        }
                    }
                }
            },
            self.runtime.handle(),
        );

        let network = self.network.clone();
        let cancel = sess.cancel.clone();
        let peer_id = sess.peer_id;
        sess.tasks.spawn_on(
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    res = network.refresh_recent_messages(peer_id) => {
                        if let Err(e) = res {
                            tracing::warn!(peer = %peer_id, %e, "recent message refresh failed");
                        }
                    }
                }
            },
            self.runtime.handle(),
        );

        let network = self.network.clone();
        let cancel = sess.cancel.clone();
        let peer_id = sess.peer_id;
        sess.tasks.spawn_on(
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    res = network.acknowledge_received(peer_id) => {
                        if let Err(e) = res {
                            tracing::warn!(peer = %peer_id, %e, "receipt ack failed");
                        }
                    }
                }
            },
            self.runtime.handle(),
        );
    }

    // Long-lived subscriptions feeding the snapshot, one task per source.
    // Updates apply per source in arrival order; sources never wait on each
    // other.
    fn spawn_subscriptions(&self, sess: &Session) {
        let epoch = sess.epoch;

        let mut peers = self.store.peer_record_stream(sess.peer_id);
        let cancel = sess.cancel.clone();
        let tx = self.core_sender.clone();
        sess.tasks.spawn_on(
            async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        item = peers.next() => match item {
                            Some(Some(peer)) => {
                                let _ = tx.send(CoreMsg::Internal(InternalEvent::PeerUpdated {
                                    epoch,
                                    peer,
                                }));
                            }
                            Some(None) => {
                                let _ = tx.send(CoreMsg::Internal(InternalEvent::PeerMissing {
                                    epoch,
                                }));
                                break;
                            }
                            None => break,
                        },
                    }
                }
            },
            self.runtime.handle(),
        );

        let mut messages = self.store.message_stream(sess.peer_id);
        let cancel = sess.cancel.clone();
        let tx = self.core_sender.clone();
        sess.tasks.spawn_on(
            async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        item = messages.next() => match item {
                            Some(messages) => {
                                let _ = tx.send(CoreMsg::Internal(InternalEvent::MessagesUpdated {
                                    epoch,
                                    messages,
                                }));
                            }
                            None => break,
                        },
                    }
                }
            },
            self.runtime.handle(),
        );

        let mut emoticons = self.store.emoticon_catalog_stream();
        let cancel = sess.cancel.clone();
        let tx = self.core_sender.clone();
        sess.tasks.spawn_on(
            async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        item = emoticons.next() => match item {
                            Some(emoticons) => {
                                let _ = tx.send(CoreMsg::Internal(InternalEvent::EmoticonsUpdated {
                                    epoch,
                                    emoticons,
                                }));
                            }
                            None => break,
                        },
                    }
                }
            },
            self.runtime.handle(),
        );
    }
}
