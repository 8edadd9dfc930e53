//! Per-conversation chat session core of the Marten client.
//!
//! One conversation is open at a time. Opening one binds the controller to
//! the peer-record, message and emoticon sources and fuses their updates
//! into a single published snapshot; user intents (typing, send) are
//! throttled and gated here before they reach the network collaborator.
//! Switching or closing a conversation cancels every task the previous one
//! started before anything new runs.

mod actions;
mod core;
mod logging;
mod service;
mod state;
mod store;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};

pub use actions::ChatAction;
pub use service::NetworkService;
pub use state::*;
pub use store::ChatStore;
pub use updates::*;

/// Callback surface for the presentation layer's update stream.
pub trait ChatReconciler: Send + Sync + 'static {
    fn reconcile(&self, update: ChatUpdate);
}

pub struct ChatApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<ChatUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<ChatState>>,
    // Conversation view scroll anchor. Lives here so it survives
    // conversation switches; the core never interprets it.
    scroll: RwLock<ScrollPosition>,
}

impl ChatApp {
    pub fn new(
        data_dir: String,
        network: Arc<dyn NetworkService>,
        store: Arc<dyn ChatStore>,
    ) -> Arc<Self> {
        logging::init_logging();
        tracing::info!(data_dir = %data_dir, "ChatApp::new() starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(ChatState::empty()));

        // Actor loop thread (single threaded "chat actor").
        let core_tx_for_core = core_tx.clone();
        let shared_for_core = shared_state.clone();
        thread::spawn(move || {
            let mut core = crate::core::ChatCore::new(
                update_tx,
                core_tx_for_core,
                data_dir,
                shared_for_core,
                network,
                store,
            );
            while let Ok(msg) = core_rx.recv() {
                core.handle_message(msg);
            }
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
            scroll: RwLock::new(ScrollPosition::default()),
        })
    }

    /// Latest committed snapshot.
    pub fn state(&self) -> ChatState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn dispatch(&self, action: ChatAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn listen_for_updates(&self, reconciler: Box<dyn ChatReconciler>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                reconciler.reconcile(update);
            }
        });
    }

    pub fn scroll_position(&self) -> ScrollPosition {
        match self.scroll.read() {
            Ok(g) => *g,
            Err(poison) => *poison.into_inner(),
        }
    }

    pub fn set_scroll_position(&self, position: ScrollPosition) {
        match self.scroll.write() {
            Ok(mut g) => *g = position,
            Err(poison) => *poison.into_inner() = position,
        }
    }
}
