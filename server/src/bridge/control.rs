use hazardcore::interface::{ClientMessage, ServerMessage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Flags shared between client sessions and the frame loop.
#[derive(Debug, Default)]
pub struct ControlState {
    scene_requested: AtomicBool,
    shutdown: AtomicBool,
    clients: AtomicUsize,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_scene(&self) {
        self.scene_requested.store(true, Ordering::SeqCst);
    }

    /// Consumes a pending scene request; repeated triggers collapse into one.
    pub fn take_scene_request(&self) -> bool {
        self.scene_requested.swap(false, Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn client_connected(&self) -> usize {
        self.clients.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn client_disconnected(&self) -> usize {
        self.clients.fetch_sub(1, Ordering::SeqCst).saturating_sub(1)
    }

    pub fn clients(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }

    /// Applies one client text frame; returns the reply owed to that client only.
    pub fn handle_client_text(&self, text: &str) -> Option<ServerMessage> {
        match ClientMessage::parse(text)? {
            ClientMessage::TriggerPhase2 => {
                self.request_scene();
                None
            }
            ClientMessage::Ping => Some(ServerMessage::Pong),
        }
    }
}
