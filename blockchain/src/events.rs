//! Events emitted by the organizer for subscribers.

use mvs_types::Block;

#[derive(Clone, Debug)]
pub enum OrganizerEvent {
    /// The main chain changed. `pushed` and `released` hold exactly the blocks
    /// that were connected and disconnected.
    Reorganized {
        fork_point: u64,
        pushed: Vec<Block>,
        released: Vec<Block>,
    },
    /// A fork lost on work at a length that suggests peers hold more of it.
    NeedMoreBlocks { fork_point: u64, tip: u64, length: usize },
    /// The organizer was stopped.
    Stopped,
}

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the organizing thread, under the chain write lock.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&OrganizerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&OrganizerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &OrganizerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
