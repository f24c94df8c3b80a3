//! Live-update fan-out.
//!
//! Best-effort broadcast of "something new was written" events to whoever
//! is connected right now. No persistence, no replay: observers that
//! connect after a publish never see it.

use tokio::sync::broadcast;
use tracing::debug;
use vigil_common::record::Collection;

/// Channel capacity. A consumer that falls further behind than this skips
/// ahead rather than stalling the publisher or other observers.
const CHANNEL_CAPACITY: usize = 64;

/// Update event kinds, named as the dashboard subscribes to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEvent {
    NewSystemMetrics,
    NewLogs,
    NewProcessesSnapshot,
}

impl UpdateEvent {
    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateEvent::NewSystemMetrics => "new_system_metrics",
            UpdateEvent::NewLogs => "new_logs",
            UpdateEvent::NewProcessesSnapshot => "new_processes_snapshot",
        }
    }

    /// Event published after a successful write to `collection`.
    pub fn for_collection(collection: Collection) -> Self {
        match collection {
            Collection::SystemMetrics => UpdateEvent::NewSystemMetrics,
            Collection::Logs => UpdateEvent::NewLogs,
            Collection::ProcessesSnapshots => UpdateEvent::NewProcessesSnapshot,
        }
    }
}

/// Process-wide publish/subscribe handle for update events.
#[derive(Clone)]
pub struct UpdateNotifier {
    tx: broadcast::Sender<UpdateEvent>,
}

impl UpdateNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Notify every observer subscribed at call time. Publishing with no
    /// observers is a no-op.
    pub fn publish(&self, event: UpdateEvent) {
        match self.tx.send(event) {
            Ok(n) => debug!("Published {} to {} observers", event.as_str(), n),
            Err(_) => debug!("Published {} with no observers", event.as_str()),
        }
    }

    /// Register an observer. The returned receiver is the subscription
    /// handle; dropping it unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.tx.subscribe()
    }

    /// Number of currently connected observers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for UpdateNotifier {
    fn default() -> Self {
        Self::new()
    }
}
