//! Offline action queue.
//!
//! Session mutations attempted without connectivity are persisted as
//! [`OfflineAction`]s and replayed in order on reconnect. Each action is
//! attempted exactly once per pass; failures are reported in the
//! [`QueueSummary`] and dropped with the rest of the pass.

mod connectivity;
mod handler;
mod queue;
pub mod types;

pub use connectivity::ConnectivityMonitor;
pub use queue::{OfflineActionHandler, OfflineQueue};
pub use types::{ActionKind, ActionOutcome, OfflineAction, QueueSummary};
