//! Replaying queued actions through the session store.

use async_trait::async_trait;

use super::queue::OfflineActionHandler;
use super::types::{ActionKind, OfflineAction};
use crate::session::{SessionError, SessionResult, SessionStore};

#[async_trait]
impl OfflineActionHandler for SessionStore {
    /// Creates are validated again at replay time, so a session whose time
    /// passed while offline fails instead of being created in the past. A
    /// join the backend already has counts as applied.
    async fn apply(&self, action: &OfflineAction) -> SessionResult<()> {
        match &action.kind {
            ActionKind::CreateSession(input) => self.create_session(input).await.map(|_| ()),
            ActionKind::JoinSession { session_id } => match self.join_session(session_id).await {
                Err(SessionError::AlreadyJoined(_)) | Ok(()) => Ok(()),
                Err(e) => Err(e),
            },
            ActionKind::LeaveSession { session_id } => self.leave_session(session_id).await,
            ActionKind::CancelSession { session_id } => self.cancel_session(session_id).await,
        }
    }
}
