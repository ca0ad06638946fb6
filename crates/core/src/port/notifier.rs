// Notification Port (consumed, not implemented, by the core)

use async_trait::async_trait;

use crate::domain::{LaneId, TicketId};

/// Dispatch notice emitted when a ticket is called
///
/// Carries everything the external collaborator needs to render and deliver
/// a confirmation payload (e.g. a scannable code) to the called user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalledNotice {
    pub ticket_id: TicketId,
    pub lane_id: LaneId,
    pub token: String,
    /// Delivery address of the called user
    pub address: String,
}

/// Delivery of dispatch notices is fire-and-forget: a failed delivery never
/// rolls back the state transition that produced the notice.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn ticket_called(&self, notice: CalledNotice);
}
