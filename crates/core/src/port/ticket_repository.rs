// Ticket Repository Port (Interface)
//
// Transactional persistence over lanes, users and tickets. Every mutating
// operation is a single atomic unit of work in the implementing store; the
// claim_* operations in particular must select and transition one row
// indivisibly so that two concurrent dispatchers can never claim the same
// ticket.

use crate::domain::{Lane, LaneId, Ticket, TicketId, User, UserId, UserProfile};
use crate::error::Result;
use crate::port::token_issuer::IssuedToken;
use async_trait::async_trait;

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Create or refresh a user record (address and name update on every call)
    async fn upsert_user(&self, profile: &UserProfile) -> Result<User>;

    /// Find user by external identity
    async fn find_user(&self, external_id: &str) -> Result<Option<User>>;

    /// Find user by store id
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Idempotently create a lane (startup seeding; existing lanes untouched)
    async fn ensure_lane(&self, lane: &Lane) -> Result<()>;

    async fn find_lane(&self, id: LaneId) -> Result<Option<Lane>>;

    async fn list_lanes(&self) -> Result<Vec<Lane>>;

    /// Insert a fresh WAITING ticket.
    ///
    /// Returns Conflict if the user already holds an active ticket (the
    /// store enforces the single-active-ticket invariant, which also
    /// serializes concurrent double-submission).
    async fn insert_waiting_ticket(
        &self,
        lane_id: LaneId,
        user_id: UserId,
        created_at: i64,
    ) -> Result<Ticket>;

    async fn find_ticket(&self, id: TicketId) -> Result<Option<Ticket>>;

    /// The user's single ticket in {WAITING, CALLED, CONFIRMED}, if any
    async fn find_active_ticket(&self, user_id: UserId) -> Result<Option<Ticket>>;

    /// Atomically transition the oldest WAITING ticket (by created_at) in
    /// the lane to CALLED, attaching the given confirmation token
    async fn claim_next_waiting(
        &self,
        lane_id: LaneId,
        now_millis: i64,
        token: &IssuedToken,
    ) -> Result<Option<Ticket>>;

    /// Atomically transition the oldest CALLED ticket (by called_at) in the
    /// lane to NO_SHOW
    async fn claim_next_called(&self, lane_id: LaneId, now_millis: i64) -> Result<Option<Ticket>>;

    /// Atomically transition the oldest CONFIRMED ticket (by confirmed_at)
    /// in the lane to SERVED
    async fn claim_next_confirmed(
        &self,
        lane_id: LaneId,
        now_millis: i64,
    ) -> Result<Option<Ticket>>;

    /// Atomically cancel the user's active ticket, if any
    async fn cancel_active_ticket(
        &self,
        user_id: UserId,
        now_millis: i64,
    ) -> Result<Option<Ticket>>;

    /// Atomically confirm the ticket holding this token, provided it is
    /// still CALLED and the token has not expired. None covers unknown
    /// token, wrong state and past expiry alike.
    async fn confirm_by_token(&self, token: &str, now_millis: i64) -> Result<Option<Ticket>>;

    /// 1-based rank of a WAITING ticket among WAITING tickets in its lane,
    /// ordered by created_at; 0 if the ticket is not currently WAITING
    async fn waiting_position(&self, ticket: &Ticket) -> Result<i64>;

    /// Up to `limit` WAITING tickets in FIFO order
    async fn list_waiting(&self, lane_id: LaneId, limit: i64) -> Result<Vec<Ticket>>;

    /// Tickets whose created_at falls in [start, end), optionally lane-scoped
    async fn count_created_between(
        &self,
        start_millis: i64,
        end_millis: i64,
        lane_id: Option<LaneId>,
    ) -> Result<i64>;

    /// Tickets whose confirmed_at falls in [start, end), optionally lane-scoped
    async fn count_confirmed_between(
        &self,
        start_millis: i64,
        end_millis: i64,
        lane_id: Option<LaneId>,
    ) -> Result<i64>;
}
