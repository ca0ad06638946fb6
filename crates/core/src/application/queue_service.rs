// Queue Service - ticket lifecycle and dispatch use cases
//
// Owns every state-machine transition. Each operation is one bounded store
// round trip; the selection-then-update steps of dispatch run as single
// atomic claims inside the repository, so concurrent operator consoles can
// never advance the same ticket twice.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::{LaneId, Ticket, TicketStatus, UserProfile};
use crate::error::{AppError, Result};
use crate::port::{
    CalledNotice, Notifier, OperatorAuth, TicketRepository, TimeProvider, TokenIssuer,
};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// An active ticket with its 1-based waiting rank (absent unless WAITING)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketPosition {
    pub ticket: Ticket,
    pub position: Option<i64>,
}

/// Aggregate counts for one calendar day (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStats {
    pub created: i64,
    pub confirmed: i64,
}

pub struct QueueService {
    repo: Arc<dyn TicketRepository>,
    token_issuer: Arc<dyn TokenIssuer>,
    notifier: Arc<dyn Notifier>,
    auth: Arc<dyn OperatorAuth>,
    time_provider: Arc<dyn TimeProvider>,
    config: EngineConfig,
}

impl QueueService {
    pub fn new(
        repo: Arc<dyn TicketRepository>,
        token_issuer: Arc<dyn TokenIssuer>,
        notifier: Arc<dyn Notifier>,
        auth: Arc<dyn OperatorAuth>,
        time_provider: Arc<dyn TimeProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repo,
            token_issuer,
            notifier,
            auth,
            time_provider,
            config,
        }
    }

    /// Seed the configured lanes (idempotent; run once at startup)
    pub async fn ensure_lanes(&self) -> Result<()> {
        for lane in &self.config.lanes {
            self.repo.ensure_lane(lane).await?;
        }
        info!(lanes = self.config.lanes.len(), "Lanes seeded");
        Ok(())
    }

    /// Join a lane. Idempotent: a user who already holds an active ticket
    /// gets that ticket back unchanged, wherever it is.
    pub async fn enqueue(&self, lane_id: LaneId, profile: &UserProfile) -> Result<Ticket> {
        self.repo
            .find_lane(lane_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("lane {}", lane_id)))?;

        let user = self.repo.upsert_user(profile).await?;

        if let Some(active) = self.repo.find_active_ticket(user.id).await? {
            debug!(
                user_id = user.id,
                ticket_id = active.id,
                status = %active.status,
                "Enqueue ignored, user already holds an active ticket"
            );
            return Ok(active);
        }

        let now = self.time_provider.now_millis();
        match self.repo.insert_waiting_ticket(lane_id, user.id, now).await {
            Ok(ticket) => {
                info!(
                    ticket_id = ticket.id,
                    lane_id,
                    user_id = user.id,
                    "Ticket created"
                );
                Ok(ticket)
            }
            // Lost a double-submission race: the winning insert's ticket is
            // the user's active ticket now, return it unchanged.
            Err(AppError::Conflict(_)) => self
                .repo
                .find_active_ticket(user.id)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "active ticket for user {} vanished after insert conflict",
                        user.id
                    ))
                }),
            Err(e) => Err(e),
        }
    }

    /// Withdraw the caller's active ticket. Returns false when there is
    /// nothing to cancel.
    pub async fn leave(&self, external_id: &str) -> Result<bool> {
        let user = match self.repo.find_user(external_id).await? {
            Some(user) => user,
            None => return Ok(false),
        };

        let now = self.time_provider.now_millis();
        match self.repo.cancel_active_ticket(user.id, now).await? {
            Some(ticket) => {
                info!(ticket_id = ticket.id, user_id = user.id, "Ticket canceled");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The caller's active ticket with its waiting rank, if any
    pub async fn position(&self, external_id: &str) -> Result<Option<TicketPosition>> {
        let user = match self.repo.find_user(external_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let ticket = match self.repo.find_active_ticket(user.id).await? {
            Some(ticket) => ticket,
            None => return Ok(None),
        };

        let position = match ticket.status {
            TicketStatus::Waiting => {
                let rank = self.repo.waiting_position(&ticket).await?;
                // 0 means "not in the waiting set", not a real rank
                (rank > 0).then_some(rank)
            }
            _ => None,
        };

        Ok(Some(TicketPosition { ticket, position }))
    }

    /// Up to `limit` WAITING tickets in FIFO order, for operator review
    pub async fn list_waiting(&self, lane_id: LaneId, limit: i64) -> Result<Vec<Ticket>> {
        self.repo.list_waiting(lane_id, limit).await
    }

    /// Dispatch: advance the oldest WAITING ticket to CALLED and issue a
    /// fresh confirmation token. None means the lane is empty.
    ///
    /// The dispatch notice goes out after the transition commits and is
    /// fire-and-forget: delivery failure never rolls the transition back.
    pub async fn call_next(&self, lane_id: LaneId) -> Result<Option<Ticket>> {
        let now = self.time_provider.now_millis();
        let token = self.token_issuer.issue(now);

        let ticket = match self.repo.claim_next_waiting(lane_id, now, &token).await? {
            Some(ticket) => ticket,
            None => return Ok(None),
        };

        info!(
            ticket_id = ticket.id,
            lane_id,
            token_expires_at = token.expires_at,
            "Ticket called"
        );

        match self.repo.find_user_by_id(ticket.user_id).await? {
            Some(user) => {
                self.notifier
                    .ticket_called(CalledNotice {
                        ticket_id: ticket.id,
                        lane_id,
                        token: token.value,
                        address: user.address,
                    })
                    .await;
            }
            None => {
                warn!(
                    ticket_id = ticket.id,
                    user_id = ticket.user_id,
                    "Called ticket has no user record, notice dropped"
                );
            }
        }

        Ok(Some(ticket))
    }

    /// Resolve the longest-called ticket as absent. None means nothing is
    /// currently CALLED in the lane.
    pub async fn mark_no_show(&self, lane_id: LaneId) -> Result<Option<Ticket>> {
        let now = self.time_provider.now_millis();
        let ticket = self.repo.claim_next_called(lane_id, now).await?;
        if let Some(ticket) = &ticket {
            info!(ticket_id = ticket.id, lane_id, "Ticket marked no-show");
        }
        Ok(ticket)
    }

    /// Finish the longest-confirmed ticket. None means nothing is CONFIRMED
    /// in the lane.
    pub async fn serve_confirmed(&self, lane_id: LaneId) -> Result<Option<Ticket>> {
        let now = self.time_provider.now_millis();
        let ticket = self.repo.claim_next_confirmed(lane_id, now).await?;
        if let Some(ticket) = &ticket {
            info!(ticket_id = ticket.id, lane_id, "Ticket served");
        }
        Ok(ticket)
    }

    /// Confirm physical presence via token. The only entry point reachable
    /// from outside the chat transport, hence the auth gate at this layer.
    ///
    /// Unknown token, non-CALLED ticket and expired token all collapse into
    /// InvalidOrExpiredToken so probing cannot tell them apart.
    pub async fn confirm_by_token(&self, token: &str, caller_external_id: &str) -> Result<Ticket> {
        if !self.auth.is_operator(caller_external_id) {
            return Err(AppError::Unauthorized(format!(
                "caller {} is not an operator",
                caller_external_id
            )));
        }

        let now = self.time_provider.now_millis();
        match self.repo.confirm_by_token(token, now).await? {
            Some(ticket) => {
                info!(
                    ticket_id = ticket.id,
                    lane_id = ticket.lane_id,
                    "Ticket confirmed"
                );
                Ok(ticket)
            }
            None => Err(AppError::InvalidOrExpiredToken),
        }
    }

    /// Created/confirmed counts over one UTC calendar day, optionally scoped
    /// to a single lane. Pure aggregate read.
    pub async fn day_stats(&self, day: NaiveDate, lane_id: Option<LaneId>) -> Result<DayStats> {
        let start = day.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        let end = start + MILLIS_PER_DAY;

        let created = self.repo.count_created_between(start, end, lane_id).await?;
        let confirmed = self
            .repo
            .count_confirmed_between(start, end, lane_id)
            .await?;

        Ok(DayStats { created, confirmed })
    }
}
