// Ticket Domain Model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::error::{DomainError, Result};
use crate::domain::lane::LaneId;
use crate::domain::user::UserId;

/// Ticket ID (store-assigned, monotone)
pub type TicketId = i64;

/// Ticket lifecycle status
///
/// WAITING -> CALLED -> CONFIRMED -> SERVED is the happy path.
/// CALLED -> NO_SHOW and {WAITING, CALLED, CONFIRMED} -> CANCELED are the
/// only other transitions. SERVED, CANCELED and NO_SHOW are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Waiting,
    Called,
    Confirmed,
    Served,
    Canceled,
    NoShow,
}

impl TicketStatus {
    /// Statuses that count towards the one-active-ticket-per-user rule
    pub const ACTIVE: [TicketStatus; 3] = [
        TicketStatus::Waiting,
        TicketStatus::Called,
        TicketStatus::Confirmed,
    ];

    pub fn is_active(&self) -> bool {
        match self {
            TicketStatus::Waiting | TicketStatus::Called | TicketStatus::Confirmed => true,
            TicketStatus::Served | TicketStatus::Canceled | TicketStatus::NoShow => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Waiting => write!(f, "WAITING"),
            TicketStatus::Called => write!(f, "CALLED"),
            TicketStatus::Confirmed => write!(f, "CONFIRMED"),
            TicketStatus::Served => write!(f, "SERVED"),
            TicketStatus::Canceled => write!(f, "CANCELED"),
            TicketStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = DomainError;

    // Unknown text in the status column is a storage fault, never a fallback
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "WAITING" => Ok(TicketStatus::Waiting),
            "CALLED" => Ok(TicketStatus::Called),
            "CONFIRMED" => Ok(TicketStatus::Confirmed),
            "SERVED" => Ok(TicketStatus::Served),
            "CANCELED" => Ok(TicketStatus::Canceled),
            "NO_SHOW" => Ok(TicketStatus::NoShow),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Ticket Entity
///
/// One user's claim on a position in a lane. `created_at` is assigned once at
/// creation and is the sole FIFO ordering key; each transition stamps exactly
/// its own timestamp column. Tickets are never deleted - terminal rows are
/// retained for statistics and audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub lane_id: LaneId,
    pub user_id: UserId,
    pub status: TicketStatus,

    pub created_at: i64, // epoch ms
    pub called_at: Option<i64>,
    pub confirmed_at: Option<i64>,
    pub served_at: Option<i64>,
    pub canceled_at: Option<i64>,
    pub no_show_at: Option<i64>,

    pub confirm_token: Option<String>,
    pub token_expires_at: Option<i64>,
}

impl Ticket {
    /// Create a fresh WAITING ticket with explicit id and timestamp
    pub fn new_waiting(id: TicketId, lane_id: LaneId, user_id: UserId, created_at: i64) -> Self {
        Self {
            id,
            lane_id,
            user_id,
            status: TicketStatus::Waiting,
            created_at,
            called_at: None,
            confirmed_at: None,
            served_at: None,
            canceled_at: None,
            no_show_at: None,
            confirm_token: None,
            token_expires_at: None,
        }
    }

    /// Transition WAITING -> CALLED, attaching a fresh confirmation token
    pub fn call(&mut self, now_millis: i64, token: String, token_expires_at: i64) -> Result<()> {
        match self.status {
            TicketStatus::Waiting => {
                self.status = TicketStatus::Called;
                self.called_at = Some(now_millis);
                self.confirm_token = Some(token);
                self.token_expires_at = Some(token_expires_at);
                Ok(())
            }
            TicketStatus::Called
            | TicketStatus::Confirmed
            | TicketStatus::Served
            | TicketStatus::Canceled
            | TicketStatus::NoShow => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TicketStatus::Called.to_string(),
            }),
        }
    }

    /// Transition CALLED -> CONFIRMED
    pub fn confirm(&mut self, now_millis: i64) -> Result<()> {
        match self.status {
            TicketStatus::Called => {
                self.status = TicketStatus::Confirmed;
                self.confirmed_at = Some(now_millis);
                Ok(())
            }
            TicketStatus::Waiting
            | TicketStatus::Confirmed
            | TicketStatus::Served
            | TicketStatus::Canceled
            | TicketStatus::NoShow => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TicketStatus::Confirmed.to_string(),
            }),
        }
    }

    /// Transition CONFIRMED -> SERVED
    pub fn serve(&mut self, now_millis: i64) -> Result<()> {
        match self.status {
            TicketStatus::Confirmed => {
                self.status = TicketStatus::Served;
                self.served_at = Some(now_millis);
                Ok(())
            }
            TicketStatus::Waiting
            | TicketStatus::Called
            | TicketStatus::Served
            | TicketStatus::Canceled
            | TicketStatus::NoShow => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TicketStatus::Served.to_string(),
            }),
        }
    }

    /// Transition CALLED -> NO_SHOW
    pub fn mark_no_show(&mut self, now_millis: i64) -> Result<()> {
        match self.status {
            TicketStatus::Called => {
                self.status = TicketStatus::NoShow;
                self.no_show_at = Some(now_millis);
                Ok(())
            }
            TicketStatus::Waiting
            | TicketStatus::Confirmed
            | TicketStatus::Served
            | TicketStatus::Canceled
            | TicketStatus::NoShow => Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: TicketStatus::NoShow.to_string(),
            }),
        }
    }

    /// User-initiated withdrawal: any active status -> CANCELED
    pub fn cancel(&mut self, now_millis: i64) -> Result<()> {
        match self.status {
            TicketStatus::Waiting | TicketStatus::Called | TicketStatus::Confirmed => {
                self.status = TicketStatus::Canceled;
                self.canceled_at = Some(now_millis);
                Ok(())
            }
            TicketStatus::Served | TicketStatus::Canceled | TicketStatus::NoShow => {
                Err(DomainError::InvalidStateTransition {
                    from: self.status.to_string(),
                    to: TicketStatus::Canceled.to_string(),
                })
            }
        }
    }
}
