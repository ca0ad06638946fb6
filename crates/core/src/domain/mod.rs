// Domain Layer - Entities and domain rules

pub mod error;
pub mod lane;
pub mod ticket;
pub mod user;

pub use error::DomainError;
pub use lane::{Lane, LaneId};
pub use ticket::{Ticket, TicketId, TicketStatus};
pub use user::{User, UserId, UserProfile};
