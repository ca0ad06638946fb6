// Port Layer - Interfaces for external dependencies

pub mod auth;
pub mod notifier;
pub mod ticket_repository;
pub mod time_provider;
pub mod token_issuer;

// Re-exports
pub use auth::{OperatorAuth, StaticOperatorSet};
pub use notifier::{CalledNotice, Notifier};
pub use ticket_repository::TicketRepository;
pub use time_provider::TimeProvider;
pub use token_issuer::{IssuedToken, TokenIssuer};
