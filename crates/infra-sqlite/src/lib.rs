// Lanekeeper Infrastructure - SQLite Adapter
// Implements: TicketRepository

mod connection;
mod migration;
mod ticket_repository;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use ticket_repository::SqliteTicketRepository;

// Note: sqlx::Error conversion is handled by a local helper
// (orphan rules: cannot implement From<sqlx::Error> for AppError here)
