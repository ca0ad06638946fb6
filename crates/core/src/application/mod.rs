// Application Layer - Use cases over the domain and ports

pub mod queue_service;

pub use queue_service::{DayStats, QueueService, TicketPosition};
