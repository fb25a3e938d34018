//! Herald Event Store: `PostgreSQL` persistence for stored events.

pub mod pg_event_repository;
pub mod schema;
