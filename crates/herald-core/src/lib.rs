//! Herald Core: shared event abstractions.
//!
//! This crate defines the domain event model, its stored (wire and
//! persistence) projection, and the repository contract that the bus,
//! HTTP, and client crates depend on. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod kind;
pub mod repository;
pub mod stored_event;
