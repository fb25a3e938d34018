//! Herald Client: replicates a remote event bus into a local one.
//!
//! An [`client::EventBusClient`] polls `GET /events?since=<cursor>` on a
//! fixed interval, decodes every event type its [`registry::EventRegistry`]
//! knows, republishes those events on its own local bus, and moves its
//! cursor forward. With auto-forward enabled it also `POST`s events
//! published locally back to the server.

pub mod client;
pub mod config;
pub mod cursor;
pub mod error;
mod origin;
pub mod registry;
pub mod transport;
