//! Herald Bus: in-process event fan-out and its durable server side.
//!
//! [`local::LocalEventBus`] delivers events to subscribers inside one
//! process. [`server::EventBusServer`] puts a repository in front of a
//! local bus so that every published event is persisted before it becomes
//! visible, and can later be replicated to remote clients.

pub mod local;
pub mod server;
