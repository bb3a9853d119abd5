//! Subscriber management
//!
//! - `format`: bandwidth string conversions
//! - `resources`: typed binding/queue calls on a held session
//! - `service`: the operations exposed to chat commands
//! - `report`: reply renderings

pub mod format;
pub mod report;
pub mod resources;
pub mod service;

pub use report::StatusAction;
pub use service::SubscriberService;
