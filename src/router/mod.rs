//! Router registry and address-prefix selection
//!
//! - `selector`: pure prefix rules mapping an address to a site
//! - `registry`: the two routers, their sessions, and per-router locks

pub mod registry;
pub mod selector;

pub use registry::{Router, RouterRegistry};
pub use selector::{select_site, Site};
