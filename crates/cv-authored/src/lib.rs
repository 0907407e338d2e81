//! Authored Metadata Log (spec §3): the durable sidecar of human-created
//! facts that a `clear()` of the derived graph must never destroy.

pub mod log;

pub use log::{AuthoredLog, ImportStats};
