//! Infrastructure Supervisor (spec §4.8): ensures the graph DB, vector DB,
//! and embedding server are running and healthy, handing callers a URL
//! rather than subprocess state.

pub mod docker;
pub mod health;
pub mod port;
pub mod supervisor;

pub use docker::ContainerState;
pub use port::find_available_port;
pub use supervisor::{BackendHandle, BackendKind, Supervisor};
