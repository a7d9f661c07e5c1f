//! Core logic for the LEXArchive mirror daemon.
//!
//! The crate mirrors NASA's Planetary Systems table into a local SQLite
//! store and coordinates the background workers around it: the periodic
//! remote-diff synchronizer, the gate that pauses foreground commands
//! while a cycle runs, the bounded render admission queue, and the
//! notification scheduler.

pub mod config;
pub mod error;
pub mod gate;
pub mod notify;
pub mod renderq;
pub mod sched;
pub mod store;
pub mod subs;
pub mod sync;
pub mod tap;
pub mod values;

pub use config::AppConfig;
pub use error::{ArchiveError, ArchiveResult};
pub use gate::SyncGate;
pub use renderq::RenderQueue;
pub use store::ArchiveStore;
pub use sync::Synchronizer;
pub use tap::TapClient;
