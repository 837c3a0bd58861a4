//! # Colony Server
//!
//! Async side of colony warfare: per-colony attack decision loops,
//! deferred attack resolution, and the store those results are written to.
//!
//! Battles are fought by `colony_core` when an attack is committed. This
//! crate only decides when to attack, keeps track of attacks in flight,
//! and applies outcomes once they land.
//!
//! ## Crate Structure
//!
//! - [`scheduler`] - Per-colony decision loops and resolution tasks
//! - [`registry`] - Live attack records, descriptors, and counters
//! - [`applier`] - Writes battle outcomes back to colony state
//! - [`store`] - Colony store interface and in-memory implementation
//! - [`service`] - Request/response facade for an outer transport
//! - [`config`] - Scheduler tuning and RON loading
//! - [`clock`] - Wall-clock milliseconds driven by tokio time
//! - [`error`] - Error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod applier;
pub mod clock;
pub mod config;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::applier::{Engagement, OutcomeApplier};
    pub use crate::config::SchedulerConfig;
    pub use crate::error::{Result, WarfareError};
    pub use crate::registry::{AttackId, AttackRecord, AttackStatus};
    pub use crate::scheduler::{AttackScheduler, ColonyStatus, SchedulerStatistics};
    pub use crate::service::{
        IncomingAttack, RaidRequest, RaidResponse, RetreatRequest, SimulateRequest,
        WarfareService,
    };
    pub use crate::store::{BattleSummary, ColonyStore, MemoryColonyStore};
}
