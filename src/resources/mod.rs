//! Long-lived engine state shared between the loops.
//!
//! Everything here is owned by the
//! [`EngineContext`](crate::context::EngineContext) and reached through it;
//! there is no ambient global state.
//!
//! Overview
//! - `gameconfig` – tick rates, parallelism and window settings (INI backed)
//! - `input` – per-tick keyboard edge buffer and its writer handle
//! - `objectpool` – label-partitioned active and inactive object sets
//! - `rendercmd` – draw closures queued by the physical thread
//! - `requests` – bounded register/unregister request queues
//! - `stats` – run counters and the serialisable run report
//! - `worldtime` – physical tick clock and interpolation factor
pub mod gameconfig;
pub mod input;
pub mod objectpool;
pub mod rendercmd;
pub mod requests;
pub mod stats;
pub mod worldtime;
