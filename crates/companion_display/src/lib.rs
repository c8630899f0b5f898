//! # Companion Display
//!
//! Keeps one animated companion entity beside every connected actor that
//! has a pet equipped.
//!
//! ## Design Principles
//!
//! 1. **One task per actor** - a repeating task reconciles, labels and
//!    moves the actor's companion every tick
//! 2. **Single writer** - every entity mutation goes through the mutation
//!    worker, so tick tasks never block on the entity system
//! 3. **Self-healing** - a dead or rejected companion is simply recreated
//!    on a later tick; nothing in the tick path is fatal
//! 4. **External configuration** - label template, cadence and pose
//!    geometry in TOML
//!
//! ## Example
//!
//! ```rust,ignore
//! use companion_display::{CompanionDisplay, Collaborators, DisplayConfig};
//!
//! let config = DisplayConfig::load("config/companions.toml")?;
//! let (display, worker) = CompanionDisplay::new(config, collaborators)?;
//! let _worker = worker.spawn();
//!
//! display.update();
//! display.on_join(actor);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod display;
pub mod error;
pub mod integration;
pub mod label;
mod lifecycle;
pub mod pose;
pub mod reconciler;
pub mod scheduler;
pub mod stats;
pub mod worker;

pub use config::{DisplayConfig, PoseConfig};
pub use display::{Collaborators, CompanionDisplay};
pub use error::{DisplayError, DisplayResult};
pub use label::render_label;
pub use pose::{compute_pose, rotation_suppressed, Pose, PoseCalculator};
pub use reconciler::{CompanionState, TrackedCompanion};
pub use scheduler::{Cadence, DriverHandle, TickClock, TickDriver, TickScheduler, TickStats};
pub use stats::DisplayStats;
pub use worker::{MutationQueue, MutationWorker, WorkerHandle};
