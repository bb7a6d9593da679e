//! Data models for the slidecycle crate.
//!
//! This module contains the core data structures shared across the crate:
//! - [`ImageSource`] / [`PlaylistEntry`] / [`Playlist`]: display order plus
//!   the cycled-construction helper for building a fixed-length run from a
//!   short source pool
//! - [`SlideshowState`]: the `Idle → Starting → Running → Ending` machine
//!   with its legality table
//! - [`CycleStatus`]: per-controller progress snapshot
//! - [`SlideshowConfig`] / [`SlideTiming`]: YAML-backed configuration with
//!   the recognized camelCase option names and their defaults
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: config structs derive `Serialize`/`Deserialize` for
//!   YAML persistence
//! - **Cloneable**: [`CycleStatus`] is wrapped in `Arc<RwLock<>>` by
//!   [`StateManager`](crate::state::StateManager) for thread-safe access
//! - **Passive**: no timing or surface behavior lives here; mutation goes
//!   through StateManager's `update()` so change events stay consistent

pub mod config;
pub mod playlist;
pub mod state;

pub use config::{SlideTiming, SlideshowConfig};
pub use playlist::{ImageSource, Playlist, PlaylistEntry};
pub use state::{CycleStatus, SlideshowState};
