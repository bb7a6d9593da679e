// slidecycle - Timed crossfade slide-cycle controller
//
// This is the library crate containing the cycle controller, its state
// machine, and the surface seams. The binary crate (main.rs) provides a
// console demo entry point.

pub mod config;
pub mod cycle;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod state;
pub mod surface;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use cycle::{SlideCycle, SlideshowError};
pub use metrics::Metrics;
pub use models::{ImageSource, Playlist, SlideTiming, SlideshowConfig, SlideshowState};
pub use state::{SlideshowEvent, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
