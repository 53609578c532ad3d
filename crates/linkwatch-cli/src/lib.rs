//! Linkwatch CLI library
//!
//! Scenario runners and configuration loading for the `linkwatch`
//! demonstration binary.

pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;

pub use app::ScenarioRunner;
pub use cli::{Cli, Commands};
pub use clock::SteppedClock;
pub use error::{CliError, Result};
