//! Data models module
//!
//! - `constants` - Configuration keys and defaults
//! - `config` - Configuration management and command line arguments
//! - `app_state` - Services shared by every command
//! - `response` - Output envelope of every command

pub mod app_state;
pub mod config;
pub mod constants;
pub mod response;

pub use app_state::AppState;
pub use config::{Cli, Configuration};
