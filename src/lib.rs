//! BrightMind learning platform client
//!
//! `services` hold the domain logic (quiz runner, resource fetcher, progress,
//! certificate) and the REST client; `commands` are the user actions built on
//! top of them.

pub mod commands;
pub mod models;
pub mod services;
pub mod utils;

pub use commands::AppState;
pub use utils::AppConfig;
