pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod platform;
pub mod playback;
pub mod tools;

pub use error::*;
pub use models::*;
