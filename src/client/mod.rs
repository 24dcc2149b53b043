//! Client module - terminal front end and network I/O

pub mod app;
pub mod background;
pub mod config;
pub mod http;
pub mod logging;
pub mod pipeline;
pub mod terminal;
pub mod token_store;
pub mod websocket;

pub use app::{AppError, GameClient};
pub use config::Config;
