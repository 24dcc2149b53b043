//! Core module - platform-independent session logic

pub mod constants;
pub mod controller;
pub mod io_traits;
pub mod pipeline;
pub mod protocol;
pub mod reconnect;
pub mod render;
pub mod round_timer;
pub mod session;
pub mod tutorial_buffer;
pub mod types;
pub mod validation;

pub use controller::{Command, Effect, Input, SessionController, SessionSnapshot};
pub use protocol::{ClientMessage, ServerMessage};
pub use render::RenderInstruction;
pub use session::{ClientSession, SessionEvent};
pub use types::{Role, Screen, Session};
