//! Seekable media inputs over local, in-memory and progressively downloaded
//! resources, and a bridge exposing them to synchronous pull-callback engines.

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod media;
pub mod open;
pub mod source;

pub use bridge::{CallbackMedia, CallbackMediaAdapter};
pub use config::InputConfig;
pub use error::{InputError, MediaSourceOpenError, OpenFailure};
pub use input::{SeekableInput, SeekableInputExt, EOF};
pub use media::{InputContext, MediaData, NetStats};
pub use open::EngineGate;
