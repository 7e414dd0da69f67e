pub mod config;
pub mod error;
pub mod facing;
pub mod frame;
pub mod media_format;
pub mod recording_result;
pub mod state;
pub mod stream;
