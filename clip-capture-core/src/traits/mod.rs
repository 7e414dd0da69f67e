pub mod clock;
pub mod frame_source;
pub mod frame_transformer;
pub mod media_device;
pub mod upload_sink;
pub mod video_encoder;
