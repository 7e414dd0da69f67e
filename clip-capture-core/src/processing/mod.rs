pub mod chunk_collector;
pub mod compositor;
pub mod ticker;
pub mod time_format;
