pub mod media;
pub mod result;
pub mod task_store;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
