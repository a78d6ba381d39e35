//! Workspace facade: re-exports the member crates for embedding and for
//! the root-level integration tests.

pub use breakdown_gateway;
pub use common;
pub use media_pipeline;
pub use telemetry;
