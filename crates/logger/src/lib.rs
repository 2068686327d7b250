//! Shared tracing setup for the Uppe binaries.

mod subscriber;

pub use subscriber::{init_tracing, init_tracing_with_level};
