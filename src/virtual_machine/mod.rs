//! Host side of the execution engine boundary.
//!
//! - [`engine`]: the [`Engine`](engine::Engine) trait and the handles passed to it
//! - [`types`]: environment, responses, messages and query requests
//! - [`errors`]: [`VmError`](errors::VmError)

pub mod engine;
pub mod errors;
pub mod types;
