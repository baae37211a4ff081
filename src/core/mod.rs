//! Core application primitives (clock, runtime, scheduler, HTTP)

pub mod clock;
pub mod http;
pub mod runtime;
pub mod scheduler;

pub use clock::*;
pub use http::*;
pub use runtime::*;
pub use scheduler::*;
