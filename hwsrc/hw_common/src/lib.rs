#[macro_use] extern crate serde_derive;

pub mod payloads;
pub mod primitives;
pub mod session;
pub mod transport;
pub mod ui;

use std::future::Future;

/// Block the current thread on a future. This is a helper for tests and synchronous callers;
/// the library itself never blocks.
pub fn block_on<F: Future>(fut: F) -> F::Output { futures::executor::block_on(fut) }
