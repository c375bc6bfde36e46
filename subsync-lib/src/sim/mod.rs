//! In-memory implementations of the collaborator interfaces.
//!
//! These back the command-line driver and the test suites. They model a
//! demuxer that receives subtitle packets over time (possibly from another
//! thread), a timed-text decoder, and a front end that records everything
//! the session publishes.

mod decoder;
mod document;
mod frontend;
mod stream;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use decoder::{CueDecoder, CueDecoderFactory, DecoderProbe};
pub use document::MemoryDocument;
pub use frontend::{FrontendState, SimFrontend};
pub use stream::MemoryStream;

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
