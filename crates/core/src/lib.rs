//! Pure scheduling core for the vocabulary trainer.
//!
//! Everything here is a synchronous computation over a caller-supplied
//! snapshot: the catalog, the learner's progress records, and an explicit
//! `now`. No I/O, no global clock, no hidden state — which keeps every
//! function deterministic and replayable under test.

pub mod error;
pub mod model;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod time;

pub use error::Error;
