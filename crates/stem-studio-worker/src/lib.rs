//! Worker-side runtime for StemStudio inference services.
//!
//! Each service ships as its own binary (`beat-detector`, `drum-separator`)
//! built from this crate. A worker run is one-shot: parse arguments, resolve
//! a compute backend, initialise the first processing strategy that works,
//! process the input, print one JSON document on stdout and exit. Diagnostics
//! go to stderr and are never part of the contract.

pub mod assets;
pub mod audio;
pub mod beat;
pub mod cli;
pub mod device;
pub mod drum;
pub mod error;
pub mod fallback;
pub mod runner;

pub use error::WorkerError;
