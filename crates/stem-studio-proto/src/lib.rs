//! Wire contract between the StemStudio application and its worker binaries.
//!
//! Workers are invoked one-shot: the request travels as command-line
//! arguments, the result comes back as a single JSON document on stdout.
//! Exit code 0 pairs with a success document, exit code 1 with an error
//! document; stderr is free-form diagnostics and never carries protocol data.

pub mod device;
pub mod document;
pub mod payload;

pub use device::{BackendKind, DeviceSelection};
pub use document::{ErrorDocument, SuccessDocument, WorkerErrorKind};
pub use payload::{BeatPayload, DrumStem, DrumStemsPayload};

/// Version stamped into every document crossing the process boundary.
pub const PROTOCOL_VERSION: u32 = 1;

/// Exit code a worker uses when it emits a structured error document.
pub const EXIT_STRUCTURED_FAILURE: u8 = 1;
