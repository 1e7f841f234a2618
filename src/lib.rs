//! Supervising side of the StemStudio worker services.
//!
//! Some analysis backends need runtime environments that cannot coexist with
//! the main application process, so they ship as independently-built worker
//! binaries (`beat-detector`, `drum-separator`). This crate is everything the
//! application needs to drive them: find the binary, turn a request into an
//! argument vector, run the process under a timeout with staged termination,
//! and decode stdout into a typed result or one of a closed set of failures.
//!
//! The entry point is [`ServiceClient`]; everything else is plumbing it
//! composes.

pub mod client;
pub mod error;
pub mod request;
pub mod services;
pub mod settings;

pub use client::{ServiceClient, ServiceReport};
pub use error::{FailureKind, InvokeError};
pub use request::{InvocationRequest, OptionValue};
pub use services::{ServiceDescriptor, ServiceKind};
pub use settings::ClientSettings;

pub use stem_studio_proto as proto;
