//! Static descriptions of the worker services the application knows about.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use stem_studio_proto::PROTOCOL_VERSION;

use crate::client::locator;
use crate::settings::ClientSettings;

/// The worker services shipped with the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    BeatDetector,
    DrumSeparator,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 2] = [ServiceKind::BeatDetector, ServiceKind::DrumSeparator];

    /// Logical service name; also the worker binary's file name.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::BeatDetector => "beat-detector",
            ServiceKind::DrumSeparator => "drum-separator",
        }
    }

    /// Build the descriptor for this service under the given settings.
    pub fn descriptor(&self, settings: &ClientSettings) -> ServiceDescriptor {
        let args = match self {
            ServiceKind::BeatDetector => ArgSchema {
                output_dir_required: false,
                options: &[OptionSpec { name: "fine", takes_value: false }],
            },
            ServiceKind::DrumSeparator => ArgSchema {
                output_dir_required: true,
                options: &[OptionSpec { name: "quality", takes_value: true }],
            },
        };
        ServiceDescriptor {
            name: self.name(),
            binary: self.name(),
            locations: locator::candidate_dirs(settings),
            args,
            payload_version: PROTOCOL_VERSION,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown service `{0}`")]
pub struct ServiceParseError(String);

impl FromStr for ServiceKind {
    type Err = ServiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ServiceParseError(s.to_string()))
    }
}

/// One task-specific option a service accepts.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub takes_value: bool,
}

/// The command-line surface a service accepts beyond `--input`/`--device`.
#[derive(Debug, Clone, Copy)]
pub struct ArgSchema {
    pub output_dir_required: bool,
    pub options: &'static [OptionSpec],
}

impl ArgSchema {
    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|spec| spec.name == name)
    }
}

/// Immutable metadata describing how to find and invoke one worker kind.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub binary: &'static str,
    /// Candidate install locations, in fixed search order.
    pub locations: Vec<PathBuf>,
    pub args: ArgSchema,
    /// Newest document version this client understands.
    pub payload_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_name() {
        for kind in ServiceKind::ALL {
            assert_eq!(kind.name().parse::<ServiceKind>().unwrap(), kind);
        }
        assert!("vocal-isolator".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn test_schemas_match_the_worker_surfaces() {
        let settings = ClientSettings::default();

        let beats = ServiceKind::BeatDetector.descriptor(&settings);
        assert!(!beats.args.output_dir_required);
        assert!(beats.args.option("fine").is_some());
        assert!(beats.args.option("quality").is_none());

        let drums = ServiceKind::DrumSeparator.descriptor(&settings);
        assert!(drums.args.output_dir_required);
        assert!(drums.args.option("quality").unwrap().takes_value);
        assert_eq!(drums.binary, "drum-separator");
    }
}
