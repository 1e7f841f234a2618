//! Finding an installed worker binary.
//!
//! Workers are optional: the application ships without them and lights the
//! corresponding feature up only when a binary is found. Candidates are
//! checked in a fixed order (application bundle, development build output,
//! per-user install directory, then the process search path) and absence is
//! a normal outcome, not an error.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::services::ServiceDescriptor;
use crate::settings::ClientSettings;

/// Environment override for the development worker directory.
pub const WORKER_DIR_ENV: &str = "STEM_STUDIO_WORKER_DIR";

/// Candidate directories in search order for the given settings.
pub fn candidate_dirs(settings: &ClientSettings) -> Vec<PathBuf> {
    let mut dirs_in_order = Vec::new();

    // Co-located with the running application bundle.
    if let Ok(exe) = env::current_exe() {
        if let Some(parent) = exe.parent() {
            dirs_in_order.push(parent.to_path_buf());
        }
    }

    // Development build output, from settings or the environment.
    if let Some(dir) = &settings.worker_dir {
        dirs_in_order.push(dir.clone());
    } else if let Some(dir) = env::var_os(WORKER_DIR_ENV) {
        dirs_in_order.push(PathBuf::from(dir));
    }

    // Per-user install location.
    if let Some(data) = dirs::data_local_dir() {
        dirs_in_order.push(data.join("StemStudio").join("bin"));
    }

    // Process search path, last.
    if let Some(path) = env::var_os("PATH") {
        dirs_in_order.extend(env::split_paths(&path));
    }

    dirs_in_order
}

/// First candidate location holding an executable worker binary, if any.
pub fn locate(descriptor: &ServiceDescriptor) -> Option<PathBuf> {
    let file_name = binary_file_name(descriptor.binary);
    for dir in &descriptor.locations {
        let candidate = dir.join(&file_name);
        if !candidate.is_file() {
            continue;
        }
        if ensure_executable(&candidate) {
            debug!(service = descriptor.name, path = %candidate.display(), "worker binary found");
            return Some(candidate);
        }
        // Not executable and not repairable; keep searching.
    }
    debug!(service = descriptor.name, "no worker binary installed");
    None
}

fn binary_file_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// True if the file may be executed, attempting a one-shot permission repair.
#[cfg(unix)]
fn ensure_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    use tracing::warn;

    let Ok(metadata) = path.metadata() else {
        return false;
    };
    let mode = metadata.permissions().mode();
    if mode & 0o111 != 0 {
        return true;
    }

    let repaired = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode | 0o755));
    match repaired {
        Ok(()) => {
            debug!(path = %path.display(), "granted execute permission");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "candidate is not executable, skipping");
            false
        }
    }
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> bool {
    true
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use crate::services::{ArgSchema, ServiceDescriptor};

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("stem-studio-locator-{}-{label}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fake_binary(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn descriptor_with(locations: Vec<PathBuf>) -> ServiceDescriptor {
        ServiceDescriptor {
            name: "beat-detector",
            binary: "beat-detector",
            locations,
            args: ArgSchema { output_dir_required: false, options: &[] },
            payload_version: 1,
        }
    }

    #[test]
    fn test_first_candidate_in_order_wins() {
        let first = scratch_dir("order-first");
        let second = scratch_dir("order-second");
        let expected = fake_binary(&first, "beat-detector", 0o755);
        fake_binary(&second, "beat-detector", 0o755);

        let found = locate(&descriptor_with(vec![first, second])).unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_absent_binary_is_a_normal_outcome() {
        let empty = scratch_dir("absent");
        assert!(locate(&descriptor_with(vec![empty])).is_none());
    }

    #[test]
    fn test_execute_permission_is_repaired_once() {
        let dir = scratch_dir("repair");
        let path = fake_binary(&dir, "beat-detector", 0o644);

        let found = locate(&descriptor_with(vec![dir])).unwrap();
        assert_eq!(found, path);
        let mode = path.metadata().unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0, "execute bit was not granted");
    }

    #[test]
    fn test_plain_directories_are_skipped() {
        let dir = scratch_dir("dir-candidate");
        // A directory named like the binary must not match.
        fs::create_dir_all(dir.join("beat-detector")).unwrap();
        assert!(locate(&descriptor_with(vec![dir])).is_none());
    }

    #[test]
    fn test_settings_worker_dir_precedes_user_install() {
        let dev = scratch_dir("dev-slot");
        let settings = ClientSettings { worker_dir: Some(dev.clone()), ..Default::default() };
        let dirs_in_order = candidate_dirs(&settings);

        let dev_pos = dirs_in_order.iter().position(|d| d == &dev).unwrap();
        // Slot 0 is the executable's own directory.
        assert_eq!(dev_pos, 1);
    }
}
