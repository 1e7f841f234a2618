//! Compute backend resolution at worker start.
//!
//! `auto` probes in a fixed priority order: platform-native acceleration,
//! then a general-purpose GPU backend, then CPU. An explicit preference is
//! returned unchecked; if the chosen backend later refuses to initialise,
//! that surfaces as a processing error, not here. Probes are side-effect-free
//! and idempotent, so resolution happens exactly once per run.

use std::env;
use std::path::Path;

use stem_studio_proto::{BackendKind, DeviceSelection};
use tracing::{debug, info};

/// A capability probe for one accelerated backend.
pub trait AccelProbe {
    fn backend(&self) -> BackendKind;
    fn is_available(&self) -> bool;
}

/// Platform-native acceleration (Metal on Apple hardware).
pub struct MetalProbe;

impl AccelProbe for MetalProbe {
    fn backend(&self) -> BackendKind {
        BackendKind::Metal
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "macos")
    }
}

/// General-purpose GPU acceleration via the CUDA driver.
pub struct CudaProbe;

impl AccelProbe for CudaProbe {
    fn backend(&self) -> BackendKind {
        BackendKind::Cuda
    }

    fn is_available(&self) -> bool {
        Path::new("/proc/driver/nvidia/version").exists() || path_contains("nvidia-smi")
    }
}

fn path_contains(binary: &str) -> bool {
    let Some(path) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path).any(|dir| dir.join(binary).is_file())
}

/// Resolve a device preference against the built-in probes.
pub fn resolve(selection: DeviceSelection) -> BackendKind {
    resolve_with(&[&MetalProbe, &CudaProbe], selection)
}

/// Resolve against an explicit probe list, in priority order.
pub fn resolve_with(probes: &[&dyn AccelProbe], selection: DeviceSelection) -> BackendKind {
    let backend = match selection {
        DeviceSelection::Cpu => BackendKind::Cpu,
        DeviceSelection::Accelerated => platform_accelerated(),
        DeviceSelection::Auto => {
            let hit = probes.iter().find(|probe| {
                let available = probe.is_available();
                debug!(backend = %probe.backend(), available, "probed backend");
                available
            });
            hit.map_or(BackendKind::Cpu, |probe| probe.backend())
        }
    };
    info!(requested = %selection, resolved = %backend, "resolved compute backend");
    backend
}

/// The accelerated backend an explicit `accelerated` request resolves to.
pub fn platform_accelerated() -> BackendKind {
    if cfg!(target_os = "macos") {
        BackendKind::Metal
    } else {
        BackendKind::Cuda
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProbe {
        backend: BackendKind,
        available: bool,
    }

    impl AccelProbe for FakeProbe {
        fn backend(&self) -> BackendKind {
            self.backend
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    #[test]
    fn test_auto_falls_through_to_cpu() {
        let metal = FakeProbe { backend: BackendKind::Metal, available: false };
        let cuda = FakeProbe { backend: BackendKind::Cuda, available: false };
        let resolved = resolve_with(&[&metal, &cuda], DeviceSelection::Auto);
        assert_eq!(resolved, BackendKind::Cpu);
    }

    #[test]
    fn test_auto_takes_first_available_probe() {
        let metal = FakeProbe { backend: BackendKind::Metal, available: true };
        let cuda = FakeProbe { backend: BackendKind::Cuda, available: true };
        assert_eq!(resolve_with(&[&metal, &cuda], DeviceSelection::Auto), BackendKind::Metal);

        let metal_off = FakeProbe { backend: BackendKind::Metal, available: false };
        assert_eq!(resolve_with(&[&metal_off, &cuda], DeviceSelection::Auto), BackendKind::Cuda);
    }

    #[test]
    fn test_explicit_cpu_skips_probing() {
        // A probe that panics would fail the test if it were consulted.
        struct PanicProbe;
        impl AccelProbe for PanicProbe {
            fn backend(&self) -> BackendKind {
                BackendKind::Cuda
            }
            fn is_available(&self) -> bool {
                panic!("explicit selection must not probe");
            }
        }
        assert_eq!(resolve_with(&[&PanicProbe], DeviceSelection::Cpu), BackendKind::Cpu);
    }

    #[test]
    fn test_accelerated_is_returned_unchecked() {
        let resolved = resolve_with(&[], DeviceSelection::Accelerated);
        assert_eq!(resolved, platform_accelerated());
        assert!(resolved.is_accelerated());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let cuda = FakeProbe { backend: BackendKind::Cuda, available: true };
        let first = resolve_with(&[&cuda], DeviceSelection::Auto);
        let second = resolve_with(&[&cuda], DeviceSelection::Auto);
        assert_eq!(first, second);
    }
}
