//! Resolved target description.
//!
//! An immutable bag of facts about the compilation target, produced once by
//! configuration resolution (triple parsing, driver flags) and consumed by
//! the ABI model. Unsupported configurations are rejected at the parse
//! boundary (`parse::validate_description`); everything representable here
//! is a target the closed tables in this crate can answer for.

use serde::{Deserialize, Serialize};

/// Operating system family of the target.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Windows,
    #[default]
    Linux,
    Osx,
    FreeBsd,
    OpenBsd,
    DragonFlyBsd,
    Solaris,
}

impl OsFamily {
    /// Every supported family except Windows follows POSIX conventions.
    pub fn is_posix(self) -> bool {
        !matches!(self, OsFamily::Windows)
    }
}

/// Ordered CPU instruction-set capability level.
///
/// The derived ordering is the feature ordering: a CPU at tier `T` supports
/// everything every lower tier supports.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CpuTier {
    #[default]
    Baseline,
    Sse,
    Sse2,
    Sse4_1,
    Avx,
    Avx2,
    Avx512,
}

/// Resolved facts about the compilation target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetDescription {
    /// Operating system family.
    pub os: OsFamily,
    /// 64-bit instruction set.
    pub is_64bit: bool,
    /// 64-bit pointer model. Distinct from `is_64bit`: an ILP32 environment
    /// on a 64-bit instruction set keeps 4-byte pointers.
    pub is_lp64: bool,
    /// COFF object format, as opposed to the legacy OMF. Only meaningful on
    /// Windows.
    pub object_format_is_coff: bool,
    /// CPU feature tier the generated code may assume.
    pub cpu: CpuTier,
    /// C++ standard version the target toolchain follows (e.g. 201703).
    pub cpp_std: u32,
    /// Name of the C runtime library to link against.
    pub c_runtime: String,
}

impl TargetDescription {
    /// Linux x86-64.
    pub fn linux_x86_64() -> Self {
        Self {
            os: OsFamily::Linux,
            is_64bit: true,
            is_lp64: true,
            object_format_is_coff: false,
            cpu: CpuTier::Sse2,
            cpp_std: 201703,
            c_runtime: String::new(),
        }
    }

    /// Linux x86 (32-bit).
    pub fn linux_x86() -> Self {
        Self {
            os: OsFamily::Linux,
            is_64bit: false,
            is_lp64: false,
            object_format_is_coff: false,
            cpu: CpuTier::Baseline,
            cpp_std: 201703,
            c_runtime: String::new(),
        }
    }

    /// Windows x64 (COFF, MSVC runtime).
    pub fn windows_x64() -> Self {
        Self {
            os: OsFamily::Windows,
            is_64bit: true,
            is_lp64: true,
            object_format_is_coff: true,
            cpu: CpuTier::Sse2,
            cpp_std: 201703,
            c_runtime: "libcmt".into(),
        }
    }

    /// Windows x86 with the COFF object format (MSVC toolchain).
    pub fn windows_x86_coff() -> Self {
        Self {
            os: OsFamily::Windows,
            is_64bit: false,
            is_lp64: false,
            object_format_is_coff: true,
            cpu: CpuTier::Baseline,
            cpp_std: 201703,
            c_runtime: "libcmt".into(),
        }
    }

    /// Windows x86 with the legacy OMF object format.
    pub fn windows_x86_omf() -> Self {
        Self {
            os: OsFamily::Windows,
            is_64bit: false,
            is_lp64: false,
            object_format_is_coff: false,
            cpu: CpuTier::Baseline,
            cpp_std: 201703,
            c_runtime: "snn".into(),
        }
    }

    /// macOS x86-64.
    pub fn macos_x86_64() -> Self {
        Self {
            os: OsFamily::Osx,
            is_64bit: true,
            is_lp64: true,
            object_format_is_coff: false,
            cpu: CpuTier::Avx,
            cpp_std: 201703,
            c_runtime: String::new(),
        }
    }

    /// macOS x86 (32-bit, pre-Catalina toolchains).
    pub fn macos_x86() -> Self {
        Self {
            os: OsFamily::Osx,
            is_64bit: false,
            is_lp64: false,
            object_format_is_coff: false,
            cpu: CpuTier::Sse2,
            cpp_std: 201703,
            c_runtime: String::new(),
        }
    }

    /// FreeBSD x86-64.
    pub fn freebsd_x86_64() -> Self {
        Self {
            os: OsFamily::FreeBsd,
            ..Self::linux_x86_64()
        }
    }

    /// FreeBSD x86 (32-bit).
    pub fn freebsd_x86() -> Self {
        Self {
            os: OsFamily::FreeBsd,
            ..Self::linux_x86()
        }
    }

    /// OpenBSD x86-64.
    pub fn openbsd_x86_64() -> Self {
        Self {
            os: OsFamily::OpenBsd,
            ..Self::linux_x86_64()
        }
    }

    /// DragonFlyBSD x86-64. DragonFlyBSD has no 32-bit flavor.
    pub fn dragonflybsd_x86_64() -> Self {
        Self {
            os: OsFamily::DragonFlyBsd,
            ..Self::linux_x86_64()
        }
    }

    /// Solaris x86-64.
    pub fn solaris_x86_64() -> Self {
        Self {
            os: OsFamily::Solaris,
            ..Self::linux_x86_64()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_split() {
        assert!(!OsFamily::Windows.is_posix());
        assert!(OsFamily::Linux.is_posix());
        assert!(OsFamily::Osx.is_posix());
        assert!(OsFamily::DragonFlyBsd.is_posix());
    }

    #[test]
    fn cpu_tiers_are_ordered() {
        assert!(CpuTier::Baseline < CpuTier::Sse);
        assert!(CpuTier::Sse < CpuTier::Sse2);
        assert!(CpuTier::Sse2 < CpuTier::Sse4_1);
        assert!(CpuTier::Sse4_1 < CpuTier::Avx);
        assert!(CpuTier::Avx < CpuTier::Avx2);
        assert!(CpuTier::Avx2 < CpuTier::Avx512);
    }

    #[test]
    fn description_serializes_for_tooling() {
        let desc = TargetDescription::linux_x86_64();
        let json = serde_json::to_string(&desc).unwrap();
        assert!(json.contains("\"linux\""));
        let back: TargetDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn presets() {
        let linux = TargetDescription::linux_x86_64();
        assert!(linux.is_64bit && linux.is_lp64);
        assert!(!linux.object_format_is_coff);

        let win = TargetDescription::windows_x64();
        assert!(win.object_format_is_coff);
        assert_eq!(win.c_runtime, "libcmt");

        let omf = TargetDescription::windows_x86_omf();
        assert!(!omf.is_64bit && !omf.object_format_is_coff);

        let dfly = TargetDescription::dragonflybsd_x86_64();
        assert!(dfly.is_64bit);
    }
}
