//! TOML parsing, serialization, and validation for target descriptions.
//!
//! Target descriptions are stored as `.target.toml` files alongside a Lyra
//! project. This module loads, serializes, and validates them; validation is
//! where the configuration-fatal conditions of the ABI model surface, since
//! the closed enums make everything else unrepresentable.

use std::path::Path;

use crate::description::{CpuTier, OsFamily, TargetDescription};
use crate::error::{Result, TargetError};

/// A validation issue found in a target description.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// Load a target description from a `.target.toml` file.
pub fn load_description_toml(path: &Path) -> Result<TargetDescription> {
    if !path.exists() {
        return Err(TargetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_description_toml(&content)
}

/// Parse a target description from a TOML string.
pub fn parse_description_toml(toml_str: &str) -> Result<TargetDescription> {
    let desc: TargetDescription = toml::from_str(toml_str)?;
    Ok(desc)
}

/// Serialize a target description to pretty TOML.
pub fn description_to_toml(desc: &TargetDescription) -> Result<String> {
    let toml_str = toml::to_string_pretty(desc)?;
    Ok(toml_str)
}

/// Validate a target description against the combinations the ABI tables
/// support.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
/// Compilation must not proceed past an "error" issue.
pub fn validate_description(
    desc: &TargetDescription,
) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if desc.is_lp64 && !desc.is_64bit {
        issues.push(ValidationIssue {
            severity: "error",
            message: "LP64 pointer model requires a 64-bit instruction set".into(),
        });
    }

    if desc.is_64bit && desc.cpu < CpuTier::Sse2 {
        issues.push(ValidationIssue {
            severity: "error",
            message: format!(
                "64-bit x86 baseline includes SSE2; feature tier {:?} is below it",
                desc.cpu
            ),
        });
    }

    if desc.os == OsFamily::DragonFlyBsd && !desc.is_64bit {
        issues.push(ValidationIssue {
            severity: "error",
            message: "DragonFlyBSD is 64-bit only".into(),
        });
    }

    if desc.os == OsFamily::Windows && desc.object_format_is_coff && desc.c_runtime.is_empty() {
        issues.push(ValidationIssue {
            severity: "error",
            message: "COFF Windows target needs a C runtime library name".into(),
        });
    }

    if desc.os != OsFamily::Windows && desc.object_format_is_coff {
        issues.push(ValidationIssue {
            severity: "warning",
            message: "object-format flag has no effect outside Windows".into(),
        });
    }

    if desc.os == OsFamily::Osx && !desc.is_64bit {
        issues.push(ValidationIssue {
            severity: "warning",
            message: "32-bit macOS toolchains are end-of-life".into(),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Validate and collapse the issue list into a single fatal error, for
/// callers that only want a go/no-go answer.
pub fn require_valid(desc: &TargetDescription) -> Result<()> {
    match validate_description(desc) {
        Ok(()) => Ok(()),
        Err(issues) => {
            let errors: Vec<&ValidationIssue> =
                issues.iter().filter(|i| i.severity == "error").collect();
            if errors.is_empty() {
                return Ok(());
            }
            Err(TargetError::Validation {
                detail: errors
                    .iter()
                    .map(|i| i.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            })
        }
    }
}

/// Discover all `.target.toml` files in a project's `targets/` directory.
///
/// Returns a list of (target_name, file_path) pairs.
pub fn discover_targets(project_dir: &Path) -> Result<Vec<(String, std::path::PathBuf)>> {
    let targets_dir = project_dir.join("targets");
    if !targets_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut targets = Vec::new();
    for entry in std::fs::read_dir(&targets_dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(name) = file_name.strip_suffix(".target.toml") {
            targets.push((name.to_string(), path));
        }
    }
    targets.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(targets)
}
