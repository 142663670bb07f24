//! Visual Studio installation discovery.
//!
//! `vswhere.exe` ships with the Visual Studio Installer and reports the
//! installed products as JSON. From the newest matching installation we
//! pick the `vcvars*.bat` script that matches the host architecture.

use crate::config::LocateConfig;
use crate::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Variables that may hold the Program Files directory, in lookup order.
pub const INSTALLER_ROOT_VARS: [&str; 2] = ["ProgramFiles(x86)", "ProgramFiles"];

/// vcvars script for ARM64 hosts, relative to the installation.
pub const ARM64_BOOTSTRAP: &str = "VC/Auxiliary/Build/vcvarsx86_arm64.bat";

/// vcvars script for x64 hosts, relative to the installation.
pub const X64_BOOTSTRAP: &str = "VC/Auxiliary/Build/vcvars64.bat";

/// VS Express ships only the cross script.
pub const X64_FALLBACK_BOOTSTRAP: &str = "VC/Auxiliary/Build/vcvarsx86_amd64.bat";

/// A single product record from `vswhere -format json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    /// Root directory of the installation.
    pub installation_path: PathBuf,

    /// Human-readable product name (optional).
    #[serde(default)]
    pub display_name: Option<String>,

    /// Product version (optional).
    #[serde(default)]
    pub installation_version: Option<String>,
}

/// Host CPU architecture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostArch {
    X64,
    Arm64,
}

impl HostArch {
    /// Detect the architecture of the running host.
    pub fn detect() -> Self {
        Self::from_env(|key| std::env::var_os(key))
    }

    /// Detect the architecture using `lookup` for environment variables.
    ///
    /// `PROCESSOR_ARCHITEW6432` wins over `PROCESSOR_ARCHITECTURE` so that an
    /// emulated process still reports the native machine.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        for key in ["PROCESSOR_ARCHITEW6432", "PROCESSOR_ARCHITECTURE"] {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                return Self::from_name(&value.to_string_lossy());
            }
        }
        Self::from_name(std::env::consts::ARCH)
    }

    /// Map a machine name (`ARM64`, `AMD64`, `aarch64`, ...) to a family.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("arm64") || name.eq_ignore_ascii_case("aarch64") {
            HostArch::Arm64
        } else {
            HostArch::X64
        }
    }
}

/// Resolve the Program Files directory from the environment.
pub fn installer_root<F>(lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    INSTALLER_ROOT_VARS
        .iter()
        .find_map(|key| lookup(key).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
        .ok_or(BuildError::InstallerRootUnset)
}

/// Path of `vswhere.exe` under `root`, which must exist.
pub fn vswhere_path(root: &Path) -> Result<PathBuf> {
    let path = root
        .join("Microsoft Visual Studio")
        .join("Installer")
        .join("vswhere.exe");
    if !path.is_file() {
        return Err(BuildError::ToolNotFound { path });
    }
    Ok(path)
}

/// Arguments passed to vswhere for the given `-requires` list.
pub fn vswhere_args(requires: &[String]) -> Vec<String> {
    let mut args: Vec<String> = ["-latest", "-prerelease", "-requiresAny"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for component in requires {
        args.push("-requires".to_string());
        args.push(component.clone());
    }

    for arg in ["-products", "*", "-utf8", "-format", "json"] {
        args.push(arg.to_string());
    }

    args
}

/// Run vswhere and return its raw JSON output.
pub fn query_installations(vswhere: &Path, requires: &[String]) -> Result<Vec<u8>> {
    let mut cmd = Command::new(vswhere);
    cmd.args(vswhere_args(requires));

    log::debug!(
        "Running {:?} {:?}",
        cmd.get_program(),
        cmd.get_args().collect::<Vec<_>>()
    );

    let output = cmd.output().map_err(|source| BuildError::Spawn {
        program: vswhere.display().to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(BuildError::QueryFailed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Decode vswhere JSON; an empty list means nothing usable is installed.
pub fn parse_installations(json: &[u8]) -> Result<Vec<Installation>> {
    let installations: Vec<Installation> = serde_json::from_slice(json)?;
    if installations.is_empty() {
        return Err(BuildError::NoInstallationFound);
    }
    Ok(installations)
}

/// Pick the vcvars script for `arch` inside `install_root`.
pub fn select_bootstrap_script(install_root: &Path, arch: HostArch) -> Result<PathBuf> {
    let path = match arch {
        HostArch::Arm64 => install_root.join(ARM64_BOOTSTRAP),
        HostArch::X64 => {
            let primary = install_root.join(X64_BOOTSTRAP);
            if primary.exists() {
                primary
            } else {
                log::debug!("{} not found, trying VS Express", primary.display());
                install_root.join(X64_FALLBACK_BOOTSTRAP)
            }
        }
    };

    if !path.exists() {
        return Err(BuildError::BootstrapScriptMissing { path });
    }
    Ok(path)
}

/// Find the bootstrap script, either from config or through vswhere.
pub fn locate_bootstrap_script<F>(
    config: &LocateConfig,
    lookup: F,
    arch: HostArch,
) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(path) = &config.bootstrap {
        if !path.exists() {
            return Err(BuildError::BootstrapScriptMissing { path: path.clone() });
        }
        log::info!("Using configured bootstrap script {}", path.display());
        return Ok(path.clone());
    }

    let root = installer_root(lookup)?;
    let vswhere = vswhere_path(&root)?;
    let json = query_installations(&vswhere, &config.requires)?;
    let installations = parse_installations(&json)?;

    let install = &installations[0];
    log::info!(
        "Found {} {} at {}",
        install.display_name.as_deref().unwrap_or("Visual Studio"),
        install.installation_version.as_deref().unwrap_or(""),
        install.installation_path.display()
    );

    let script = select_bootstrap_script(&install.installation_path, arch)?;
    log::info!("Selected bootstrap script {}", script.display());
    Ok(script)
}
