//! Error types for vcshim-build.

use miette::Diagnostic;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type for vcshim-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while provisioning the compiler launcher.
#[derive(Error, Diagnostic, Debug)]
pub enum BuildError {
    /// Neither installer root variable is set.
    #[error("Neither ProgramFiles(x86) nor ProgramFiles is set")]
    #[diagnostic(
        code(vcshim::installer_root_unset),
        help("vswhere.exe is looked up under the Program Files directory")
    )]
    InstallerRootUnset,

    /// The installer query tool does not exist.
    #[error("Could not find {}", .path.display())]
    #[diagnostic(
        code(vcshim::tool_not_found),
        help("install the Visual Studio Installer, or pass --bootstrap")
    )]
    ToolNotFound { path: PathBuf },

    /// vswhere exited with a failure status.
    #[error("vswhere failed ({status}): {stderr}")]
    #[diagnostic(code(vcshim::query_failed))]
    QueryFailed { status: ExitStatus, stderr: String },

    /// vswhere ran but reported no matching installation.
    #[error("Could not parse vswhere.exe output: no matching installation")]
    #[diagnostic(
        code(vcshim::no_installation),
        help("the installer may be present without the C++ build tools")
    )]
    NoInstallationFound,

    /// None of the vcvars candidates exist.
    #[error("Could not find {}", .path.display())]
    #[diagnostic(code(vcshim::bootstrap_missing))]
    BootstrapScriptMissing { path: PathBuf },

    /// The environment harvesting script failed.
    #[error("Environment bootstrap script failed ({status})")]
    #[diagnostic(code(vcshim::harvest_failed))]
    HarvestFailed { status: ExitStatus },

    /// The compiler failed to build the launcher.
    #[error("Failed to build launcher ({status}):\n{stdout}\n{stderr}")]
    #[diagnostic(code(vcshim::build_failure))]
    BuildFailure {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    /// The compiler reported success but produced nothing.
    #[error("Launcher executable not created: {}", .path.display())]
    #[diagnostic(code(vcshim::missing_output))]
    MissingOutput { path: PathBuf },

    /// A subprocess could not be started.
    #[error("Failed to execute {program}: {source}")]
    #[diagnostic(code(vcshim::spawn))]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON (vswhere output).
    #[error("Failed to parse JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),
}
