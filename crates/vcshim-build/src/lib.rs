//! Provisioning of a pre-configured MSVC launcher.
//!
//! `cl.exe` only works after one of the `vcvars*.bat` scripts has set up the
//! environment, which is slow. This crate:
//! - locates the newest Visual Studio installation through `vswhere.exe`
//! - runs the matching vcvars script and harvests the environment it leaves
//! - generates a small C++ launcher that replays that environment and
//!   forwards its arguments to `cl`
//! - builds the launcher with `cl` itself
//!
//! # Example
//!
//! ```toml
//! # vcshim.toml
//! [locate]
//! bootstrap = "C:/BuildTools/VC/Auxiliary/Build/vcvars64.bat"
//!
//! [launcher]
//! output = "cl-x64.exe"
//! ```

pub mod compiler;
pub mod config;
mod error;
pub mod harvest;
pub mod launcher;
pub mod locate;
mod pipeline;

pub use compiler::LauncherCompiler;
pub use config::{HarvestConfig, LauncherConfig, LocateConfig, ShimConfig};
pub use error::{BuildError, Result};
pub use harvest::{EnvVar, ScriptFlavor};
pub use locate::{HostArch, Installation};
pub use pipeline::{Artifacts, Pipeline};
