//! Provisioning configuration (vcshim.toml format).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vcshim.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShimConfig {
    /// Installation discovery.
    #[serde(default)]
    pub locate: LocateConfig,

    /// Environment harvesting.
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Launcher generation and build.
    #[serde(default)]
    pub launcher: LauncherConfig,
}

/// Installation discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateConfig {
    /// Explicit vcvars script; skips vswhere when set.
    #[serde(default)]
    pub bootstrap: Option<PathBuf>,

    /// Components/workloads passed to vswhere as `-requires`.
    #[serde(default = "default_requires")]
    pub requires: Vec<String>,
}

/// Environment harvesting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Marker line printed between the bootstrap output and the env dump.
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

/// Launcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Real compiler the launcher forwards to (and that builds it).
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Generated source file name.
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Launcher executable name.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Directory both outputs are written to.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

fn default_requires() -> Vec<String> {
    vec![
        "Microsoft.VisualStudio.Component.VC.Tools.x86.x64".to_string(),
        "Microsoft.VisualStudio.Workload.WDExpress".to_string(),
    ]
}

fn default_sentinel() -> String {
    "---SPLIT---".to_string()
}

fn default_compiler() -> String {
    "cl".to_string()
}

fn default_source() -> PathBuf {
    PathBuf::from("cwrapper.cpp")
}

fn default_output() -> PathBuf {
    PathBuf::from("cl-x64.exe")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for LocateConfig {
    fn default() -> Self {
        Self {
            bootstrap: None,
            requires: default_requires(),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            source: default_source(),
            output: default_output(),
            out_dir: default_out_dir(),
        }
    }
}

impl ShimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShimConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, else `vcshim.toml` from the working directory
    /// if it exists, else defaults.
    pub fn discover(path: Option<&Path>) -> crate::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    log::info!("Using config {}", default.display());
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Full path of the generated source file.
    pub fn source_path(&self) -> PathBuf {
        self.launcher.out_dir.join(&self.launcher.source)
    }

    /// Full path of the launcher executable.
    pub fn output_path(&self) -> PathBuf {
        self.launcher.out_dir.join(&self.launcher.output)
    }
}
