//! Locate → Harvest → Generate → Compile.

use crate::compiler::LauncherCompiler;
use crate::config::ShimConfig;
use crate::harvest::{harvest_environment, EnvVar, ScriptFlavor};
use crate::launcher::{render_source, write_source};
use crate::locate::{locate_bootstrap_script, HostArch};
use crate::Result;
use std::path::{Path, PathBuf};

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// The vcvars script that was run.
    pub bootstrap: PathBuf,
    /// The harvested environment.
    pub vars: Vec<EnvVar>,
    /// The generated launcher source.
    pub source: PathBuf,
    /// The compiled launcher.
    pub executable: PathBuf,
}

/// Provisioning pipeline.
pub struct Pipeline {
    config: ShimConfig,
    flavor: ScriptFlavor,
    arch: HostArch,
}

impl Pipeline {
    /// Create a pipeline for the running host.
    pub fn new(config: ShimConfig) -> Self {
        Self {
            config,
            flavor: ScriptFlavor::host(),
            arch: HostArch::detect(),
        }
    }

    /// Override the driver script interpreter.
    pub fn with_flavor(mut self, flavor: ScriptFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Override the detected host architecture.
    pub fn with_arch(mut self, arch: HostArch) -> Self {
        self.arch = arch;
        self
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Find the bootstrap script.
    pub fn locate(&self) -> Result<PathBuf> {
        log::info!("Locating bootstrap script ({:?} host)", self.arch);
        locate_bootstrap_script(&self.config.locate, |key| std::env::var_os(key), self.arch)
    }

    /// Run `bootstrap` and capture its environment.
    pub fn harvest(&self, bootstrap: &Path) -> Result<Vec<EnvVar>> {
        harvest_environment(self.flavor, bootstrap, &self.config.harvest.sentinel)
    }

    /// Write the launcher source for `vars`; returns its path.
    pub fn generate(&self, vars: &[EnvVar]) -> Result<PathBuf> {
        let path = self.config.source_path();
        write_source(&path, &render_source(&self.config.launcher.compiler, vars))?;
        Ok(path)
    }

    /// Compile the generated source with `vars` applied.
    pub fn compile(&self, vars: &[EnvVar]) -> Result<PathBuf> {
        let launcher = &self.config.launcher;
        LauncherCompiler::new(&launcher.compiler).build(
            &launcher.out_dir,
            &launcher.source,
            &launcher.output,
            vars,
        )
    }

    /// Run every stage in order.
    pub fn run(&self) -> Result<Artifacts> {
        let bootstrap = self.locate()?;
        let vars = self.harvest(&bootstrap)?;
        let source = self.generate(&vars)?;
        let executable = self.compile(&vars)?;

        Ok(Artifacts {
            bootstrap,
            vars,
            source,
            executable,
        })
    }
}
