//! MSVC wrapper for building the launcher executable.

use crate::harvest::EnvVar;
use crate::{BuildError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Compiler used to build the launcher.
#[derive(Debug, Clone)]
pub struct LauncherCompiler {
    /// Program name or path (resolved through the harvested PATH).
    program: PathBuf,
    /// Optimization flag.
    opt_flag: String,
    /// Flags placed before the source file.
    extra_args: Vec<String>,
}

impl Default for LauncherCompiler {
    fn default() -> Self {
        Self::new("cl")
    }
}

impl LauncherCompiler {
    /// Create a compiler wrapper for `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            opt_flag: "/O2".to_string(),
            extra_args: vec!["/nologo".to_string(), "/EHsc".to_string()],
        }
    }

    /// Replace the optimization flag.
    pub fn opt_flag(mut self, flag: impl Into<String>) -> Self {
        self.opt_flag = flag.into();
        self
    }

    /// Add a flag placed before the source file.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// The program being invoked.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the command that compiles `source` into `output` inside `dir`.
    ///
    /// `source` and `output` are relative to `dir`, which becomes the working
    /// directory so intermediate objects land next to the outputs.
    pub fn command(&self, dir: &Path, source: &Path, output: &Path, env: &[EnvVar]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(dir);
        cmd.envs(env.iter().map(|var| (&var.name, &var.value)));

        cmd.args(&self.extra_args);
        cmd.arg(&self.opt_flag);
        cmd.arg(source);

        let mut fe = OsString::from("/Fe");
        fe.push(output);
        cmd.arg(fe);

        cmd
    }

    /// Compile the launcher and check that the executable was produced.
    pub fn build(
        &self,
        dir: &Path,
        source: &Path,
        output: &Path,
        env: &[EnvVar],
    ) -> Result<PathBuf> {
        let mut cmd = self.command(dir, source, output, env);

        log::debug!(
            "Running {:?} {:?} in {}",
            cmd.get_program(),
            cmd.get_args().collect::<Vec<_>>(),
            dir.display()
        );

        let result = cmd.output().map_err(|source| BuildError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        if !result.status.success() {
            return Err(BuildError::BuildFailure {
                status: result.status,
                stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }

        let exe = dir.join(output);
        if !exe.exists() {
            return Err(BuildError::MissingOutput { path: exe });
        }

        log::info!("Built launcher {}", exe.display());
        Ok(exe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_build_command() {
        let compiler = LauncherCompiler::default();
        let env = vec![EnvVar::new("INCLUDE", "C:\\inc"), EnvVar::new("Path", "C:\\bin")];
        let cmd = compiler.command(
            Path::new("out"),
            Path::new("cwrapper.cpp"),
            Path::new("cl-x64.exe"),
            &env,
        );

        assert_eq!(cmd.get_program(), "cl");
        assert_eq!(
            args(&cmd),
            vec!["/nologo", "/EHsc", "/O2", "cwrapper.cpp", "/Fecl-x64.exe"]
        );
        assert_eq!(cmd.get_current_dir(), Some(Path::new("out")));

        let envs: Vec<_> = cmd
            .get_envs()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.map(|v| v.to_string_lossy().into_owned())))
            .collect();
        assert!(envs.contains(&("INCLUDE".to_string(), Some("C:\\inc".to_string()))));
        assert!(envs.contains(&("Path".to_string(), Some("C:\\bin".to_string()))));
    }

    #[test]
    fn test_builder() {
        let compiler = LauncherCompiler::new("clang-cl").opt_flag("/Ox").arg("/MT");
        let cmd = compiler.command(
            Path::new("."),
            Path::new("a.cpp"),
            Path::new("a.exe"),
            &[],
        );

        assert_eq!(compiler.program(), Path::new("clang-cl"));
        assert_eq!(args(&cmd), vec!["/nologo", "/EHsc", "/MT", "/Ox", "a.cpp", "/Fea.exe"]);
    }

    #[test]
    fn test_build_missing_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = LauncherCompiler::new("vcshim-no-such-compiler");
        let err = compiler
            .build(dir.path(), Path::new("a.cpp"), Path::new("a.exe"), &[])
            .unwrap_err();

        assert!(matches!(err, BuildError::Spawn { .. }));
    }
}
