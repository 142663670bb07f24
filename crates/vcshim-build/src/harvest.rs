//! Environment harvesting.
//!
//! The bootstrap script only mutates the environment of the shell that runs
//! it, so it is wrapped in a small driver script that runs it, prints a
//! sentinel line and then dumps the environment. Everything after the
//! sentinel is parsed back into `NAME=value` pairs.

use crate::{BuildError, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// One harvested environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Interpreter used to run the driver script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlavor {
    /// `cmd.exe` batch file.
    Batch,
    /// POSIX `sh` script.
    Posix,
}

impl ScriptFlavor {
    /// The flavor native to the host.
    pub fn host() -> Self {
        if cfg!(windows) {
            ScriptFlavor::Batch
        } else {
            ScriptFlavor::Posix
        }
    }

    /// File extension the interpreter expects.
    pub fn extension(self) -> &'static str {
        match self {
            ScriptFlavor::Batch => ".bat",
            ScriptFlavor::Posix => ".sh",
        }
    }

    fn command(self, script: &Path) -> Command {
        match self {
            // /U makes internal commands such as SET write UTF-16LE to the pipe
            // instead of the OEM code page.
            ScriptFlavor::Batch => {
                let mut cmd = Command::new("cmd");
                cmd.args(["/U", "/D", "/C"]).arg(script);
                cmd
            }
            ScriptFlavor::Posix => {
                let mut cmd = Command::new("sh");
                cmd.arg(script);
                cmd
            }
        }
    }

    /// Decode captured stdout produced by this flavor's interpreter.
    pub fn decode_output(self, bytes: &[u8]) -> String {
        match self {
            ScriptFlavor::Batch => decode_utf16le(bytes),
            ScriptFlavor::Posix => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Text of the driver script for `bootstrap`.
pub fn driver_script(flavor: ScriptFlavor, bootstrap: &Path, sentinel: &str) -> String {
    match flavor {
        ScriptFlavor::Batch => format!(
            "@ECHO OFF\r\n\r\ncall \"{}\"\r\n\r\nECHO {}\r\nSET\r\n",
            bootstrap.display(),
            sentinel
        ),
        ScriptFlavor::Posix => format!(
            ". {}\n\necho {}\nenv\n",
            sh_quote(&bootstrap.display().to_string()),
            sh_quote(sentinel)
        ),
    }
}

fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Write `text` to a temporary script, run it and return its stdout.
///
/// The script is closed before it is executed and removed afterwards,
/// whether or not the run succeeded.
pub fn run_driver(flavor: ScriptFlavor, text: &str) -> Result<String> {
    run_driver_in(&std::env::temp_dir(), flavor, text)
}

fn run_driver_in(dir: &Path, flavor: ScriptFlavor, text: &str) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("vcshim-")
        .suffix(flavor.extension())
        .tempfile_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    let script = file.into_temp_path();

    let mut cmd = flavor.command(&script);
    cmd.stdin(Stdio::null()).stderr(Stdio::inherit());

    log::debug!(
        "Running {:?} {:?}",
        cmd.get_program(),
        cmd.get_args().collect::<Vec<_>>()
    );

    let output = cmd.output().map_err(|source| BuildError::Spawn {
        program: script.display().to_string(),
        source,
    })?;

    script.close()?;

    if !output.status.success() {
        return Err(BuildError::HarvestFailed {
            status: output.status,
        });
    }

    Ok(flavor.decode_output(&output.stdout))
}

/// Extract the variables printed after the sentinel line.
pub fn parse_environment(output: &str, sentinel: &str) -> Vec<EnvVar> {
    let mut vars = Vec::new();
    let mut seen_sentinel = false;

    for line in output.lines() {
        if !seen_sentinel {
            seen_sentinel = line == sentinel;
            continue;
        }
        if line.is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((name, value)) => vars.push(EnvVar::new(name, value)),
            None => log::trace!("ignoring line without '=': {line}"),
        }
    }

    if !seen_sentinel {
        log::warn!("Sentinel {sentinel:?} not found in bootstrap output");
    }

    vars
}

/// Run `bootstrap` and capture the environment it leaves behind.
pub fn harvest_environment(
    flavor: ScriptFlavor,
    bootstrap: &Path,
    sentinel: &str,
) -> Result<Vec<EnvVar>> {
    log::info!("Harvesting environment from {}", bootstrap.display());
    let output = run_driver(flavor, &driver_script(flavor, bootstrap, sentinel))?;
    let vars = parse_environment(&output, sentinel);
    log::debug!("Harvested {} variables", vars.len());
    Ok(vars)
}
