//! Launcher source generation.
//!
//! The launcher is a tiny Win32 program: it sets every harvested variable in
//! its own process, then runs the real compiler with the rest of its command
//! line and exits with the compiler's exit code.

use crate::harvest::EnvVar;
use crate::Result;
use std::fmt::Write;
use std::path::Path;

/// Text emitted before the environment statements.
pub const LAUNCHER_PREFIX: &str = r#"#include <windows.h>
#include <string>

int main() {
"#;

/// Text emitted after the environment statements.
///
/// The first space in the command line is taken as the end of the launcher's
/// own path, so the launcher must live in a directory without spaces.
pub const LAUNCHER_SUFFIX: &str = r#"
    const std::wstring cmdline = GetCommandLineW();
    const auto space_loc = cmdline.find(L' ');
    std::wstring invocation{compiler};
    if (space_loc != std::wstring::npos) {
        invocation += cmdline.substr(space_loc);
    }

    STARTUPINFOW si;
    PROCESS_INFORMATION pi;
    DWORD exit_code = 1;

    ZeroMemory(&si, sizeof(si));
    si.cb = sizeof(si);
    ZeroMemory(&pi, sizeof(pi));
    if (!CreateProcessW(nullptr, &invocation[0], nullptr, nullptr, TRUE, 0, nullptr, nullptr, &si, &pi)) {
        return 1;
    }
    WaitForSingleObject(pi.hProcess, INFINITE);
    GetExitCodeProcess(pi.hProcess, &exit_code);
    CloseHandle(pi.hProcess);
    CloseHandle(pi.hThread);
    return (int)exit_code;
}
"#;

/// Escape `s` for use inside a C++ `L"..."` literal.
///
/// Every escape is fixed width, so no escape can swallow the character
/// that follows it.
pub fn escape_wide_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            // Avoids trigraphs such as `??/`.
            '?' => out.push_str("\\?"),
            c if (c as u32) < 0x20 || ('\u{7f}'..'\u{a0}').contains(&c) => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            c if c.is_ascii() => out.push(c),
            c if (c as u32) <= 0xFFFF => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => {
                let _ = write!(out, "\\U{:08X}", c as u32);
            }
        }
    }
    out
}

/// The statement that sets `var` in the launcher process.
pub fn set_statement(var: &EnvVar) -> String {
    format!(
        "    SetEnvironmentVariableW(L\"{}\", L\"{}\");\n",
        escape_wide_literal(&var.name),
        escape_wide_literal(&var.value)
    )
}

/// The compiler as the first token of a Windows command line.
fn command_token(compiler: &str) -> String {
    if compiler.contains([' ', '\t']) && !compiler.starts_with('"') {
        format!("\"{compiler}\"")
    } else {
        compiler.to_string()
    }
}

/// Render the complete launcher source for `compiler` and `vars`.
pub fn render_source(compiler: &str, vars: &[EnvVar]) -> String {
    let mut src = String::from(LAUNCHER_PREFIX);
    let _ = writeln!(
        src,
        "    const wchar_t *compiler = L\"{}\";",
        escape_wide_literal(&command_token(compiler))
    );
    for var in vars {
        src.push_str(&set_statement(var));
    }
    src.push_str(LAUNCHER_SUFFIX);
    src
}

/// Write the launcher source to `path`, replacing any previous file.
pub fn write_source(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    log::info!("Wrote launcher source {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert_eq!(escape_wide_literal("C:\\VS\\bin;C:\\x"), "C:\\\\VS\\\\bin;C:\\\\x");
        assert_eq!(escape_wide_literal("INCLUDE"), "INCLUDE");
    }

    #[test]
    fn test_escape_hostile() {
        assert_eq!(escape_wide_literal(r#"a")b"#), r#"a\")b"#);
        assert_eq!(escape_wide_literal("x??/y"), "x\\?\\?/y");
        assert_eq!(escape_wide_literal("tab\there\n"), "tab\\011here\\012");
        // Octal escapes are three digits even when a digit follows.
        assert_eq!(escape_wide_literal("\u{1}7"), "\\0017");
        assert_eq!(escape_wide_literal("\u{85}"), "\\205");
    }

    #[test]
    fn test_escape_unicode() {
        assert_eq!(escape_wide_literal("Ärger"), "\\u00C4rger");
        assert_eq!(escape_wide_literal("😀"), "\\U0001F600");
    }

    #[test]
    fn test_set_statement() {
        let stmt = set_statement(&EnvVar::new("LIB", "C:\\VS\\lib"));
        assert_eq!(
            stmt,
            "    SetEnvironmentVariableW(L\"LIB\", L\"C:\\\\VS\\\\lib\");\n"
        );
    }

    #[test]
    fn test_render_source() {
        let vars = vec![
            EnvVar::new("INCLUDE", "C:\\inc"),
            EnvVar::new("LIB", "C:\\lib"),
            EnvVar::new("Path", "C:\\bin"),
        ];
        let src = render_source("cl", &vars);

        assert!(src.starts_with(LAUNCHER_PREFIX));
        assert!(src.ends_with(LAUNCHER_SUFFIX));
        assert_eq!(src.matches(LAUNCHER_PREFIX).count(), 1);
        assert_eq!(src.matches(LAUNCHER_SUFFIX).count(), 1);
        assert_eq!(src.matches("SetEnvironmentVariableW(").count(), vars.len());
        assert!(src.contains("const wchar_t *compiler = L\"cl\";"));

        let include = src.find("L\"INCLUDE\"").unwrap();
        let lib = src.find("L\"LIB\"").unwrap();
        let path = src.find("L\"Path\"").unwrap();
        assert!(include < lib && lib < path);
    }

    #[test]
    fn test_render_source_quotes_compiler_with_spaces() {
        let src = render_source("C:/Program Files/VS/bin/cl.exe", &[]);
        assert!(src.contains(
            "const wchar_t *compiler = L\"\\\"C:/Program Files/VS/bin/cl.exe\\\"\";"
        ));

        let src = render_source("\"C:/Program Files/cl.exe\"", &[]);
        assert!(src.contains("L\"\\\"C:/Program Files/cl.exe\\\"\";"));
    }

    #[test]
    fn test_render_source_keeps_drive_cwd_entries() {
        // cmd's `=C:=C:\work` entries harvest as an empty name; they stay 1:1.
        let vars = vec![EnvVar::new("", "C:=C:\\work"), EnvVar::new("FOO", "bar")];
        let src = render_source("cl", &vars);
        assert_eq!(src.matches("SetEnvironmentVariableW(").count(), 2);
        assert!(src.contains("SetEnvironmentVariableW(L\"\", L\"C:=C:\\\\work\");"));
    }

    #[test]
    fn test_render_source_without_vars() {
        let src = render_source("cl", &[]);
        assert_eq!(src.matches("SetEnvironmentVariableW(").count(), 0);
        assert!(src.contains("CreateProcessW"));
    }

    #[test]
    fn test_write_source_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("cwrapper.cpp");

        write_source(&path, "old contents that are longer").unwrap();
        write_source(&path, "new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }
}
