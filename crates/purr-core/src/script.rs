//! Installer script interpreter selection.
//!
//! Scripts are dispatched by file extension. Extensionless scripts are
//! inspected for a `#!` line; failing that they are made executable and run
//! directly (Unix only).
//!
//! | ext | program | args |
//! |---|---|---|
//! | `.sh` | `bash` | `<script>` |
//! | `.ps1` | `pwsh` | `-ExecutionPolicy Bypass -File <script>` |
//! | `.py` | `python` | `<script>` |
//! | `.js` | `node` | `<script>` |
//! | `.rb` | `ruby` | `<script>` |
//! | `.cmd` / `.bat` | `cmd` (Windows) | `/c <script>` |
//! | `.exe` | `<script>` (Windows) | |

use std::ffi::OsString;
use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("unsupported script type '{extension}' for {}", path.display())]
    Unsupported { path: PathBuf, extension: String },
}

/// Host family, which decides the Windows-only rows and the extensionless fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }
}

/// A program plus arguments, ready to hand to a process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    fn new(program: impl Into<OsString>, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn interpreter(program: &str, script: &Path) -> Self {
        Self::new(program, [script.as_os_str()])
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Resolve the interpreter for `script` on the current platform.
pub fn resolve(script: &Path) -> Result<Invocation, ScriptError> {
    resolve_for(script, Platform::current())
}

pub fn resolve_for(script: &Path, platform: Platform) -> Result<Invocation, ScriptError> {
    let extension = script
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let windows = platform == Platform::Windows;

    let invocation = match extension.as_str() {
        "sh" => Invocation::interpreter("bash", script),
        "ps1" => Invocation::new(
            "pwsh",
            [
                OsString::from("-ExecutionPolicy"),
                OsString::from("Bypass"),
                OsString::from("-File"),
                script.as_os_str().to_os_string(),
            ],
        ),
        "py" => Invocation::interpreter("python", script),
        "js" => Invocation::interpreter("node", script),
        "rb" => Invocation::interpreter("ruby", script),
        "cmd" | "bat" if windows => Invocation::new(
            "cmd",
            [OsString::from("/c"), script.as_os_str().to_os_string()],
        ),
        "exe" if windows => Invocation::new(script.as_os_str(), Vec::<OsString>::new()),
        "" => return resolve_extensionless(script, platform),
        _ => return Err(unsupported(script, &extension)),
    };
    Ok(invocation)
}

fn resolve_extensionless(script: &Path, platform: Platform) -> Result<Invocation, ScriptError> {
    if let Some(shebang) = read_shebang(script) {
        if let Some(invocation) = from_shebang(&shebang, script) {
            return Ok(invocation);
        }
    }

    if platform == Platform::Windows {
        return Err(unsupported(script, ""));
    }

    match make_executable(script) {
        Ok(()) => Ok(Invocation::new(script.as_os_str(), Vec::<OsString>::new())),
        Err(e) => {
            debug!(script = %script.display(), error = %e, "chmod failed, falling back to bash");
            Ok(Invocation::interpreter("bash", script))
        }
    }
}

/// The text after `#!` on the first line, if present.
fn read_shebang(script: &Path) -> Option<String> {
    let file = std::fs::File::open(script).ok()?;
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first).ok()?;
    first
        .strip_prefix("#!")
        .map(|rest| rest.trim().to_string())
        .filter(|rest| !rest.is_empty())
}

fn from_shebang(shebang: &str, script: &Path) -> Option<Invocation> {
    let mut parts = shebang.split_whitespace();
    let interpreter = parts.next()?;
    let mut extra: Vec<&str> = parts.collect();

    // `#!/usr/bin/env [-S] python3` names the interpreter in its first non-flag argument.
    let named = if file_name(interpreter) == "env" {
        let pos = extra.iter().position(|a| !a.starts_with('-'))?;
        extra[pos]
    } else {
        interpreter
    };

    let name = file_name(named);
    let known = if name == "sh" || name.starts_with("bash") {
        Some("bash")
    } else if name.starts_with("python") {
        Some("python")
    } else if name.starts_with("node") {
        Some("node")
    } else if name.starts_with("ruby") {
        Some("ruby")
    } else {
        None
    };
    if let Some(program) = known {
        return Some(Invocation::interpreter(program, script));
    }

    let path = Path::new(interpreter);
    if path.is_absolute() && path.exists() {
        let mut args: Vec<OsString> = extra.drain(..).map(OsString::from).collect();
        args.push(script.as_os_str().to_os_string());
        return Some(Invocation::new(interpreter, args));
    }
    None
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(unix)]
fn make_executable(script: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(script)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(script, perms)
}

#[cfg(not(unix))]
fn make_executable(_script: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "executable bit not supported on this platform",
    ))
}

fn unsupported(script: &Path, extension: &str) -> ScriptError {
    ScriptError::Unsupported {
        path: script.to_path_buf(),
        extension: if extension.is_empty() {
            "(none)".to_string()
        } else {
            format!(".{extension}")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(inv: &Invocation) -> Vec<String> {
        inv.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_extension_table() {
        let cases = [
            ("setup.sh", "bash"),
            ("setup.py", "python"),
            ("setup.js", "node"),
            ("setup.rb", "ruby"),
            ("SETUP.SH", "bash"),
        ];
        for (file, program) in cases {
            let inv = resolve_for(Path::new(file), Platform::Unix).unwrap();
            assert_eq!(inv.program, program, "{file}");
            assert_eq!(args(&inv), vec![file.to_string()]);
        }
    }

    #[test]
    fn test_powershell_bypasses_execution_policy() {
        let inv = resolve_for(Path::new("install.ps1"), Platform::Unix).unwrap();
        assert_eq!(inv.program, "pwsh");
        assert_eq!(
            args(&inv),
            vec!["-ExecutionPolicy", "Bypass", "-File", "install.ps1"]
        );
        assert_eq!(
            inv.to_string(),
            "pwsh -ExecutionPolicy Bypass -File install.ps1"
        );
    }

    #[test]
    fn test_windows_only_extensions() {
        let inv = resolve_for(Path::new("install.bat"), Platform::Windows).unwrap();
        assert_eq!(inv.program, "cmd");
        assert_eq!(args(&inv), vec!["/c", "install.bat"]);

        let inv = resolve_for(Path::new("setup.exe"), Platform::Windows).unwrap();
        assert_eq!(inv.program, "setup.exe");
        assert!(inv.args.is_empty());

        for file in ["install.cmd", "install.bat", "setup.exe"] {
            assert!(matches!(
                resolve_for(Path::new(file), Platform::Unix),
                Err(ScriptError::Unsupported { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let err = resolve_for(Path::new("install.lua"), Platform::Unix).unwrap_err();
        assert_eq!(err.to_string(), "unsupported script type '.lua' for install.lua");
    }

    #[test]
    fn test_shebang_env_python() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "install", "#!/usr/bin/env python3\nprint('hi')\n");

        let inv = resolve_for(&script, Platform::Unix).unwrap();
        assert_eq!(inv.program, "python");
        assert_eq!(inv.args, vec![script.as_os_str().to_os_string()]);
    }

    #[test]
    fn test_shebang_interpreters() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            ("#!/bin/sh", "bash"),
            ("#!/usr/bin/bash -e", "bash"),
            ("#!/usr/bin/env -S node --harmony", "node"),
            ("#!/usr/local/bin/ruby", "ruby"),
        ];
        for (line, program) in cases {
            let script = write_script(dir.path(), "install", &format!("{line}\n"));
            let inv = resolve_for(&script, Platform::Windows).unwrap();
            assert_eq!(inv.program, program, "{line}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_shebang_absolute_interpreter_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "install", "#!/bin/cat -n\nhello\n");
        if !Path::new("/bin/cat").exists() {
            return;
        }

        let inv = resolve_for(&script, Platform::Unix).unwrap();
        assert_eq!(inv.program, "/bin/cat");
        assert_eq!(inv.args.len(), 2);
        assert_eq!(inv.args[0], "-n");
    }

    #[cfg(unix)]
    #[test]
    fn test_no_shebang_made_executable_on_unix() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "install", "echo plain\n");

        let inv = resolve_for(&script, Platform::Unix).unwrap();
        assert_eq!(inv.program, script.as_os_str());
        assert!(inv.args.is_empty());

        let mode = std::fs::metadata(&script).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_no_shebang_unsupported_on_windows() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "install", "echo plain\n");
        assert!(matches!(
            resolve_for(&script, Platform::Windows),
            Err(ScriptError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_missing_extensionless_file_falls_back_to_bash() {
        let dir = tempfile::tempdir().unwrap();
        let inv = resolve_for(&dir.path().join("ghost"), Platform::Unix).unwrap();
        assert_eq!(inv.program, "bash");
    }
}
