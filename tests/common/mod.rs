//! Shared test infrastructure for integration tests.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Isolated working directory for one harness invocation.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn create() -> Self {
        Workspace {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, text).expect("write file");
        path
    }

    pub fn write_json(&self, rel: &str, value: &serde_json::Value) -> PathBuf {
        self.write(
            rel,
            &serde_json::to_string_pretty(value).expect("serialize fixture"),
        )
    }

    /// Generator command running `body` under `sh`.
    #[allow(dead_code)]
    pub fn generator(&self, body: &str) -> String {
        let script = self.write("generator.sh", &format!("set -e\n{body}\n"));
        format!("sh {}", shell_words::quote(&script.display().to_string()))
    }

    /// Run the binary with config lookup confined to the workspace.
    pub fn genassert<I, S>(&self, args: I) -> Output
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let config_home = self.path().join(".config");
        Command::new(env!("CARGO_BIN_EXE_genassert"))
            .args(args)
            .current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", &config_home)
            .env_remove("GENASSERT_LOG")
            .output()
            .expect("run genassert")
    }
}

pub fn shipped_fixture(name: &str) -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()))
        .join("fixtures")
        .join(name)
}

pub fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
