//! Boundary to the external code generator.
//!
//! The harness treats the generator as a synchronous black box: a module
//! configuration goes in, a file tree (relative path -> text) or an error comes
//! out. `CommandGenerator` adapts a generator executable to that contract.
use crate::scenarios::{ModuleConfig, ScenarioDefinition};
use crate::util::{collect_files_recursive, relative_key, truncate_string};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub const OUTPUT_DIR_ENV: &str = "GENASSERT_OUTPUT_DIR";
pub const MODULE_ID_ENV: &str = "GENASSERT_MODULE_ID";
pub const GENERATOR_TYPE_ENV: &str = "GENASSERT_GENERATOR_TYPE";
const MAX_STDERR_BYTES: usize = 8 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Generated files keyed by `/`-separated relative path.
pub type FileTree = BTreeMap<String, String>;

/// Generator output for one scenario; dropped once assertions have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub scenario_name: String,
    pub file_tree: FileTree,
}

/// Why a generator invocation produced no file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationError {
    Spawn { message: String },
    Exited { code: Option<i32>, stderr: String },
    TimedOut { timeout_ms: u64 },
    Output { message: String },
    /// Raised by in-process generators that refuse a configuration.
    #[cfg_attr(not(test), allow(dead_code))]
    Rejected { message: String },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Spawn { message } => write!(f, "generator failed to start: {message}"),
            GenerationError::Exited { code, stderr } => {
                match code {
                    Some(code) => write!(f, "generator exited with status {code}")?,
                    None => write!(f, "generator terminated by signal")?,
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            GenerationError::TimedOut { timeout_ms } => {
                write!(f, "generator timed out after {timeout_ms} ms")
            }
            GenerationError::Output { message } => {
                write!(f, "generator output unreadable: {message}")
            }
            GenerationError::Rejected { message } => {
                write!(f, "generator rejected config: {message}")
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// Code generator seam. Implementations must be shareable across the worker
/// threads of one level.
pub trait Generator: Send + Sync {
    fn generate(&self, config: &ModuleConfig) -> Result<FileTree, GenerationError>;
}

impl<F> Generator for F
where
    F: Fn(&ModuleConfig) -> Result<FileTree, GenerationError> + Send + Sync,
{
    fn generate(&self, config: &ModuleConfig) -> Result<FileTree, GenerationError> {
        self(config)
    }
}

/// Invoke the generator for one scenario.
pub fn invoke(
    generator: &dyn Generator,
    scenario: &ScenarioDefinition,
) -> Result<GenerationResult, GenerationError> {
    let started = Instant::now();
    let result = generator.generate(&scenario.module_config);
    let elapsed_ms = started.elapsed().as_millis();
    match &result {
        Ok(tree) => tracing::debug!(
            scenario = %scenario.name,
            files = tree.len(),
            elapsed_ms,
            "generator invoke complete"
        ),
        Err(err) => tracing::debug!(
            scenario = %scenario.name,
            elapsed_ms,
            error = %err,
            "generator invoke failed"
        ),
    }
    result.map(|file_tree| GenerationResult {
        scenario_name: scenario.name.clone(),
        file_tree,
    })
}

/// Runs a generator executable once per module configuration.
///
/// The config is written as JSON to the child's stdin and the child writes
/// its output below `$GENASSERT_OUTPUT_DIR`, a fresh temporary directory that
/// is collected into the file tree and removed afterwards.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandGenerator {
    /// Parse a shell-style command line and resolve its program on `PATH`.
    pub fn from_command_line(command: &str, timeout: Option<Duration>) -> Result<Self> {
        let words = shell_words::split(command)
            .with_context(|| format!("parse generator command: {command}"))?;
        let Some((program, args)) = words.split_first() else {
            return Err(anyhow!("generator command is empty"));
        };
        let program = which::which(program)
            .with_context(|| format!("resolve generator program {program}"))?;
        Ok(CommandGenerator {
            program,
            args: args.to_vec(),
            timeout,
        })
    }

    fn run(&self, config: &ModuleConfig) -> Result<FileTree, GenerationError> {
        let output_dir = tempfile::Builder::new()
            .prefix("genassert-out-")
            .tempdir()
            .map_err(|err| GenerationError::Output {
                message: format!("create output dir: {err}"),
            })?;
        let input = serde_json::to_vec(config).map_err(|err| GenerationError::Output {
            message: format!("serialize module config: {err}"),
        })?;
        let mut stderr_file = tempfile::tempfile().map_err(|err| GenerationError::Output {
            message: format!("create stderr capture: {err}"),
        })?;
        let stderr_handle = stderr_file
            .try_clone()
            .map_err(|err| GenerationError::Output {
                message: format!("clone stderr capture: {err}"),
            })?;

        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(OUTPUT_DIR_ENV, output_dir.path())
            .env(MODULE_ID_ENV, &config.module_id)
            .env(GENERATOR_TYPE_ENV, &config.generator_type)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_handle))
            .spawn()
            .map_err(|err| GenerationError::Spawn {
                message: format!("{}: {err}", self.program.display()),
            })?;

        // Written off-thread so a full pipe cannot stall the timeout loop.
        // Descendants of a killed child may hold the pipe open; the writer is
        // never joined unless it has already finished.
        let writer = child.stdin.take().map(|mut stdin| {
            std::thread::spawn(move || match stdin.write_all(&input) {
                // A generator that ignores its input may exit before reading it.
                Err(err) if err.kind() != ErrorKind::BrokenPipe => Err(err),
                _ => Ok(()),
            })
        });

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GenerationError::Spawn {
                        message: format!("check generator status: {err}"),
                    });
                }
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GenerationError::TimedOut {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let mut stderr = String::new();
            let _ = stderr_file.seek(SeekFrom::Start(0));
            let mut bytes = Vec::new();
            if stderr_file.read_to_end(&mut bytes).is_ok() {
                stderr = truncate_string(&String::from_utf8_lossy(&bytes), MAX_STDERR_BYTES);
            }
            return Err(GenerationError::Exited {
                code: status.code(),
                stderr,
            });
        }

        if let Some(writer) = writer {
            if writer.is_finished() {
                writer
                    .join()
                    .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")))
                    .map_err(|err| GenerationError::Spawn {
                        message: format!("write module config to stdin: {err}"),
                    })?;
            } else {
                tracing::debug!("generator exited before reading its config");
            }
        }

        collect_file_tree(output_dir.path()).map_err(|err| GenerationError::Output {
            message: format!("{err:#}"),
        })
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, config: &ModuleConfig) -> Result<FileTree, GenerationError> {
        self.run(config)
    }
}

fn collect_file_tree(root: &std::path::Path) -> Result<FileTree> {
    let mut tree = FileTree::new();
    for file in collect_files_recursive(root)? {
        let key = relative_key(root, &file)?;
        let bytes = fs::read(&file).with_context(|| format!("read {}", file.display()))?;
        tree.insert(key, String::from_utf8_lossy(&bytes).into_owned());
    }
    Ok(tree)
}
