// src/exec/command.rs

//! External compilers invoked as shell commands.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::Manifest;
use crate::exec::request::{CompileRequest, CompileResult};
use crate::types::AssetType;

/// Stderr lines kept for the failure detail.
const STDERR_TAIL_LINES: usize = 20;

/// Boxed future returned by [`Compiler::compile`].
pub type CompileFuture = Pin<Box<dyn Future<Output = CompileResult> + Send + 'static>>;

/// Performs one compile step.
///
/// Implementations never fail the future itself; errors are reported as
/// [`CompileResult::Failed`].
pub trait Compiler: Send + Sync {
    fn compile(&self, request: CompileRequest) -> CompileFuture;
}

/// How one asset type is compiled.
#[derive(Debug, Clone)]
pub struct CompileCommand {
    pub cmd: String,
    /// A stdout line matching this marks the step as `Unchanged`.
    pub unchanged_on_stdout: Option<Regex>,
}

/// Runs the configured command of the request's asset type.
#[derive(Debug, Clone, Default)]
pub struct CommandCompiler {
    commands: HashMap<AssetType, CompileCommand>,
}

impl CommandCompiler {
    pub fn new(commands: HashMap<AssetType, CompileCommand>) -> Self {
        Self { commands }
    }

    /// Build from the `[compiler.<type>]` sections of a validated manifest.
    pub fn from_manifest(manifest: &Manifest) -> crate::errors::Result<Self> {
        let mut commands = HashMap::new();
        for (asset_type, cfg) in manifest.compilers() {
            let unchanged_on_stdout = match &cfg.unchanged_on_stdout {
                Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                    crate::errors::AssetflowError::ConfigError(format!(
                        "invalid unchanged_on_stdout regex for compiler '{asset_type}': {e}"
                    ))
                })?),
                None => None,
            };
            commands.insert(
                *asset_type,
                CompileCommand {
                    cmd: cfg.cmd.clone(),
                    unchanged_on_stdout,
                },
            );
        }
        Ok(Self { commands })
    }

    pub fn command_for(&self, asset_type: AssetType) -> Option<&CompileCommand> {
        self.commands.get(&asset_type)
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, request: CompileRequest) -> CompileFuture {
        let command = self.commands.get(&request.asset_type).cloned();
        Box::pin(async move {
            let Some(command) = command else {
                return CompileResult::Failed(format!(
                    "no compiler configured for asset type '{}'",
                    request.asset_type
                ));
            };
            run_compile(command, request).await
        })
    }
}

/// Run one compiler process; every error becomes a failed result.
async fn run_compile(command: CompileCommand, request: CompileRequest) -> CompileResult {
    match run_compile_inner(&command, &request).await {
        Ok(result) => result,
        Err(err) => {
            error!(
                unit = %request.unit,
                asset_type = %request.asset_type,
                error = %err,
                "compiler execution error"
            );
            CompileResult::Failed(format!("{err:#}"))
        }
    }
}

async fn run_compile_inner(command: &CompileCommand, request: &CompileRequest) -> Result<CompileResult> {
    info!(
        unit = %request.unit,
        asset_type = %request.asset_type,
        cmd = %command.cmd,
        "starting compiler process"
    );

    let dependency_paths = std::env::join_paths(&request.dependency_paths)
        .context("joining dependency paths")?;

    let mut cmd = shell_command(&command.cmd);
    cmd.current_dir(&request.root_dir)
        .env("ASSETFLOW_UNIT", &request.unit)
        .env("ASSETFLOW_ASSET_TYPE", request.asset_type.as_str())
        .env("ASSETFLOW_UNIT_DIR", &request.unit_dir)
        .env("ASSETFLOW_ASSETS_DIR", &request.assets_dir)
        .env("ASSETFLOW_DEPENDENCY_PATHS", dependency_paths)
        .env("ASSETFLOW_PRODUCTION", flag(request.production))
        .env("ASSETFLOW_VERBOSE", flag(request.verbose))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().with_context(|| {
        format!(
            "spawning {} compiler for unit '{}'",
            request.asset_type, request.unit
        )
    })?;

    // Always consume stderr so buffers don't fill; keep the tail for errors.
    let stderr_task = child.stderr.take().map(|stderr| {
        let unit = request.unit.clone();
        tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(unit = %unit, "stderr: {}", line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        })
    });

    let mut unchanged = false;
    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .context("reading compiler stdout")?
        {
            debug!(unit = %request.unit, "stdout: {}", line);
            if let Some(re) = &command.unchanged_on_stdout
                && re.is_match(&line)
            {
                unchanged = true;
            }
        }
    }

    let status = child.wait().await.with_context(|| {
        format!("waiting for compiler of unit '{}'", request.unit)
    })?;

    let stderr_tail: Vec<String> = match stderr_task {
        Some(handle) => handle.await.map(Vec::from).unwrap_or_default(),
        None => Vec::new(),
    };

    let code = status.code().unwrap_or(-1);
    info!(
        unit = %request.unit,
        asset_type = %request.asset_type,
        exit_code = code,
        success = status.success(),
        unchanged,
        "compiler process exited"
    );

    if status.success() {
        return Ok(if unchanged {
            CompileResult::Unchanged
        } else {
            CompileResult::Changed
        });
    }

    let mut detail = format!("compiler exited with code {code}");
    if !stderr_tail.is_empty() {
        detail.push_str(":\n");
        detail.push_str(&stderr_tail.join("\n"));
    }
    Ok(CompileResult::Failed(detail))
}

/// Build a shell command appropriate for the platform.
fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
