use crate::error::{Result, ToolError};
use crate::registry::{builtin_registry, ToolRegistry};
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;

/// Exit status shells use for "command not found".
#[cfg(unix)]
const SHELL_NOT_FOUND: i32 = 127;
#[cfg(windows)]
const SHELL_NOT_FOUND: i32 = 9009;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalConfig {
    pub timeout: Duration,
    /// Cap on captured stdout + stderr.
    pub max_output_bytes: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_output_bytes: 1024 * 1024,
        }
    }
}

/// Runs tools as local child processes through the system shell.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    registry: Arc<ToolRegistry>,
    config: LocalConfig,
}

impl ProcessExecutor {
    pub fn new(registry: Arc<ToolRegistry>, config: LocalConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> LocalConfig {
        self.config
    }

    /// Run `tool` in `cwd` and return its parsed intermediate JSON.
    ///
    /// A non-zero exit code with output is a normal outcome for linters and
    /// test runners and is parsed like a success.
    pub async fn run_local(&self, tool: &str, args: &Value, cwd: &Path) -> Result<Value> {
        let command_line = self
            .registry
            .local_command(tool, args)
            .ok_or_else(|| ToolError::Unsupported(tool.to_string()))?;
        if !cwd.is_dir() {
            return Err(ToolError::InvalidWorkingDirectory(cwd.to_path_buf()));
        }

        log::debug!("Running {tool} locally: {command_line}");
        let mut command = shell_command(&command_line);
        command
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound(tool.to_string()),
            _ => ToolError::Io(err),
        })?;

        let limit = self.config.max_output_bytes;
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let collect = async {
            let (stdout, stderr) = tokio::try_join!(
                read_capped(stdout_pipe, tool, limit),
                read_capped(stderr_pipe, tool, limit),
            )?;
            let status = child.wait().await?;
            Ok::<_, ToolError>((status, stdout, stderr))
        };
        let outcome = timeout(self.config.timeout, collect).await;
        let (status, stdout, stderr) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(err)) => {
                let _ = child.kill().await;
                return Err(err);
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(ToolError::Timeout {
                    tool: tool.to_string(),
                    timeout_ms: self.config.timeout.as_millis() as u64,
                });
            }
        };
        if stdout.len() + stderr.len() > limit {
            return Err(output_too_large(tool, limit));
        }
        if status.code() == Some(SHELL_NOT_FOUND) {
            return Err(ToolError::NotFound(tool.to_string()));
        }

        let stdout = String::from_utf8_lossy(&stdout);
        let stderr = String::from_utf8_lossy(&stderr);
        if !status.success() && stdout.trim().is_empty() && stderr.trim().is_empty() {
            return Err(ToolError::Failed {
                tool: tool.to_string(),
                status: status.to_string(),
            });
        }
        if !status.success() {
            log::debug!("{tool} exited with {status}");
        }

        Ok(self.registry.parse_output(tool, &stdout, &stderr))
    }
}

/// Read `pipe` to EOF, failing as soon as more than `limit` bytes arrive.
async fn read_capped<R>(pipe: Option<R>, tool: &str, limit: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(pipe) = pipe {
        pipe.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    }
    if buf.len() > limit {
        return Err(output_too_large(tool, limit));
    }
    Ok(buf)
}

fn output_too_large(tool: &str, limit: usize) -> ToolError {
    ToolError::OutputTooLarge {
        tool: tool.to_string(),
        limit,
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(Arc::new(ToolRegistry::builtin()), LocalConfig::default())
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}

/// Local command line for `tool` from the built-in table.
pub fn builtin_local_command(tool: &str, args: &Value) -> Option<String> {
    builtin_registry().local_command(tool, args)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::CommandAdapter;
    use serde_json::json;

    fn executor_with(id: &str, command: &str, config: LocalConfig) -> ProcessExecutor {
        let mut registry = ToolRegistry::builtin();
        registry.register([id], Arc::new(CommandAdapter::new(command)));
        ProcessExecutor::new(Arc::new(registry), config)
    }

    #[tokio::test]
    async fn runs_and_parses_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor_with(
            "echo-lint",
            r#"printf '{"issues":[{"file":"a.rs","line":3,"message":"m","severity":"error"}]}'"#,
            LocalConfig::default(),
        );
        let raw = exec.run_local("echo-lint", &json!({}), dir.path()).await.unwrap();
        let issues = exec.registry().normalize("echo-lint", &raw);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "a.rs");
        assert_eq!(issues[0].line, 3);
    }

    #[tokio::test]
    async fn nonzero_exit_with_output_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor_with(
            "failing-lint",
            r#"printf '{"issues":[{"file":"b.rs"}]}'; exit 1"#,
            LocalConfig::default(),
        );
        let raw = exec.run_local("failing-lint", &json!({}), dir.path()).await.unwrap();
        assert_eq!(exec.registry().normalize("failing-lint", &raw).len(), 1);
    }

    #[tokio::test]
    async fn nonzero_exit_without_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor_with("silent", "exit 3", LocalConfig::default());
        let err = exec.run_local("silent", &json!({}), dir.path()).await.unwrap_err();
        assert!(matches!(err, ToolError::Failed { .. }), "{err}");
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor_with(
            "ghost",
            "codeguard-definitely-missing-binary --json",
            LocalConfig::default(),
        );
        let err = exec.run_local("ghost", &json!({}), dir.path()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Tool 'ghost' not found. Please install it first.");
    }

    #[tokio::test]
    async fn slow_tools_time_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalConfig {
            timeout: Duration::from_millis(100),
            ..LocalConfig::default()
        };
        let exec = executor_with("sleeper", "sleep 5", config);
        let err = exec.run_local("sleeper", &json!({}), dir.path()).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { timeout_ms: 100, .. }));
    }

    #[tokio::test]
    async fn oversized_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalConfig {
            max_output_bytes: 1024,
            ..LocalConfig::default()
        };
        let exec = executor_with("chatty", "head -c 4096 /dev/zero", config);
        let err = exec.run_local("chatty", &json!({}), dir.path()).await.unwrap_err();
        assert!(matches!(err, ToolError::OutputTooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn endless_output_stops_at_the_cap_not_the_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalConfig {
            timeout: Duration::from_secs(10),
            max_output_bytes: 1024,
        };
        let exec = executor_with("spew", "yes", config);
        let started = std::time::Instant::now();
        let err = exec.run_local("spew", &json!({}), dir.path()).await.unwrap_err();
        assert!(matches!(err, ToolError::OutputTooLarge { limit: 1024, .. }), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn stdout_and_stderr_share_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let config = LocalConfig {
            max_output_bytes: 1024,
            ..LocalConfig::default()
        };
        let exec = executor_with(
            "split",
            "head -c 700 /dev/zero; head -c 700 /dev/zero >&2",
            config,
        );
        let err = exec.run_local("split", &json!({}), dir.path()).await.unwrap_err();
        assert!(matches!(err, ToolError::OutputTooLarge { limit: 1024, .. }));
    }

    #[tokio::test]
    async fn unknown_tool_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProcessExecutor::default()
            .run_local("pylint", &json!({}), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Unsupported(ref t) if t == "pylint"));
    }

    #[tokio::test]
    async fn missing_working_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let err = ProcessExecutor::default()
            .run_local("eslint", &json!({}), &gone)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidWorkingDirectory(_)));
    }

    #[test]
    fn builtin_table_covers_known_tools() {
        for tool in ["eslint", "biome", "prettier", "tsc", "jest", "npm-audit", "madge"] {
            assert!(builtin_local_command(tool, &json!({})).is_some(), "{tool}");
        }
        assert!(builtin_local_command("unknown", &json!({})).is_none());
    }
}
