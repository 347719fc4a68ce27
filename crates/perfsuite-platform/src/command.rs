use anyhow::Context;
use async_trait::async_trait;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Seam over external tooling (`adb`, `xcrun`).
#[async_trait]
pub trait ToolCommand: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<CommandOutput>;
}

/// Spawns real processes. Children are killed if the future is dropped, so a
/// timed-out or cancelled runner does not leave `adb` behind.
pub struct SystemCommand;

#[async_trait]
impl ToolCommand for SystemCommand {
    async fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<CommandOutput> {
        tracing::debug!(
            event = "perfsuite.platform.exec",
            program = %program,
            args = ?args,
        );
        let out = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to spawn {}", program))?;

        Ok(CommandOutput {
            status: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

/// Runs a command and returns stdout, failing on a non-zero exit.
pub async fn run_checked(
    tool: &dyn ToolCommand,
    program: &str,
    args: &[&str],
) -> anyhow::Result<String> {
    let out = tool.run(program, args).await?;
    if !out.success() {
        anyhow::bail!(
            "`{} {}` exited with {:?}: {}",
            program,
            args.join(" "),
            out.status,
            out.stderr.trim()
        );
    }
    Ok(out.stdout)
}
