use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{ExecuteOptions, ExecutionOracle, OracleFailure};

/// Reads the script from stdin and runs it in a new V8 context.
const HARNESS: &str = r#"
const vm = require('vm')
let source = ''
process.stdin.setEncoding('utf8')
process.stdin.on('data', (chunk) => { source += chunk })
process.stdin.on('end', () => {
  try {
    vm.runInNewContext(source, undefined, {
      filename: process.argv[1],
      displayErrors: process.argv[2] === 'true',
    })
  } catch (err) {
    let message
    try { message = String((err && err.stack) || err) } catch (_) { message = 'unprintable error' }
    process.stderr.write(message)
    process.exit(1)
  }
})
"#;

/// Oracle backed by a fresh `node` process per script.
///
/// One process per probe keeps every execution isolated. Probes that run
/// longer than the timeout are killed and count as failures.
#[derive(Debug, Clone)]
pub struct NodeOracle {
    node_path: PathBuf,
    timeout: Duration,
}

impl Default for NodeOracle {
    fn default() -> Self {
        Self::new("node")
    }
}

impl NodeOracle {
    pub fn new(node_path: impl Into<PathBuf>) -> Self {
        Self {
            node_path: node_path.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, script: &str, options: &ExecuteOptions) -> Result<(), OracleFailure> {
        let mut child = Command::new(&self.node_path)
            .arg("-e")
            .arg(HARNESS)
            .arg(&options.filename)
            .arg(options.display_errors.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!(node = %self.node_path.display(), "unable to start oracle: {}", e);
                OracleFailure::new(format!(
                    "unable to start {}: {}",
                    self.node_path.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .await
                .map_err(|e| OracleFailure::new(format!("unable to pass script to oracle: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OracleFailure::new(format!("oracle process failed: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            Err(OracleFailure::new(if message.is_empty() {
                format!("{} exited with {}", options.filename, output.status)
            } else {
                message.to_string()
            }))
        }
    }
}

#[async_trait]
impl ExecutionOracle for NodeOracle {
    async fn execute(&self, script: &str, options: &ExecuteOptions) -> Result<(), OracleFailure> {
        match tokio::time::timeout(self.timeout, self.run(script, options)).await {
            Ok(verdict) => verdict,
            Err(_) => Err(OracleFailure::new(format!(
                "{} did not finish within {}ms",
                options.filename,
                self.timeout.as_millis()
            ))),
        }
    }
}
