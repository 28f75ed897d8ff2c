use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use snapgen_graph::Metadata;
use tokio::process::Command;

use super::{BundleOutput, BundleRequest, Bundler, BundlerError};

const OUT_FILE: &str = "bundle.js";
const META_FILE: &str = "meta.json";

/// Runs the external snapshot bundler executable.
///
/// The bundler is invoked as
/// `<bundler> --outfile=<out> --basedir=<base> --metafile=<meta> [--deferred=./a,./b] <entry>`
/// and must write both files before exiting successfully.
///
/// Every call writes into a fresh scratch directory below the work dir and
/// removes it afterwards, so concurrent calls never read each other's output
/// and a bundler that exits without writing fails instead of reusing stale
/// files.
#[derive(Debug)]
pub struct ProcessBundler {
    bundler_path: PathBuf,
    work_dir: PathBuf,
}

impl ProcessBundler {
    pub fn new(bundler_path: impl Into<PathBuf>) -> Self {
        let work_dir =
            std::env::temp_dir().join(format!("snapgen-{}", uuid::Uuid::new_v4().simple()));
        Self::with_work_dir(bundler_path, work_dir)
    }

    /// Create per-call scratch directories below `work_dir`.
    pub fn with_work_dir(bundler_path: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundler_path: bundler_path.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn bundler_path(&self) -> &Path {
        &self.bundler_path
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn arguments(&self, request: &BundleRequest<'_>, scratch: &Path) -> Vec<OsString> {
        let mut args = Vec::with_capacity(5);
        args.push(flag("--outfile=", &scratch.join(OUT_FILE)));
        args.push(flag("--basedir=", request.base_dir));
        args.push(flag("--metafile=", &scratch.join(META_FILE)));
        if !request.deferred.is_empty() {
            args.push(OsString::from(format!(
                "--deferred={}",
                request.deferred_require_paths().join(",")
            )));
        }
        args.push(request.entry_file.as_os_str().to_owned());
        args
    }

    fn scratch_dir(&self) -> PathBuf {
        self.work_dir.join(uuid::Uuid::new_v4().simple().to_string())
    }

    async fn run(
        &self,
        request: &BundleRequest<'_>,
        scratch: &Path,
    ) -> Result<BundleOutput, BundlerError> {
        let args = self.arguments(request, scratch);
        let command = self.command_line(&args);

        tracing::debug!(%command, deferred = request.deferred.len(), "running snapshot bundler");
        let output = Command::new(&self.bundler_path)
            .args(&args)
            .current_dir(request.base_dir)
            .output()
            .await
            .map_err(|source| BundlerError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            tracing::error!("{}", stderr);
            tracing::debug!("{}", stdout);
            return Err(BundlerError::Failed {
                command,
                status: output.status.to_string(),
                stderr,
                stdout,
            });
        }

        let bundle_path = scratch.join(OUT_FILE);
        let bundle = read_output(bundle_path.clone()).await?;
        let metadata = read_output(scratch.join(META_FILE)).await?;

        Ok(BundleOutput {
            metadata: Metadata::from_slice(&metadata)?,
            bundle: String::from_utf8(bundle).map_err(|source| BundlerError::InvalidBundle {
                path: bundle_path,
                source,
            })?,
        })
    }

    fn command_line(&self, args: &[OsString]) -> String {
        std::iter::once(self.bundler_path.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn flag(name: &str, path: &Path) -> OsString {
    let mut flag = OsString::from(name);
    flag.push(path.as_os_str());
    flag
}

async fn read_output(path: PathBuf) -> Result<Vec<u8>, BundlerError> {
    tokio::fs::read(&path)
        .await
        .map_err(|source| BundlerError::Unreadable { path, source })
}

#[async_trait]
impl Bundler for ProcessBundler {
    async fn bundle(&self, request: &BundleRequest<'_>) -> Result<BundleOutput, BundlerError> {
        let scratch = self.scratch_dir();
        tokio::fs::create_dir_all(&scratch)
            .await
            .map_err(|source| BundlerError::Unreadable {
                path: scratch.clone(),
                source,
            })?;

        let result = self.run(request, &scratch).await;

        if let Err(err) = tokio::fs::remove_dir_all(&scratch).await {
            tracing::debug!(path = %scratch.display(), "unable to remove bundler scratch dir: {}", err);
        }
        result
    }
}

impl Drop for ProcessBundler {
    fn drop(&mut self) {
        // Best effort, the directory may never have been created.
        let _ = std::fs::remove_dir_all(&self.work_dir);
    }
}
