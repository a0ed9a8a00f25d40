use std::{process::Stdio, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::{process::Command, time::timeout};
use tracing::debug;

use super::{MediaResolver, ResolvedMedia, error::ResolveError};

/// Executable looked up on `PATH` when none is configured.
pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Media resolution through the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: Arc<str>,
    limit: Duration,
}

impl YtDlpResolver {
    /// Resolver running `program`, killed after `limit`.
    pub fn new(program: impl Into<String>, limit: Duration) -> Self {
        Self {
            program: Arc::from(program.into()),
            limit,
        }
    }

    async fn run(&self, query: String) -> Result<ResolvedMedia, ResolveError> {
        let mut command = Command::new(self.program.as_ref());
        command
            .args([
                "--dump-single-json",
                "--no-playlist",
                "--format",
                "bestaudio/best",
                "--default-search",
                "auto",
                "--no-warnings",
                "--quiet",
                "--",
            ])
            .arg(&query)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(program = %self.program, %query, "resolving media");
        let output = match timeout(self.limit, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ResolveError::Spawn {
                    program: self.program.to_string(),
                    source,
                });
            }
            Err(_) => return Err(ResolveError::TimedOut),
        };

        if !output.status.success() {
            return Err(ResolveError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Search dumps can be large; keep the JSON walk off the async workers.
        tokio::task::spawn_blocking(move || parse_output(&query, &output.stdout))
            .await
            .unwrap_or(Err(ResolveError::MissingSource))
    }
}

impl MediaResolver for YtDlpResolver {
    fn resolve(&self, query: String) -> BoxFuture<'static, Result<ResolvedMedia, ResolveError>> {
        let resolver = self.clone();
        Box::pin(async move { resolver.run(query).await })
    }
}

#[derive(Debug, Deserialize)]
struct InfoDict {
    url: Option<String>,
    title: Option<String>,
    entries: Option<Vec<InfoDict>>,
}

/// Pick the playable entry out of a `--dump-single-json` document.
fn parse_output(query: &str, stdout: &[u8]) -> Result<ResolvedMedia, ResolveError> {
    let info: InfoDict = serde_json::from_slice(stdout).map_err(ResolveError::Parse)?;

    let entry = match info.entries {
        Some(entries) => entries
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NoResults(query.to_string()))?,
        None => info,
    };

    let source_uri = entry.url.ok_or(ResolveError::MissingSource)?;
    Ok(ResolvedMedia {
        source_uri,
        title: entry.title.unwrap_or_else(|| query.to_string()),
    })
}
