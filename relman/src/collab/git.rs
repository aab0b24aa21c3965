//! Git source-control collaborator

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::collab::{run_tool, GitSource, SourceControl};
use crate::errors::ManifestError;

const COLLABORATOR: &str = "source control";

/// Resolves branch heads with `git ls-remote`, so no local clone is needed
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
    timeout: Duration,
}

impl GitCli {
    pub fn new(binary: &str, timeout: Duration) -> Self {
        Self {
            binary: binary.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn head_commit(&self, source: &GitSource) -> Result<String, ManifestError> {
        if source.repository.trim().is_empty() {
            return Err(ManifestError::collaborator(COLLABORATOR, "no repository configured"));
        }

        let refname = format!("refs/heads/{}", source.branch);
        debug!("Resolving {} of {}", refname, source.repository);

        let args = vec![
            "ls-remote".to_string(),
            source.repository.clone(),
            refname.clone(),
        ];
        let stdout = run_tool(COLLABORATOR, &self.binary, &args, self.timeout).await?;

        let commit = parse_ls_remote(&stdout, &refname).ok_or_else(|| {
            ManifestError::collaborator(
                COLLABORATOR,
                format!("branch '{}' not found in {}", source.branch, source.repository),
            )
        })?;

        info!("{} {} is at {}", source.repository, source.branch, commit);
        Ok(commit)
    }
}

/// Pick the SHA for `refname` out of `git ls-remote` output
pub fn parse_ls_remote(output: &str, refname: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let sha = fields.next()?;
        (fields.next()? == refname).then(|| sha.to_string())
    })
}
