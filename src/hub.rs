//! Model hub REST client
//!
//! Thin reqwest client over the hub's repository API: create a repo,
//! upload a single file, or upload a whole staging directory as one
//! commit. LFS and chunked uploads are the hub SDK's business and are
//! deliberately not reimplemented here.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{AgentPackError, Result};

const TOKEN_ENV_VAR: &str = "HUB_TOKEN";

/// Validated `namespace/name` repository identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub namespace: String,
    pub name: String,
}

impl RepoId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let id = format!("{}/{}", namespace.into(), name.into());
        id.parse()
    }
}

impl FromStr for RepoId {
    type Err = AgentPackError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        let (namespace, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(name), None) => (namespace, name),
            _ => {
                return Err(AgentPackError::InvalidRepoId(format!(
                    "expected exactly one '/' in '{}'",
                    s
                )))
            }
        };

        if namespace.is_empty() || name.is_empty() {
            return Err(AgentPackError::InvalidRepoId(format!(
                "empty namespace or name in '{}'",
                s
            )));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(AgentPackError::InvalidRepoId(format!(
                "whitespace in '{}'",
                s
            )));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Clone)]
pub struct HubClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let http = Client::builder()
            .user_agent(concat!("agentpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentPackError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let token = token.or_else(|| std::env::var(TOKEN_ENV_VAR).ok());

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Public URL of a repository on this hub
    pub fn repo_url(&self, repo_id: &RepoId) -> String {
        format!("{}/{}", self.base_url, repo_id)
    }

    fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            AgentPackError::Auth(format!(
                "no hub token configured ({} or config [hub].token)",
                TOKEN_ENV_VAR
            ))
        })
    }

    /// Create a model repository, returning its URL
    ///
    /// With `exist_ok`, an already-existing repo is treated as success.
    pub async fn create_repo(
        &self,
        repo_id: &RepoId,
        private: bool,
        exist_ok: bool,
    ) -> Result<String> {
        let body = json!({
            "type": "model",
            "name": repo_id.name,
            "organization": repo_id.namespace,
            "private": private,
        });

        let response = self
            .http
            .post(format!("{}/api/repos/create", self.base_url))
            .bearer_auth(self.token()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Created repo {}", repo_id);
            return Ok(self.repo_url(repo_id));
        }
        if status == StatusCode::CONFLICT && exist_ok {
            return Ok(self.repo_url(repo_id));
        }

        Err(AgentPackError::Hub {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }

    /// Upload a single local file into the repository
    pub async fn upload_file(
        &self,
        repo_id: &RepoId,
        local_path: &Path,
        path_in_repo: &str,
        commit_message: &str,
    ) -> Result<()> {
        let content = fs::read(local_path)?;
        let files = vec![(path_in_repo.to_string(), content)];
        self.commit(repo_id, commit_message, &files).await
    }

    /// Upload every file under `folder` as a single commit
    pub async fn upload_folder(
        &self,
        repo_id: &RepoId,
        folder: &Path,
        commit_message: &str,
    ) -> Result<()> {
        let files = collect_files(folder)?;
        if files.is_empty() {
            return Err(AgentPackError::Internal(format!(
                "nothing to upload in {:?}",
                folder
            )));
        }

        info!("Uploading {} files to {}", files.len(), repo_id);
        self.commit(repo_id, commit_message, &files).await
    }

    async fn commit(
        &self,
        repo_id: &RepoId,
        commit_message: &str,
        files: &[(String, Vec<u8>)],
    ) -> Result<()> {
        let payload = build_commit_payload(commit_message, files);

        let response = self
            .http
            .post(format!(
                "{}/api/models/{}/commit/main",
                self.base_url, repo_id
            ))
            .bearer_auth(self.token()?)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentPackError::Hub {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

/// Build the NDJSON commit payload: one header line, then one line per file
/// with its body base64-encoded
fn build_commit_payload(commit_message: &str, files: &[(String, Vec<u8>)]) -> String {
    let mut lines = Vec::with_capacity(files.len() + 1);
    lines.push(
        json!({
            "key": "header",
            "value": { "summary": commit_message },
        })
        .to_string(),
    );

    for (path, content) in files {
        lines.push(
            json!({
                "key": "file",
                "value": {
                    "path": path,
                    "content": BASE64_STANDARD.encode(content),
                    "encoding": "base64",
                },
            })
            .to_string(),
        );
    }

    lines.join("\n")
}

/// Collect `(relative_path, content)` pairs for every file under `root`,
/// with forward-slash separators regardless of platform
fn collect_files(root: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                walk(root, &path, out)?;
            } else {
                let rel = path
                    .strip_prefix(root)
                    .map_err(|e| AgentPackError::Internal(e.to_string()))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push((rel, fs::read(&path)?));
            }
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(root, root, &mut out)?;
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_id_parses_namespace_and_name() {
        let repo: RepoId = "org/ppo-CartPole-v1".parse().unwrap();
        assert_eq!(repo.namespace, "org");
        assert_eq!(repo.name, "ppo-CartPole-v1");
        assert_eq!(repo.to_string(), "org/ppo-CartPole-v1");
    }

    #[test]
    fn test_repo_id_rejects_malformed_ids() {
        assert!("no-slash".parse::<RepoId>().is_err());
        assert!("a/b/c".parse::<RepoId>().is_err());
        assert!("/name".parse::<RepoId>().is_err());
        assert!("org/".parse::<RepoId>().is_err());
        assert!("org/with space".parse::<RepoId>().is_err());
    }

    #[test]
    fn test_commit_payload_is_ndjson_with_base64_bodies() {
        let files = vec![("model.mpk".to_string(), b"weights".to_vec())];
        let payload = build_commit_payload("Initial commit", &files);

        let lines: Vec<&str> = payload.lines().collect();
        assert_eq!(lines.len(), 2);

        let header: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header["key"], "header");
        assert_eq!(header["value"]["summary"], "Initial commit");

        let file: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(file["key"], "file");
        assert_eq!(file["value"]["path"], "model.mpk");
        assert_eq!(
            file["value"]["content"],
            BASE64_STANDARD.encode(b"weights")
        );
    }

    #[test]
    fn test_collect_files_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), b"card").unwrap();
        fs::create_dir_all(dir.path().join("logs/tb")).unwrap();
        fs::write(dir.path().join("logs/tb/events.out"), b"tb").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "logs/tb/events.out"]);
    }

    #[tokio::test]
    async fn test_unreachable_hub_is_an_http_error() {
        let client = HubClient::new("http://127.0.0.1:1", Some("token".to_string())).unwrap();
        let repo: RepoId = "org/model".parse().unwrap();

        let err = client.create_repo(&repo, false, true).await;
        assert!(matches!(err, Err(AgentPackError::Http(_))));
    }

    #[test]
    fn test_missing_token_is_an_auth_error() {
        // Guard against ambient credentials leaking into the test
        std::env::remove_var(TOKEN_ENV_VAR);
        let client = HubClient::new("https://hub.example", None).unwrap();
        assert!(matches!(client.token(), Err(AgentPackError::Auth(_))));
    }
}
