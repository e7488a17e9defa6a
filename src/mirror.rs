//! Best-effort copy of completions into a text file hosted on GitHub.

use crate::errors::QuestError;
use crate::models::MirrorConfig;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const LOG_FILE: &str = "habits.md";
pub const LOG_HEADER: &str = "# Habit Tracker Log\n\n";

#[derive(Debug, Clone, PartialEq)]
pub struct MirrorEntry {
    pub habit: String,
    pub completed_at: String,
}

impl MirrorEntry {
    pub fn now(habit: impl Into<String>) -> Self {
        Self {
            habit: habit.into(),
            completed_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn line(&self) -> String {
        format!("- Completed {} on {}\n", self.habit, self.completed_at)
    }

    pub fn commit_message(&self) -> String {
        format!("Log {} completion", self.habit)
    }
}

#[async_trait]
pub trait MirrorSink: Send + Sync {
    async fn append(&self, config: &MirrorConfig, entry: &MirrorEntry) -> Result<(), QuestError>;
}

/// Runs the append on its own task; failures only produce a warning.
pub fn spawn_append(sink: Arc<dyn MirrorSink>, config: MirrorConfig, entry: MirrorEntry) {
    tokio::spawn(async move {
        match sink.append(&config, &entry).await {
            Ok(()) => debug!(habit = %entry.habit, "completion mirrored"),
            Err(err) => warn!("{err}; progress is saved regardless"),
        }
    });
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct FileUpdate<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

pub struct GitHubMirror {
    client: reqwest::Client,
    api_base: String,
}

impl GitHubMirror {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn file_url(&self, config: &MirrorConfig) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, config.owner, config.repo, LOG_FILE
        )
    }

    async fn fetch(&self, config: &MirrorConfig) -> Result<Option<RemoteFile>, QuestError> {
        let response = self
            .client
            .get(self.file_url(config))
            .bearer_auth(&config.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "habit-quest")
            .send()
            .await
            .map_err(sync_failed)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(sync_failed)?;
        response.json().await.map(Some).map_err(sync_failed)
    }
}

#[async_trait]
impl MirrorSink for GitHubMirror {
    async fn append(&self, config: &MirrorConfig, entry: &MirrorEntry) -> Result<(), QuestError> {
        let existing = self.fetch(config).await?;
        let (body, sha) = match &existing {
            Some(file) => (decode_content(&file.content)?, Some(file.sha.as_str())),
            None => (LOG_HEADER.to_string(), None),
        };

        let update = FileUpdate {
            message: entry.commit_message(),
            content: STANDARD.encode(format!("{body}{}", entry.line())),
            sha,
        };
        self.client
            .put(self.file_url(config))
            .bearer_auth(&config.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "habit-quest")
            .json(&update)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(sync_failed)?;
        Ok(())
    }
}

/// GitHub wraps base64 content at 60 columns.
fn decode_content(content: &str) -> Result<String, QuestError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|err| QuestError::MirrorSyncFailed(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| QuestError::MirrorSyncFailed(err.to_string()))
}

fn sync_failed(err: reqwest::Error) -> QuestError {
    QuestError::MirrorSyncFailed(err.to_string())
}
