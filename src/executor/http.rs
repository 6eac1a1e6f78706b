//! HTTP download executor
//!
//! Fetches an item's source URL, then writes the original payload and/or a JPEG thumbnail
//! into the item's output directory, depending on its [`BehaviorFlags`](crate::types::BehaviorFlags).
//!
//! Artifact names are derived from the item id: `<id>.<ext>` for the original and
//! `<id>-thumb.jpg` for the thumbnail. Existing files are handled according to
//! [`FetchConfig::file_collision`].
//!
//! A failed item leaves no artifacts behind: the payload is decoded before anything is
//! written, and an original already on disk is removed if the thumbnail cannot be stored.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;

use crate::config::FetchConfig;
use crate::error::{Error, Result, TaskError};
use crate::executor::TaskExecutor;
use crate::executor::thumbnail::render_thumbnail;
use crate::retry::with_retry;
use crate::types::{Artifact, WorkItem};
use crate::utils::{extension_for, get_unique_path};

/// Response body plus the header needed to name it
struct Fetched {
    body: Bytes,
    content_type: Option<String>,
}

/// Downloads items over HTTP(S) and stores originals and thumbnails
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    /// Client that refuses redirects
    direct: reqwest::Client,
    /// Client that follows up to `max_redirects` hops
    following: reqwest::Client,
    config: FetchConfig,
}

impl HttpExecutor {
    /// Build the executor and its HTTP clients
    pub fn new(config: &FetchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            direct: build_client(config, Policy::none())?,
            following: build_client(config, Policy::limited(config.max_redirects))?,
            config: config.clone(),
        })
    }

    /// Settings this executor was built with
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn fetch(&self, item: &WorkItem) -> std::result::Result<Fetched, TaskError> {
        let url = url::Url::parse(item.source()).map_err(|e| {
            TaskError::invalid_response(format!("invalid source url '{}': {}", item.source(), e))
        })?;
        let client = if item.flags().follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let mut response = client.get(url).send().await?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("<none>");
            return Err(TaskError::invalid_response(format!(
                "HTTP {} redirect to {} not followed",
                status, location
            )));
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TaskError::network(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(TaskError::invalid_response(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let limit = self.config.max_body_bytes;
        if let Some(len) = response.content_length()
            && len > limit
        {
            return Err(body_too_large(len, limit));
        }
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            let len = (body.len() + chunk.len()) as u64;
            if len > limit {
                return Err(body_too_large(len, limit));
            }
            body.extend_from_slice(&chunk);
        }
        let body = body.freeze();
        if body.is_empty() {
            return Err(TaskError::invalid_response("empty response body"));
        }

        Ok(Fetched { body, content_type })
    }
}

fn body_too_large(len: u64, limit: u64) -> TaskError {
    TaskError::invalid_response(format!(
        "response body of {} bytes exceeds the {} byte limit",
        len, limit
    ))
}

fn build_client(config: &FetchConfig, policy: Policy) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.as_str())
        .redirect(policy)
        .build()
        .map_err(Error::Network)
}

/// Remove an artifact of an item that went on to fail
async fn remove_partial(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial artifact");
    }
}

#[async_trait]
impl TaskExecutor for HttpExecutor {
    async fn execute(&self, item: &WorkItem) -> std::result::Result<Artifact, TaskError> {
        let fetched = with_retry(&self.config.retry, || self.fetch(item)).await?;
        let flags = item.flags();
        let dir = item.output_dir();

        let mut artifact = Artifact {
            bytes: fetched.body.len() as u64,
            ..Default::default()
        };
        if !flags.save_original && !flags.save_derived {
            return Ok(artifact);
        }
        let thumbnail = if flags.save_derived {
            let body = fetched.body.clone();
            let config = self.config.thumbnail.clone();
            let thumb = tokio::task::spawn_blocking(move || render_thumbnail(&body, &config))
                .await
                .map_err(|e| TaskError::panicked(format!("thumbnail task failed: {}", e)))??;
            Some(thumb)
        } else {
            None
        };

        tokio::fs::create_dir_all(dir).await?;

        if flags.save_original {
            let ext = extension_for(fetched.content_type.as_deref(), item.source());
            let path = get_unique_path(
                &dir.join(format!("{}.{}", item.id(), ext)),
                self.config.file_collision,
            )?;
            tokio::fs::write(&path, &fetched.body).await?;
            artifact.original = Some(path);
        }

        if let Some(thumb) = thumbnail {
            let written = async {
                let path = get_unique_path(
                    &dir.join(format!("{}-thumb.jpg", item.id())),
                    self.config.file_collision,
                )?;
                tokio::fs::write(&path, &thumb.jpeg).await?;
                Ok::<_, TaskError>(path)
            }
            .await;

            match written {
                Ok(path) => {
                    tracing::trace!(
                        item_id = %item.id(),
                        width = thumb.width,
                        height = thumb.height,
                        "thumbnail written"
                    );
                    artifact.derived = Some(path);
                }
                Err(e) => {
                    if let Some(original) = artifact.original.take() {
                        remove_partial(&original).await;
                    }
                    return Err(e);
                }
            }
        }

        Ok(artifact)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
