//! Polygon sources.
//!
//! A [`PolygonSource`] performs exactly one fetch attempt for a polygon index.
//! [`HttpPolygonSource`] is the production implementation: one `GET` per
//! index against a [`UrlTemplate`], with a bounded per-request timeout.
//!
//! Sources do not observe the run deadline themselves. Workers race every
//! fetch against the deadline and drop the future when it fires, which aborts
//! the underlying connection.

use anyhow::Context;
use core::{future::Future, time::Duration};
use polybox_core::{Polygon, PolygonError};
use reqwest::{StatusCode, Url};

/// Placeholder replaced by the polygon index in a [`UrlTemplate`].
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// Fetches one polygon per call.
pub trait PolygonSource: Send + Sync + 'static {
    /// Fetches the polygon with the given index. Called at most once per
    /// index per run.
    fn fetch(&self, index: usize) -> impl Future<Output = Result<Polygon, PolygonError>> + Send;
}

/// Maps polygon indices to request URLs.
///
/// Every `{index}` occurrence is replaced by the index. A template without the
/// placeholder yields the same URL for every index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// Validates `template` by rendering it for index 0.
    pub fn parse(template: &str) -> anyhow::Result<Self> {
        let this = Self {
            template: template.to_owned(),
        };
        this.render(0)
            .with_context(|| format!("invalid polygon URL: {template}"))?;
        Ok(this)
    }

    pub fn is_indexed(&self) -> bool {
        self.template.contains(INDEX_PLACEHOLDER)
    }

    pub fn render(&self, index: usize) -> Result<Url, PolygonError> {
        let raw = if self.is_indexed() {
            self.template.replace(INDEX_PLACEHOLDER, &index.to_string())
        } else {
            self.template.clone()
        };
        Url::parse(&raw).map_err(|e| PolygonError::Transport {
            reason: format!("invalid URL {raw:?}: {e}"),
        })
    }
}

/// HTTP implementation of [`PolygonSource`].
#[derive(Clone, Debug)]
pub struct HttpPolygonSource {
    client: reqwest::Client,
    url: UrlTemplate,
}

impl HttpPolygonSource {
    /// Builds a source whose requests each time out after `fetch_timeout`.
    pub fn new(url: UrlTemplate, fetch_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, url })
    }

    async fn get(&self, index: usize) -> Result<Polygon, PolygonError> {
        let url = self.url.render(index)?;

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PolygonError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;

        serde_json::from_slice(&body).map_err(|e| PolygonError::Decode {
            reason: e.to_string(),
        })
    }
}

impl PolygonSource for HttpPolygonSource {
    fn fetch(&self, index: usize) -> impl Future<Output = Result<Polygon, PolygonError>> + Send {
        self.get(index)
    }
}

fn transport(err: reqwest::Error) -> PolygonError {
    PolygonError::Transport {
        reason: err.to_string(),
    }
}
