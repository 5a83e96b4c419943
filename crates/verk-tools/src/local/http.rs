// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use crate::providers::HttpProvider;

/// Bytes kept from a fetched body.  50 KB of readable text is plenty for a
/// model turn; anything beyond is truncated with a marker.
const MAX_CHARS: usize = 50_000;

/// HTTP provider backed by reqwest.  HTML responses are converted to
/// readable text; everything else is returned as-is.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpProvider for HttpFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("only http/https URLs are supported: {url}");
        }
        debug!(url = %url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request failed: {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("request failed with status {status}: {url}");
        }
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);
        let body = response.text().await?;
        let text = if is_html {
            html2text::from_read(body.as_bytes(), 100)
        } else {
            body
        };
        if text.len() > MAX_CHARS {
            let mut cut = MAX_CHARS;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            Ok(format!("{}\n[truncated at {MAX_CHARS} characters]", &text[..cut]))
        } else {
            Ok(text)
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let fetcher = HttpFetcher::new();
        let err = fetcher.fetch("ftp://example.com/x").await.unwrap_err();
        assert!(err.to_string().contains("only http/https"));
    }

    #[tokio::test]
    async fn rejects_bare_paths() {
        let fetcher = HttpFetcher::new();
        assert!(fetcher.fetch("/etc/passwd").await.is_err());
    }
}
