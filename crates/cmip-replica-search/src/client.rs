// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::{SearchError, SearchErrorCode, SearchResult};
use crate::query::SearchQuery;

/// Source of raw search responses.
pub trait SearchClient {
    fn fetch(&self, query: &SearchQuery) -> SearchResult<String>;
}

impl<T: SearchClient + ?Sized> SearchClient for &T {
    fn fetch(&self, query: &SearchQuery) -> SearchResult<String> {
        (**self).fetch(query)
    }
}

#[derive(Clone)]
pub struct HttpSearchClient {
    pub base_url: String,
    client: Client,
}

impl HttpSearchClient {
    /// Large retraction pages can take minutes; `timeout` of `None` waits indefinitely.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::new(SearchErrorCode::Network, e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn url_for(&self, query: &SearchQuery) -> SearchResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SearchError::new(SearchErrorCode::Validation, e.to_string()))?;
        if url.host_str().is_none() {
            return Err(SearchError::new(
                SearchErrorCode::Validation,
                "search url has no host",
            ));
        }
        url.set_query(Some(&query.query_string()));
        Ok(url)
    }
}

impl SearchClient for HttpSearchClient {
    fn fetch(&self, query: &SearchQuery) -> SearchResult<String> {
        let url = self.url_for(query)?;
        debug!(url = %url, "querying search index");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| SearchError::new(SearchErrorCode::Network, e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::new(
                SearchErrorCode::HttpStatus,
                format!("search index answered {status}"),
            ));
        }
        resp.text()
            .map_err(|e| SearchError::new(SearchErrorCode::Network, e.to_string()))
    }
}
