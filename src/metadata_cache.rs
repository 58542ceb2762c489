//! Client of the metadata cache, the off-chain index of published assets.
//!
//! Asset documents (DDOs) are passed through as [`serde_json::Value`]; the
//! cache owns their schema and search semantics.

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

const ASSETS_PATH: &str = "api/aquarius/assets/";

#[derive(Debug, Error)]
pub enum MetadataCacheError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("API error (status {status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Software and version reported by the cache.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct VersionInfo {
    pub software: String,
    pub version: String,
}

/// Paged search over indexed assets.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
    /// Search backend query, e.g. `{"match_all": {}}`.
    pub query: Value,
    pub sort: Option<Value>,
    /// 1-based.
    pub page: u64,
    pub page_size: u64,
}

impl SearchQuery {
    pub fn new(query: Value) -> Self {
        Self {
            query,
            sort: None,
            page: 1,
            page_size: 100,
        }
    }

    pub fn with_page(mut self, page: u64, page_size: u64) -> Self {
        self.page = page.max(1);
        self.page_size = page_size;
        self
    }

    pub fn with_sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }

    fn body(&self) -> SearchBody<'_> {
        SearchBody {
            from: self.page.saturating_sub(1).saturating_mul(self.page_size),
            size: self.page_size,
            query: &self.query,
            sort: self.sort.as_ref(),
        }
    }
}

#[derive(Serialize)]
struct SearchBody<'a> {
    from: u64,
    size: u64,
    query: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a Value>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    total: Total,
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Total {
    value: u64,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: Value,
}

/// One page of search results.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub results: Vec<Value>,
    pub page: u64,
    pub total_pages: u64,
    pub total_results: u64,
}

/// Outcome of [`MetadataCache::validate_metadata`].
#[derive(Clone, Debug, PartialEq)]
pub enum Validation {
    Valid,
    /// Rejected, with the errors reported by the cache.
    Invalid(Value),
}

#[derive(Clone, Debug)]
pub struct MetadataCache {
    client: Client,
    base_url: Url,
}

impl MetadataCache {
    pub fn new(base_url: &str) -> Result<Self, MetadataCacheError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn version_info(&self) -> Result<VersionInfo, MetadataCacheError> {
        let response = self.client.get(self.base_url.clone()).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn query_metadata(
        &self,
        query: &SearchQuery,
    ) -> Result<QueryResult, MetadataCacheError> {
        let url = self.assets_url("query")?;
        debug!(%url, page = query.page, "querying metadata cache");
        let response = self.client.post(url).json(&query.body()).send().await?;
        let response: SearchResponse = check(response).await?.json().await?;

        let total_results = response.hits.total.value;
        Ok(QueryResult {
            results: response.hits.hits.into_iter().map(|hit| hit.source).collect(),
            page: query.page,
            total_pages: match query.page_size {
                0 => 0,
                size => total_results.div_ceil(size),
            },
            total_results,
        })
    }

    /// Assets published by `owner`.
    pub async fn owner_assets(
        &self,
        owner: &str,
        page: u64,
    ) -> Result<QueryResult, MetadataCacheError> {
        let query = SearchQuery::new(json!({ "match": { "nft.owner": owner } }))
            .with_page(page, 100)
            .with_sort(json!({ "nft.created": "desc" }));
        self.query_metadata(&query).await
    }

    /// Document of `did`, `None` when the cache does not know it.
    pub async fn retrieve_ddo(&self, did: &str) -> Result<Option<Value>, MetadataCacheError> {
        let url = self.service_endpoint(did)?;
        self.retrieve_ddo_by_url(url.as_str()).await
    }

    pub async fn retrieve_ddo_by_url(
        &self,
        url: &str,
    ) -> Result<Option<Value>, MetadataCacheError> {
        let url = Url::parse(url)?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    pub async fn validate_metadata(&self, ddo: &Value) -> Result<Validation, MetadataCacheError> {
        let url = self.assets_url("ddo/validate")?;
        let response = self.client.post(url).json(ddo).send().await?;
        if response.status() == StatusCode::BAD_REQUEST {
            return Ok(Validation::Invalid(response.json().await?));
        }
        check(response).await?;
        Ok(Validation::Valid)
    }

    /// URL the document of `did` is served at.
    pub fn service_endpoint(&self, did: &str) -> Result<Url, MetadataCacheError> {
        self.assets_url(&format!("ddo/{did}"))
    }

    fn assets_url(&self, path: &str) -> Result<Url, MetadataCacheError> {
        Ok(self.base_url.join(ASSETS_PATH)?.join(path)?)
    }
}

async fn check(response: Response) -> Result<Response, MetadataCacheError> {
    if !response.status().is_success() {
        let status = response.status();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(MetadataCacheError::Api { status, message });
    }
    Ok(response)
}
