use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::error::{AppError, FetchError, Result};
use crate::source::rate_limit::MinIntervalLimiter;
use crate::source::{Document, DocumentSource, TopicId};

/// Hard stop for `continue` round-trips on a single page.
const MAX_CONTINUATIONS: usize = 50;

type FetchResult<T> = std::result::Result<T, FetchError>;

/// [`DocumentSource`] backed by the MediaWiki Action API.
pub struct WikipediaSource {
    client: Client,
    api_url: String,
    search_limit: u32,
    limiter: MinIntervalLimiter,
}

impl WikipediaSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            search_limit: config.search_limit,
            limiter: MinIntervalLimiter::new(config.min_request_interval()),
        })
    }

    async fn get(&self, params: &[(String, String)]) -> FetchResult<ApiResponse> {
        self.limiter.acquire().await;

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Other(
                "rate limited by remote service (HTTP 429)".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Other(format!("API returned {status}: {body}")));
        }

        let body = response.json::<ApiResponse>().await?;
        if let Some(error) = body.error {
            return Err(FetchError::Other(format!(
                "API error {}: {}",
                error.code, error.info
            )));
        }
        Ok(body)
    }

    /// Run a single-title query, following `continue` until the page is complete.
    ///
    /// A page still continuing after [`MAX_CONTINUATIONS`] rounds is an error,
    /// never a truncated result.
    async fn query_page(&self, params: Vec<(String, String)>) -> FetchResult<ApiPage> {
        let mut merged: Option<ApiPage> = None;
        let mut continuation: Vec<(String, String)> = Vec::new();

        for _ in 0..MAX_CONTINUATIONS {
            let mut request = params.clone();
            request.extend(continuation.iter().cloned());

            let response = self.get(&request).await?;
            let page = response
                .query
                .and_then(|q| q.pages.into_iter().next())
                .ok_or_else(|| FetchError::Other("response contained no page".to_string()))?;

            let page = match merged.take() {
                Some(mut acc) => {
                    acc.absorb(page);
                    acc
                }
                None => page,
            };

            match response.continuation {
                Some(next) => {
                    continuation = continuation_params(next);
                    merged = Some(page);
                }
                None => return Ok(page),
            }
        }

        tracing::warn!(
            rounds = MAX_CONTINUATIONS,
            "Page still continuing after the round limit"
        );
        Err(FetchError::Other(
            "page exceeded continuation limit".to_string(),
        ))
    }
}

#[async_trait]
impl DocumentSource for WikipediaSource {
    async fn search(&self, query: &str) -> Result<Vec<TopicId>> {
        let params = vec![
            param("action", "query"),
            param("list", "search"),
            param("srsearch", query),
            param("srlimit", self.search_limit.to_string()),
            param("srprop", ""),
        ];

        let response = self
            .get(&params)
            .await
            .map_err(|e| AppError::Discovery(format!("search for {query:?} failed: {e}")))?;

        Ok(search_topics(response))
    }

    async fn fetch(&self, topic: &TopicId) -> FetchResult<Document> {
        // Exact title lookup; only redirects are followed, never search suggestions.
        let probe = self
            .query_page(vec![
                param("action", "query"),
                param("titles", topic.as_str()),
                param("redirects", "1"),
                param("prop", "pageprops"),
                param("ppprop", "disambiguation"),
            ])
            .await?;

        match classify_page(&probe) {
            PageKind::Missing => Err(FetchError::NotFound),
            PageKind::Disambiguation { title } => {
                let page = self
                    .query_page(vec![
                        param("action", "query"),
                        param("titles", title),
                        param("prop", "links"),
                        param("plnamespace", "0"),
                        param("pllimit", "max"),
                    ])
                    .await?;
                Err(FetchError::Ambiguous {
                    option_count: page.links.len(),
                })
            }
            PageKind::Article { title } => {
                let page = self
                    .query_page(vec![
                        param("action", "query"),
                        param("titles", title.clone()),
                        param("prop", "extlinks"),
                        param("ellimit", "max"),
                    ])
                    .await?;
                let references = page
                    .extlinks
                    .into_iter()
                    .map(|link| normalize_reference(link.url))
                    .collect();
                Ok(Document { title, references })
            }
        }
    }
}

fn param(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

fn continuation_params(next: BTreeMap<String, serde_json::Value>) -> Vec<(String, String)> {
    next.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}

fn search_topics(response: ApiResponse) -> Vec<TopicId> {
    response
        .query
        .map(|q| q.search.into_iter().map(|hit| TopicId::new(hit.title)).collect())
        .unwrap_or_default()
}

#[derive(Debug, PartialEq, Eq)]
enum PageKind {
    Missing,
    Disambiguation { title: String },
    Article { title: String },
}

fn classify_page(page: &ApiPage) -> PageKind {
    if page.missing || page.invalid || page.title.is_empty() {
        return PageKind::Missing;
    }
    let is_disambiguation = page
        .pageprops
        .as_ref()
        .is_some_and(|props| props.contains_key("disambiguation"));
    if is_disambiguation {
        PageKind::Disambiguation {
            title: page.title.clone(),
        }
    } else {
        PageKind::Article {
            title: page.title.clone(),
        }
    }
}

/// Protocol-relative links are given an explicit `http:` scheme.
fn normalize_reference(url: String) -> String {
    if url.starts_with("//") {
        format!("http:{url}")
    } else {
        url
    }
}

// --- Response types (formatversion=2) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
    #[serde(default, rename = "continue")]
    continuation: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: Vec<ApiPage>,
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    pageprops: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    extlinks: Vec<ExtLink>,
    #[serde(default)]
    links: Vec<IgnoredAny>,
}

impl ApiPage {
    fn absorb(&mut self, next: ApiPage) {
        self.extlinks.extend(next.extlinks);
        self.links.extend(next.links);
        if self.pageprops.is_none() {
            self.pageprops = next.pageprops;
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtLink {
    url: String,
}
