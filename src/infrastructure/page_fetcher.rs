//! Page fetching for paginated catalog queries
//!
//! One GET per offset. Transport failures are logged and returned as
//! `PageResult::Failure`; they never propagate as errors. A non-200 status
//! or a body without data is `PageResult::Empty`.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::http_client::{Transport, TransportError};
use super::query_builder::Query;

/// Usable content of a page
#[derive(Debug, Clone, PartialEq)]
pub enum PageBody {
    /// HTML page with the entry list
    Markup(String),
    /// Non-empty `data` array of a JSON search response
    Json(Vec<Value>),
}

/// Outcome of fetching one page
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    Payload(PageBody),
    Empty,
    Failure(TransportError),
}

/// Anything that can produce pages for a query; the crawl driver only sees this
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, query: &Query, offset: u32) -> PageResult;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for Arc<S> {
    async fn fetch(&self, query: &Query, offset: u32) -> PageResult {
        (**self).fetch(query, offset).await
    }
}

/// Fetches catalog pages through a `Transport` with a fixed header set
pub struct PageFetcher<T> {
    transport: T,
    headers: Vec<(String, String)>,
}

impl<T: Transport> PageFetcher<T> {
    /// Picks one User-Agent from `user_agents` for the lifetime of this fetcher
    pub fn new(transport: T, user_agents: &[String]) -> Self {
        let pool: Vec<&String> = user_agents.iter().filter(|ua| !ua.trim().is_empty()).collect();
        let user_agent = fastrand::choice(pool)
            .cloned()
            .unwrap_or_else(|| format!("catalog-harvest/{}", env!("CARGO_PKG_VERSION")));
        Self::with_user_agent(transport, user_agent)
    }

    pub fn with_user_agent(transport: T, user_agent: impl Into<String>) -> Self {
        Self {
            transport,
            headers: vec![
                ("User-Agent".to_string(), user_agent.into()),
                ("Accept".to_string(), "application/json, text/html;q=0.9".to_string()),
            ],
        }
    }

    pub fn user_agent(&self) -> &str {
        self.headers
            .iter()
            .find(|(name, _)| name == "User-Agent")
            .map_or("", |(_, value)| value.as_str())
    }

    /// Fetch an arbitrary URL (used for the vocabulary page)
    pub async fn fetch_url(&self, url: &str) -> PageResult {
        match self.transport.get(url, &self.headers).await {
            Ok(response) if response.status == 200 => classify_body(response.body),
            Ok(response) => {
                warn!("Status {} for {}", response.status, url);
                PageResult::Empty
            }
            Err(e) => {
                error!("Fetch failed: {}", e);
                PageResult::Failure(e)
            }
        }
    }
}

#[async_trait]
impl<T: Transport> PageSource for PageFetcher<T> {
    async fn fetch(&self, query: &Query, offset: u32) -> PageResult {
        self.fetch_url(&query.page_url(offset)).await
    }
}

/// JSON bodies must carry a non-empty `data` array; anything else is markup
pub fn classify_body(body: String) -> PageResult {
    let trimmed = body.trim_start();
    if trimmed.is_empty() {
        return PageResult::Empty;
    }

    if !trimmed.starts_with('{') {
        return PageResult::Payload(PageBody::Markup(body));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(mut object)) => match object.remove("data") {
            Some(Value::Array(entries)) if !entries.is_empty() => PageResult::Payload(PageBody::Json(entries)),
            _ => {
                debug!("Response carries no data entries");
                PageResult::Empty
            }
        },
        Ok(_) => PageResult::Empty,
        Err(e) => {
            warn!("Unparseable JSON body treated as empty: {}", e);
            PageResult::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FilterCriteria;
    use crate::infrastructure::query_builder::QueryBuilder;
    use crate::test_utils::{ScriptedTransport, Step};

    fn query() -> Query {
        QueryBuilder::new("https://catalog.test/search?", "ALL")
            .build(&FilterCriteria::new("Comedy", "US"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_data_is_payload() {
        let transport = ScriptedTransport::new(vec![Step::ok(r#"{"data":[{"title":"A"}]}"#)]);
        let fetcher = PageFetcher::with_user_agent(transport, "ua-test");

        let result = fetcher.fetch(&query(), 0).await;
        assert!(matches!(result, PageResult::Payload(PageBody::Json(ref entries)) if entries.len() == 1));
    }

    #[tokio::test]
    async fn test_empty_data_is_empty() {
        let transport = ScriptedTransport::new(vec![Step::ok(r#"{"data":[]}"#), Step::ok(r#"{"msg":"x"}"#)]);
        let fetcher = PageFetcher::with_user_agent(transport, "ua-test");

        assert_eq!(fetcher.fetch(&query(), 0).await, PageResult::Empty);
        assert_eq!(fetcher.fetch(&query(), 20).await, PageResult::Empty);
    }

    #[tokio::test]
    async fn test_non_200_is_empty() {
        let transport = ScriptedTransport::new(vec![Step::status(403, "forbidden")]);
        let fetcher = PageFetcher::with_user_agent(transport, "ua-test");
        assert_eq!(fetcher.fetch(&query(), 0).await, PageResult::Empty);
    }

    #[tokio::test]
    async fn test_transport_error_is_failure_not_panic() {
        let transport = ScriptedTransport::new(vec![Step::fail()]);
        let fetcher = PageFetcher::with_user_agent(transport, "ua-test");
        assert!(matches!(fetcher.fetch(&query(), 0).await, PageResult::Failure(_)));
    }

    #[tokio::test]
    async fn test_offset_and_user_agent_reach_transport() {
        let transport = ScriptedTransport::new(vec![Step::ok("<div class=\"list-wp\"></div>")]);
        let fetcher = PageFetcher::new(transport, &["ua-one".to_string()]);

        let result = fetcher.fetch(&query(), 40).await;
        assert!(matches!(result, PageResult::Payload(PageBody::Markup(_))));

        let calls = fetcher.transport.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].url.ends_with("&start=40"));
        assert!(calls[0].headers.contains(&("User-Agent".to_string(), "ua-one".to_string())));
        assert_eq!(fetcher.user_agent(), "ua-one");
    }

    #[test]
    fn test_user_agent_drawn_from_pool() {
        let pool = vec!["a".to_string(), "b".to_string(), String::new()];
        for _ in 0..20 {
            let fetcher = PageFetcher::new(ScriptedTransport::new(vec![]), &pool);
            assert!(["a", "b"].contains(&fetcher.user_agent()));
        }
    }

    #[test]
    fn test_classify_blank_and_broken_bodies() {
        assert_eq!(classify_body("   \n".to_string()), PageResult::Empty);
        assert_eq!(classify_body("{not json".to_string()), PageResult::Empty);
        assert_eq!(classify_body(r#"{"data": "nope"}"#.to_string()), PageResult::Empty);
    }
}
