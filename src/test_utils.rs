//! Test utilities for catalog-harvest
//!
//! Scripted transports and page sources plus small markup builders, so
//! tests never touch the network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::infrastructure::http_client::{HttpResponse, Transport, TransportError};
use crate::infrastructure::page_fetcher::{PageResult, PageSource};
use crate::infrastructure::query_builder::Query;

/// One scripted transport reply
#[derive(Debug, Clone)]
pub enum Step {
    Reply(HttpResponse),
    Fail(TransportError),
}

impl Step {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Reply(HttpResponse {
            status,
            body: body.into(),
        })
    }

    pub fn fail() -> Self {
        Self::Fail(TransportError::Connect {
            url: "scripted".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// A request seen by a scripted transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Replays `steps` in order; an exhausted script answers with an empty 200
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            headers: headers.to_vec(),
        });
        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            None => Ok(HttpResponse {
                status: 200,
                body: String::new(),
            }),
        }
    }
}

/// Page source backed by a closure over (query, offset)
pub struct FnSource<F> {
    respond: F,
    calls: Mutex<Vec<(String, u32)>>,
}

impl<F> FnSource<F>
where
    F: Fn(&Query, u32) -> PageResult + Send + Sync,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (page URL, offset) of every fetch, in order
    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> PageSource for FnSource<F>
where
    F: Fn(&Query, u32) -> PageResult + Send + Sync,
{
    async fn fetch(&self, query: &Query, offset: u32) -> PageResult {
        self.calls.lock().unwrap().push((query.page_url(offset), offset));
        (self.respond)(query, offset)
    }
}

/// Page source replaying a fixed sequence, then `Empty`
pub struct SequenceSource {
    pages: Mutex<VecDeque<PageResult>>,
    offsets: Mutex<Vec<u32>>,
}

impl SequenceSource {
    pub fn new(pages: Vec<PageResult>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            offsets: Mutex::new(Vec::new()),
        }
    }

    pub fn offsets(&self) -> Vec<u32> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for SequenceSource {
    async fn fetch(&self, _query: &Query, offset: u32) -> PageResult {
        self.offsets.lock().unwrap().push(offset);
        self.pages.lock().unwrap().pop_front().unwrap_or(PageResult::Empty)
    }
}

/// One entry in the catalog's list markup
pub fn entry_markup(href: &str, cover: &str, name: &str, score: &str) -> String {
    format!(
        r#"<a class="item" href="{href}" target="_blank">
  <div class="cover-wp"><span class="pic"><img src="{cover}" alt="{name}"></span></div>
  <p><span class="title">{name}</span><span class="rate">{score}</span></p>
</a>"#
    )
}

/// A list page wrapping `entries`
pub fn list_page(entries: &[String]) -> String {
    format!(
        r#"<html><body><div class="tags"></div><div class="list-wp">{}</div><a class="more">加载更多</a></body></html>"#,
        entries.join("\n")
    )
}

/// Markup list page with `count` generated entries starting at `first`
pub fn markup_page(first: usize, count: usize) -> String {
    let entries: Vec<String> = (first..first + count)
        .map(|i| entry_markup(&format!("/subject/{i}/"), &format!("/cover/{i}.jpg"), &format!("Title {i}"), "7.5"))
        .collect();
    list_page(&entries)
}

/// A tag control region with one `ul.category` per group
pub fn tag_page(groups: &[&[&str]]) -> String {
    let groups: Vec<String> = groups
        .iter()
        .map(|tags| {
            let items: String = tags
                .iter()
                .map(|tag| format!(r#"<li><span class="tag">{tag}</span></li>"#))
                .collect();
            format!(r#"<ul class="category">{items}</ul>"#)
        })
        .collect();
    format!(r#"<html><body><div class="tags">{}</div></body></html>"#, groups.join(""))
}
