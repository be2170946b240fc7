//! Steps that pull text from the web: plain page fetches, HTML cleanup and
//! the wiki document API.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::StepError;
use crate::pipeline::RequestContext;
use crate::sanitize::redact_locator;
use crate::step::{names, Step};

static IMG_SRC: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f\u{a0}]+").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());

/// Elements whose content never reaches the text.
const SKIPPED: &[&str] = &["script", "style", "noscript", "template"];
/// Elements followed by a line break.
const BLOCKS: &[&str] = &[
    "p", "div", "li", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "section", "article",
];

const USER_AGENT: &str = concat!("ingestchain/", env!("CARGO_PKG_VERSION"));

fn client(timeout: Duration) -> Result<reqwest::blocking::Client, StepError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Downloads the page at `source_path` into `text` as raw HTML.
pub struct HttpFetch {
    timeout: Duration,
}

impl HttpFetch {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Step for HttpFetch {
    fn name(&self) -> &str {
        names::HTTP_FETCH
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let response = client(self.timeout)?
            .get(&ctx.source_path)
            .send()?
            .error_for_status()?;

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            ctx.merge_metadata("content_type", json!(content_type));
        }

        ctx.text = response.text()?;
        info!(
            "Fetched {} ({} bytes)",
            redact_locator(&ctx.source_path),
            ctx.text.len()
        );
        Ok(())
    }
}

/// Reduces HTML in `text` to readable plain text.
///
/// Image sources are collected into `media_files` when the context asks for
/// media extraction.
pub struct HtmlClean;

impl Step for HtmlClean {
    fn name(&self) -> &str {
        names::HTML_CLEAN
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let document = Html::parse_document(&ctx.text);

        if ctx.extract_media {
            let images: Vec<String> = document
                .select(&IMG_SRC)
                .filter_map(|img| img.value().attr("src"))
                .map(str::to_string)
                .collect();
            if !images.is_empty() {
                debug!("Found {} images in {}", images.len(), ctx.file_name());
                ctx.merge_metadata("media_files", json!(images));
            }
        }

        ctx.text = document_text(&document);
        Ok(())
    }
}

fn document_text(document: &Html) -> String {
    let mut raw = String::new();
    push_text(document.root_element(), &mut raw);
    let collapsed = SPACES.replace_all(&raw, " ");

    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    BLANK_LINES
        .replace_all(&lines.join("\n"), "\n")
        .trim()
        .to_string()
}

/// Appends the text nodes under `element` in document order.
fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };

        let name = child.value().name();
        if SKIPPED.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push('\n');
            continue;
        }
        push_text(child, out);
        if BLOCKS.contains(&name) {
            out.push('\n');
        }
    }
}

#[derive(Debug, Deserialize)]
struct WikiThread {
    #[serde(default)]
    thread: WikiThreadInfo,
    #[serde(default)]
    html: String,
}

#[derive(Debug, Default, Deserialize)]
struct WikiThreadInfo {
    #[serde(default)]
    title: Option<String>,
}

/// Reads a wiki document through its REST API into `text` (HTML) and records
/// the document title.
pub struct WikiRead {
    base_url: String,
    token: Option<Arc<SecretString>>,
    timeout: Duration,
}

impl WikiRead {
    pub fn new(base_url: String, token: Option<Arc<SecretString>>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout,
        }
    }

    fn thread_url(&self, locator: &str) -> Result<String, StepError> {
        let id = thread_id(locator)
            .ok_or_else(|| StepError::MissingInput(format!("no document id in '{}'", locator)))?;
        Ok(format!("{}/1/threads/{}", self.base_url, id))
    }
}

/// Document id from `quip://ID`, `wiki://ID` or a document URL.
fn thread_id(locator: &str) -> Option<&str> {
    let rest = locator
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(locator);
    rest.split(['?', '#'])
        .next()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

impl Step for WikiRead {
    fn name(&self) -> &str {
        names::WIKI_READ
    }

    fn handle(&self, ctx: &mut RequestContext) -> Result<(), StepError> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| StepError::MissingInput("wiki access token is not configured".into()))?;
        let url = self.thread_url(&ctx.source_path)?;

        let thread: WikiThread = client(self.timeout)?
            .get(&url)
            .bearer_auth(token.expose_secret())
            .send()?
            .error_for_status()?
            .json()?;

        if let Some(title) = thread.thread.title {
            ctx.merge_metadata("title", json!(title));
        }
        ctx.text = thread.html;
        Ok(())
    }
}
