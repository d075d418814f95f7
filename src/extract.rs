use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::ExtractedJob;
use crate::text::{char_prefix, normalize_text};

/// Message type a content script answers with an [`ExtractedJob`].
pub const GET_JOB_TEXT: &str = "GET_JOB_TEXT";

pub const MAX_JOB_TEXT_CHARS: usize = 16_000;
const MIN_BLOCK_CHARS: usize = 300;
const MIN_SELECTION_CHARS: usize = 100;

const DESCRIPTION_SELECTORS: [&str; 6] = [
    "[data-testid*='job']",
    "[class*='job-description']",
    "[id*='job-description']",
    "article",
    "main",
    "section",
];

const COMPANY_SELECTOR: &str = "[data-company], [class*='company'], [id*='company']";

// Elements whose text never renders.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Debug, Serialize, Deserialize)]
pub struct JobTextMessage {
    #[serde(rename = "type")]
    pub kind: String,
}

impl JobTextMessage {
    pub fn get_job_text() -> Self {
        Self { kind: GET_JOB_TEXT.to_string() }
    }
}

/// A loaded page plus whatever text the user had selected on it.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub html: String,
    pub url: String,
    pub selection: Option<String>,
}

impl PageSnapshot {
    /// Load a page from a local file or an http(s) URL.
    pub fn load(source: &str, selection: Option<String>) -> Result<Self> {
        let html = if source.starts_with("http://") || source.starts_with("https://") {
            fetch_page(source)?
        } else {
            fs::read_to_string(source)?
        };
        Ok(Self {
            html,
            url: source.to_string(),
            selection,
        })
    }
}

fn fetch_page(url: &str) -> Result<String> {
    debug!(url, "fetching job page");
    let transport = |source| AppError::Transport {
        service: "job page".to_string(),
        source,
    };

    let response = reqwest::blocking::get(url).map_err(transport)?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        return Err(AppError::Remote {
            service: "Job page".to_string(),
            status,
            body,
        });
    }
    response.text().map_err(transport)
}

/// Visible text nodes of an element concatenated as-is, then whitespace-normalized.
fn text_from_element(element: ElementRef) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
        }
    }
    normalize_text(&raw)
}

fn first_match_text(document: &Html, selector: &str) -> String {
    Selector::parse(selector)
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(text_from_element)
        .unwrap_or_default()
}

fn body_text(document: &Html) -> String {
    match Selector::parse("body").ok().and_then(|s| document.select(&s).next()) {
        Some(body) => text_from_element(body),
        None => text_from_element(document.root_element()),
    }
}

fn find_best_description_block(document: &Html, selection: Option<&str>) -> String {
    let mut candidates: Vec<String> = Vec::new();

    for selector in DESCRIPTION_SELECTORS {
        let Ok(parsed) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&parsed) {
            let text = text_from_element(element);
            if text.chars().count() > MIN_BLOCK_CHARS {
                candidates.push(text);
            }
        }
    }

    candidates.sort_by_key(|text| std::cmp::Reverse(text.chars().count()));

    // The selection is the most deliberate signal; it goes first regardless of length.
    let selection = selection.map(normalize_text).unwrap_or_default();
    if selection.chars().count() > MIN_SELECTION_CHARS {
        debug!(chars = selection.chars().count(), "using selected text as job description");
        candidates.insert(0, selection);
    }

    debug!(candidates = candidates.len(), "description candidates found");
    candidates
        .into_iter()
        .next()
        .unwrap_or_else(|| body_text(document))
}

/// Title, company and description block joined by blank lines, capped at 16000 characters.
pub fn build_job_text(document: &Html, selection: Option<&str>) -> String {
    let title = first_match_text(document, "h1");
    let company = first_match_text(document, COMPANY_SELECTOR);
    let body = find_best_description_block(document, selection);

    let joined = [title, company, body]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    cap_job_text(&joined)
}

/// Trimmed job text cut to at most 16000 characters.
pub fn cap_job_text(text: &str) -> String {
    char_prefix(text.trim(), MAX_JOB_TEXT_CHARS).to_string()
}

pub fn extract_job(page: &PageSnapshot) -> ExtractedJob {
    let document = Html::parse_document(&page.html);
    ExtractedJob {
        job_text: build_job_text(&document, page.selection.as_deref()),
        page_title: first_match_text(&document, "title"),
        url: page.url.clone(),
    }
}

/// One way of asking a page for its job text.
pub trait JobTextProbe {
    fn name(&self) -> &'static str;
    fn probe(&self) -> Result<ExtractedJob>;
}

/// Reads a `GET_JOB_TEXT` reply recorded by a content script.
pub struct ReplyProbe {
    path: PathBuf,
}

impl ReplyProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl JobTextProbe for ReplyProbe {
    fn name(&self) -> &'static str {
        "content script reply"
    }

    fn probe(&self) -> Result<ExtractedJob> {
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|source| AppError::Decode {
            service: "content script".to_string(),
            source,
        })
    }
}

/// Loads the page only when probed, then runs the extractor against its markup.
pub struct DomProbe {
    source: String,
    selection: Option<String>,
}

impl DomProbe {
    pub fn new(source: impl Into<String>, selection: Option<String>) -> Self {
        Self {
            source: source.into(),
            selection,
        }
    }
}

impl JobTextProbe for DomProbe {
    fn name(&self) -> &'static str {
        "page markup"
    }

    fn probe(&self) -> Result<ExtractedJob> {
        let page = PageSnapshot::load(&self.source, self.selection.clone())?;
        Ok(extract_job(&page))
    }
}

/// Try the primary probe, falling back to `fallback` once if it fails.
/// Empty job text is reported as an extraction failure.
pub fn probe_with_fallback(
    primary: Option<&dyn JobTextProbe>,
    fallback: &dyn JobTextProbe,
) -> Result<ExtractedJob> {
    let attempt = match primary {
        Some(probe) => match probe.probe() {
            Ok(job) => Ok(job),
            Err(e) => {
                warn!(probe = probe.name(), error = %e, "probe failed, falling back to {}", fallback.name());
                fallback.probe()
            }
        },
        None => fallback.probe(),
    };

    let mut job = attempt?;
    job.job_text = cap_job_text(&job.job_text);
    if job.job_text.is_empty() {
        return Err(AppError::Extraction(
            "Could not extract content from this page. Paste the job description manually.".to_string(),
        ));
    }
    Ok(job)
}
