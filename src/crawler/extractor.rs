//! Job detail page extraction
//!
//! This module turns one detail page into a `JobRecord`:
//! - Title from an ordered list of selectors
//! - Short-circuit for the "Job Unavailable" placeholder page
//! - Labeled single-line fields and the overview section from the page text
//! - Skills from markup, then from the section after the skills label, then
//!   from the raw page text
//!
//! Every step yields an optional value; a missing label only leaves that
//! field unset.

use crate::crawler::discovery::extract_job_id;
use crate::crawler::fallback::{non_empty, FallbackChain};
use crate::crawler::session::fetch_html;
use crate::state::{JobRecord, JobStatus, StatusEntry};
use crate::HarvestError;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

/// Title shown by the site in place of a removed posting
pub const UNAVAILABLE_TITLE: &str = "Job Unavailable";

/// History reason recorded when the placeholder page is seen
pub const REASON_MARKED_UNAVAILABLE: &str = "became unavailable";

/// Title candidates, most specific first
const TITLE_SELECTORS: [&str; 4] = ["h1", ".job-title", "#job-title", "title"];

/// Titles must be longer than this many characters
const MIN_TITLE_CHARS: usize = 5;

/// Skill tags in the page markup
const SKILL_TAG_SELECTOR: &str = "a.card-worker-topskill";

/// Section headings that end the skills block
const SKILL_TERMINATORS: [&str; 4] = [
    "ABOUT THE EMPLOYER",
    "SHARE THIS POST",
    "VIEW OTHER JOB",
    "COPYRIGHT",
];

/// Skills shorter than or equal to this many characters are dropped
const MIN_SKILL_CHARS: usize = 2;

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("valid extraction pattern")
}

static TYPE_OF_WORK: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)TYPE OF WORK\s*([^\n]+)"));
static SALARY: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)SALARY\s*([^\n]+)"));
static HOURS_PER_WEEK: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)HOURS PER WEEK\s*([^\n]+)"));
static DATE_UPDATED: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)DATE UPDATED\s*([^\n]+)"));
static OVERVIEW_LABEL: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)JOB OVERVIEW\s*"));
static OVERVIEW_END: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)SKILL REQUIREMENT|ABOUT THE EMPLOYER"));
static SKILL_LABEL: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?i)SKILL\s+REQUIREMENT"));
static SKILL_SECTION: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)SKILL\s+REQUIREMENTS?\s*"));
static SKILL_SECTION_END: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?i)ABOUT\s+THE\s+EMPLOYER|SHARE\s+THIS\s+POST|VIEW\s+OTHER|COPYRIGHT")
});
static SKILL_FOOTER: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?i)Employers|Workers|Copyright"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\s+"));

/// Fetches a detail page and extracts its record
///
/// # Arguments
///
/// * `session` - The worker's HTTP session
/// * `url` - The detail-page URL
///
/// # Returns
///
/// * `Ok(JobRecord)` - Extracted record, stamped with the fetch time
/// * `Err(HarvestError)` - `MissingJobId` (no request is made), a network
///   error, or `Parse`
pub async fn scrape_job(session: &Client, url: &str) -> Result<JobRecord, HarvestError> {
    let id = extract_job_id(url).ok_or_else(|| HarvestError::MissingJobId {
        url: url.to_string(),
    })?;

    let html = fetch_html(session, url).await?;
    extract_job(&id, url, &html)
}

/// Extracts a record from detail-page HTML
///
/// # Arguments
///
/// * `id` - The job id derived from the URL
/// * `url` - The detail-page URL
/// * `html` - The page body
///
/// # Example
///
/// ```
/// use job_harvest::crawler::extract_job;
///
/// let html = "<html><body><h1>Senior Content Writer</h1>\n<p>SALARY\n$800/month</p></body></html>";
/// let record = extract_job("123", "https://example.com/job/123", html).unwrap();
/// assert_eq!(record.title.as_deref(), Some("Senior Content Writer"));
/// assert_eq!(record.salary_text.as_deref(), Some("$800/month"));
/// ```
pub fn extract_job(id: &str, url: &str, html: &str) -> Result<JobRecord, HarvestError> {
    if html.trim().is_empty() {
        return Err(HarvestError::Parse {
            url: url.to_string(),
            message: "empty document".to_string(),
        });
    }

    let document = Html::parse_document(html);
    let mut record = JobRecord::new(id, url);
    record.title = extract_title(&document);

    if record.title.as_deref() == Some(UNAVAILABLE_TITLE) {
        record.is_active = false;
        record.status_history.push(StatusEntry::now(
            JobStatus::Inactive,
            REASON_MARKED_UNAVAILABLE,
        ));
        return Ok(record);
    }

    let text = flatten_text(&document);
    record.work_type = labeled_line(&text, &TYPE_OF_WORK);
    record.salary_text = labeled_line(&text, &SALARY);
    record.hours_per_week = labeled_line(&text, &HOURS_PER_WEEK);
    record.posted_date_updated = labeled_line(&text, &DATE_UPDATED);
    record.overview_text =
        section_after(&text, &OVERVIEW_LABEL, &OVERVIEW_END).map(str::to_string);
    record.skills = extract_skills(&document, &text);

    Ok(record)
}

/// First title candidate that passes the length check
fn extract_title(document: &Html) -> Option<String> {
    let mut chain = FallbackChain::new();
    for selector in TITLE_SELECTORS {
        chain = chain.or_try(selector, move || {
            let selector = Selector::parse(selector).ok()?;
            let element = document.select(&selector).next()?;
            let title = element_text(element, " ");
            (title.chars().count() > MIN_TITLE_CHARS).then_some(title)
        });
    }
    chain.resolve()
}

/// Skills from the first tier that yields any
fn extract_skills(document: &Html, text: &str) -> Vec<String> {
    let chain = FallbackChain::new()
        .or_try("skill tags", || skills_from_tags(document))
        .or_try("skills section", || skills_after_label(document))
        .or_try("page text", || skills_from_text(text));

    match chain.resolve_named() {
        Some((tier, skills)) => {
            tracing::trace!("Extracted {} skills from {}", skills.len(), tier);
            skills
        }
        None => Vec::new(),
    }
}

/// Tier 1: skill tags in the markup, text kept as-is
fn skills_from_tags(document: &Html) -> Option<Vec<String>> {
    let selector = Selector::parse(SKILL_TAG_SELECTOR).ok()?;
    let tags = document
        .select(&selector)
        .map(|element| element.text().collect::<String>());
    non_empty(clean_skills(tags))
}

/// Tier 2: text of the elements following the skills label
fn skills_after_label(document: &Html) -> Option<Vec<String>> {
    let label = document.root_element().descendants().find(|node| {
        matches!(node.value(), Node::Text(text) if SKILL_LABEL.is_match(text))
    })?;
    let parent = label.parent()?;

    let mut collected = Vec::new();
    for sibling in parent.next_siblings().filter_map(ElementRef::wrap) {
        let text = element_text(sibling, "");
        let upper = text.to_uppercase();
        if SKILL_TERMINATORS.iter().any(|t| upper.contains(t)) {
            break;
        }
        if text.chars().count() > MIN_SKILL_CHARS {
            collected.push(text);
        }
    }

    let candidates = collected
        .iter()
        .flat_map(|block| block.split([',', '\n', '\r']))
        .flat_map(split_concatenated_labels);
    non_empty(clean_skills(candidates))
}

/// Tier 3: the skills span of the flattened page text
fn skills_from_text(text: &str) -> Option<Vec<String>> {
    let span = section_after(text, &SKILL_SECTION, &SKILL_SECTION_END)?;
    // Site navigation follows the skills when the employer block is absent
    let span = SKILL_FOOTER.find(span).map_or(span, |m| &span[..m.start()]);
    let candidates = span
        .split([',', '\n', '\r'])
        .map(|piece| WHITESPACE.replace_all(piece, " ").into_owned());
    non_empty(clean_skills(candidates))
}

/// Drops blanks, very short strings, and footer leakage
fn clean_skills<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let skill = candidate.as_ref().trim();
            let keep = skill.chars().count() > MIN_SKILL_CHARS
                && !skill.to_lowercase().contains("copyright");
            keep.then(|| skill.to_string())
        })
        .collect()
}

/// Splits text where a lowercase letter runs straight into a capitalized
/// word, e.g. `Data EntryCopywriting`
fn split_concatenated_labels(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let boundary = i > 0
            && chars[i - 1].is_ascii_lowercase()
            && c.is_ascii_uppercase()
            && chars.get(i + 1).is_some_and(|next| next.is_ascii_lowercase());
        if boundary {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    pieces.push(current);
    pieces
}

/// Value following a label on the same line (or the next non-blank line)
fn labeled_line(text: &str, label: &Regex) -> Option<String> {
    let value = label.captures(text)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Text after `label` up to the first `end` match, or to the end of the text
fn section_after<'t>(text: &'t str, label: &Regex, end: &Regex) -> Option<&'t str> {
    let start = label.find(text)?.end();
    let rest = &text[start..];
    let stop = end.find(rest).map_or(rest.len(), |m| m.start());
    let section = rest[..stop].trim();
    (!section.is_empty()).then_some(section)
}

/// Concatenated text of the document in document order, without script and
/// style contents
fn flatten_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|element| matches!(element.name(), "script" | "style" | "noscript"));
        if !hidden {
            text.push_str(fragment);
        }
    }
    text
}

/// Trimmed text fragments of an element joined with `separator`
fn element_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
