//! Structured Extractor
//!
//! Splits a raw provider reply into the three contract sections and parses
//! the JSON sections into result items. Everything here is pure: the same
//! input always produces the same output.

use insightflow_core::{Insight, InsightType, Level, Recommendation, FALLBACK_METADATA_KEY};
use insightflow_llm::provider::extract_thinking;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::prompts::{INSIGHTS_MARKER, RECOMMENDATIONS_MARKER, SUMMARY_MARKER};

/// Upper bound on insights kept from one reply
pub const MAX_INSIGHTS: usize = 20;
/// Upper bound on recommendations kept from one reply
pub const MAX_RECOMMENDATIONS: usize = 10;

/// Candidate JSON starts tried per section before giving up
const MAX_JSON_CANDIDATES: usize = 16;

/// One of the three sections of the prompt contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Summary,
    Insights,
    Recommendations,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Summary => "summary",
            Section::Insights => "insights",
            Section::Recommendations => "recommendations",
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            Section::Summary => SUMMARY_MARKER,
            Section::Insights => INSIGHTS_MARKER,
            Section::Recommendations => RECOMMENDATIONS_MARKER,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text of each section; `None` when the marker was absent or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSections {
    pub summary: Option<String>,
    pub insights_json: Option<String>,
    pub recommendations_json: Option<String>,
}

/// Why a section could not be turned into items
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    #[error("section missing")]
    Missing,
    #[error("no JSON found in section")]
    NoJson,
    #[error("malformed JSON: {0}")]
    Malformed(String),
    #[error("JSON is neither a list nor an object")]
    NotAList,
    #[error("no usable items in section")]
    Empty,
}

impl SectionError {
    /// Short class name for logs
    pub fn class(&self) -> &'static str {
        match self {
            SectionError::Missing => "missing",
            SectionError::NoJson => "no_json",
            SectionError::Malformed(_) => "malformed_json",
            SectionError::NotAList => "not_a_list",
            SectionError::Empty => "empty",
        }
    }
}

/// Split a reply into its sections.
///
/// `<think>` blocks are dropped first. A marker is recognised at the start of
/// a line, optionally decorated with markdown (`## INSIGHTS:`,
/// `**SUMMARY:**`); failing that, its first literal occurrence outside a JSON
/// string is used. Each section runs until the next marker or the end of the
/// text.
pub fn extract(raw: &str) -> ParsedSections {
    let (_, visible) = extract_thinking(raw);
    let text = visible.unwrap_or_default();

    let mut found: Vec<(Section, usize, usize)> = [
        Section::Summary,
        Section::Insights,
        Section::Recommendations,
    ]
    .into_iter()
    .filter_map(|section| {
        locate_marker(&text, section.marker()).map(|(start, body)| (section, start, body))
    })
    .collect();
    found.sort_by_key(|&(_, start, _)| start);

    let mut sections = ParsedSections::default();
    for (i, &(section, _, body_start)) in found.iter().enumerate() {
        let end = found.get(i + 1).map_or(text.len(), |&(_, start, _)| start);
        if body_start > end {
            continue;
        }
        let body = text[body_start..end].trim();
        if body.is_empty() {
            continue;
        }
        let body = Some(body.to_string());
        match section {
            Section::Summary => sections.summary = body,
            Section::Insights => sections.insights_json = body,
            Section::Recommendations => sections.recommendations_json = body,
        }
    }
    sections
}

/// Returns `(marker_start, body_start)` byte offsets.
fn locate_marker(text: &str, marker: &str) -> Option<(usize, usize)> {
    let word = marker.trim_end_matches(':');
    let is_decoration = |c: char| c == '*' || c == '_';

    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let stripped = line.trim_start_matches(|c: char| {
            c.is_whitespace() || matches!(c, '#' | '*' | '_' | '>' | '-')
        });
        if let Some(rest) = stripped.strip_prefix(word) {
            if let Some(after_colon) = rest.trim_start_matches(is_decoration).strip_prefix(':') {
                let body = after_colon.trim_start_matches(is_decoration);
                return Some((offset, offset + line.len() - body.len()));
            }
        }
        offset += line.len();
    }

    text.match_indices(marker)
        .find(|&(pos, _)| !inside_json_string(text, pos))
        .map(|(pos, _)| (pos, pos + marker.len()))
}

/// Whether `pos` falls inside a string literal of a bracketed JSON block.
/// Quotes in surrounding prose are not tracked.
fn inside_json_string(text: &str, pos: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;
    for (i, ch) in text.char_indices() {
        if i >= pos {
            break;
        }
        if depth == 0 {
            if ch == '[' || ch == '{' {
                depth = 1;
            }
            continue;
        }
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match ch {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    in_string
}

/// Remove a surrounding markdown code fence, including its language tag.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

/// Locate the first balanced JSON array or object in `text`.
///
/// A fenced block anywhere in the text is preferred over surrounding prose.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let scope = fenced_body(text).unwrap_or(text);
    let start = scope.find(|c| c == '[' || c == '{')?;
    balanced_block(&scope[start..])
}

fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = match after.find('\n') {
        Some(nl) => nl + 1,
        None => after.len() - after.trim_start_matches(|c: char| c.is_ascii_alphanumeric()).len(),
    };
    let body = &after[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

/// `candidate` must start with `[` or `{`.
fn balanced_block(candidate: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, ch) in candidate.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&candidate[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the first JSON value in a section, skipping bracketed prose such as
/// "[see below]" that precedes the real payload.
fn parse_json_section(section: &str) -> Result<Value, SectionError> {
    let scope = fenced_body(section).unwrap_or(section);
    let mut last_error = None;
    // End of the last block that failed to parse; values nested in it are
    // fragments of a broken payload, not the payload itself.
    let mut skip_until = 0;

    let candidates = scope
        .char_indices()
        .filter(|&(_, c)| c == '[' || c == '{')
        .map(|(i, _)| i);
    for start in candidates.take(MAX_JSON_CANDIDATES) {
        if start < skip_until {
            continue;
        }
        let Some(block) = balanced_block(&scope[start..]) else {
            continue;
        };
        match serde_json::from_str::<Value>(block) {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_error = Some(e.to_string());
                skip_until = start + block.len();
            }
        }
    }

    Err(last_error.map_or(SectionError::NoJson, SectionError::Malformed))
}

/// Coerce a parsed value into a list of items. A lone object becomes a
/// one-element list unless it merely wraps the list under `wrapper_key`.
fn into_items(value: Value, wrapper_key: &str) -> Result<Vec<Value>, SectionError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            if matches!(map.get(wrapper_key), Some(Value::Array(_))) {
                if let Some(Value::Array(items)) = map.remove(wrapper_key) {
                    return Ok(items);
                }
            }
            Ok(vec![Value::Object(map)])
        }
        _ => Err(SectionError::NotAList),
    }
}

#[derive(Debug, Deserialize)]
struct RawInsight {
    #[serde(default, rename = "type", alias = "insight_type", alias = "insightType")]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "description")]
    content: Option<String>,
    #[serde(default, alias = "confidenceScore", alias = "confidence")]
    confidence_score: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "content")]
    description: Option<String>,
    #[serde(default)]
    impact: Option<String>,
    #[serde(default)]
    effort: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    details: Option<Value>,
    #[serde(default, alias = "actionSteps", alias = "steps")]
    action_steps: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Parse the INSIGHTS section. Items that are not objects or carry neither a
/// title nor content are skipped.
pub fn parse_insights(section: &str) -> Result<Vec<Insight>, SectionError> {
    let items = into_items(parse_json_section(section)?, "insights")?;
    let insights: Vec<Insight> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawInsight>(item).ok())
        .filter_map(insight_from_raw)
        .take(MAX_INSIGHTS)
        .collect();

    if insights.is_empty() {
        Err(SectionError::Empty)
    } else {
        Ok(insights)
    }
}

/// Parse the RECOMMENDATIONS section.
pub fn parse_recommendations(section: &str) -> Result<Vec<Recommendation>, SectionError> {
    let items = into_items(parse_json_section(section)?, "recommendations")?;
    let recommendations: Vec<Recommendation> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawRecommendation>(item).ok())
        .filter_map(recommendation_from_raw)
        .take(MAX_RECOMMENDATIONS)
        .collect();

    if recommendations.is_empty() {
        Err(SectionError::Empty)
    } else {
        Ok(recommendations)
    }
}

/// Clean the SUMMARY section text.
pub fn parse_summary(section: &str) -> Option<String> {
    let text = strip_code_fences(section).trim_matches('"').trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn insight_from_raw(raw: RawInsight) -> Option<Insight> {
    let (title, content) = title_and_body(raw.title, raw.content)?;
    let insight_type = raw
        .kind
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(InsightType::from)
        .unwrap_or(InsightType::Summary);

    let mut insight = Insight::new(insight_type, title, content);
    insight.confidence_score = raw.confidence_score.as_ref().and_then(parse_confidence);
    insight.metadata = provider_metadata(raw.metadata);
    Some(insight)
}

fn recommendation_from_raw(raw: RawRecommendation) -> Option<Recommendation> {
    let (title, description) = title_and_body(raw.title, raw.description)?;
    let mut rec = Recommendation::new(title, description);

    rec.id = match raw.id {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    rec.impact = raw.impact.as_deref().and_then(Level::parse).unwrap_or_default();
    rec.effort = raw.effort.as_deref().and_then(Level::parse).unwrap_or_default();
    rec.category = raw
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "general".to_string());
    rec.details = match raw.details {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Null) | Some(Value::String(_)) | None => None,
        Some(other) => Some(other.to_string()),
    };
    rec.action_steps = raw.action_steps.and_then(parse_action_steps);
    rec.metadata = provider_metadata(raw.metadata);
    Some(rec)
}

/// Fill a missing title from the body and vice versa; `None` if both are blank.
fn title_and_body(title: Option<String>, body: Option<String>) -> Option<(String, String)> {
    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let body = body.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());
    match (title, body) {
        (Some(t), Some(b)) => Some((t, b)),
        (Some(t), None) => Some((t.clone(), t)),
        (None, Some(b)) => Some((headline(&b), b)),
        (None, None) => None,
    }
}

fn headline(body: &str) -> String {
    const MAX_CHARS: usize = 80;
    let first = body.lines().next().unwrap_or(body).trim();
    if first.chars().count() <= MAX_CHARS {
        first.to_string()
    } else {
        let cut: String = first.chars().take(MAX_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Accepts `0.85`, `85`, `"85%"` and `"0.85"`; percentages are scaled to [0, 1].
fn parse_confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    if raw > 1.0 && raw <= 100.0 {
        Some(raw / 100.0)
    } else {
        Some(raw)
    }
}

fn parse_action_steps(value: Value) -> Option<Vec<String>> {
    let steps: Vec<String> = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*']).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    (!steps.is_empty()).then_some(steps)
}

/// Provider metadata is kept, except that it may not claim fallback origin.
fn provider_metadata(value: Option<Value>) -> serde_json::Map<String, Value> {
    match value {
        Some(Value::Object(mut map)) => {
            map.remove(FALLBACK_METADATA_KEY);
            map
        }
        _ => serde_json::Map::new(),
    }
}
