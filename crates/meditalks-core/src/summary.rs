//! Structured parsing of document-summary responses.
//!
//! The parser is a two-state machine over lines:
//!
//! - `ScanningProse`: no header seen yet. Lines collect into a preamble that
//!   becomes a "General" section if it is non-empty.
//! - `InsideSection`: lines attach to the most recent header's section.
//!
//! Blank lines are ignored in both states. A header line always closes the
//! current section and opens a new one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Title used when a response has no recognizable headers.
pub const GENERAL_SECTION: &str = "General";

const MAX_HEADER_CHARS: usize = 60;
const MAX_HEADER_WORDS: usize = 8;

/// The section headers prompts request and the parser recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryHeaders(Vec<String>);

impl Default for SummaryHeaders {
    fn default() -> Self {
        Self(
            [
                "DOCUMENT SUMMARY",
                "KEY MEDICAL INFORMATION",
                "IMPORTANT INSTRUCTIONS",
                "FOLLOW-UP CARE",
                "PATIENT GUIDANCE",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        )
    }
}

impl SummaryHeaders {
    /// Build a header set, dropping blank entries. Falls back to the defaults
    /// when nothing is left.
    pub fn new(headers: Vec<String>) -> Self {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        if headers.is_empty() {
            Self::default()
        } else {
            Self(headers)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    fn matches(&self, candidate: &str) -> bool {
        self.0.iter().any(|h| h.eq_ignore_ascii_case(candidate))
    }
}

/// A span of text, flagged when the model emphasized it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRun {
    pub text: String,
    pub emphasized: bool,
}

/// One line of section content as a run sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Line(pub Vec<TextRun>);

impl Line {
    /// The line's text with emphasis markers removed.
    pub fn plain_text(&self) -> String {
        self.0.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub bullet_lines: Vec<Line>,
    pub prose_lines: Vec<Line>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bullet_lines: Vec::new(),
            prose_lines: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.bullet_lines.is_empty() && self.prose_lines.is_empty()
    }

    fn push(&mut self, content: LineKind) {
        match content {
            LineKind::Bullet(text) => self.bullet_lines.push(parse_runs(text)),
            LineKind::Prose(text) => self.prose_lines.push(parse_runs(text)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StructuredSummary {
    pub sections: Vec<Section>,
}

impl StructuredSummary {
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.title.eq_ignore_ascii_case(title))
    }
}

enum LineKind<'a> {
    Bullet(&'a str),
    Prose(&'a str),
}

enum State {
    ScanningProse { preamble: Section },
    InsideSection { current: Section },
}

/// Splits a raw summary response into titled sections.
#[derive(Debug, Clone, Default)]
pub struct SummaryParser {
    headers: SummaryHeaders,
}

impl SummaryParser {
    pub fn new(headers: SummaryHeaders) -> Self {
        Self { headers }
    }

    pub fn parse(&self, raw_response: &str) -> Result<StructuredSummary, ParseError> {
        if raw_response.trim().is_empty() {
            return Err(ParseError::EmptyResponse);
        }

        let mut sections = Vec::new();
        let mut state = State::ScanningProse {
            preamble: Section::new(GENERAL_SECTION),
        };

        for raw_line in raw_response.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(title) = self.header_title(line) {
                match state {
                    State::ScanningProse { preamble } => {
                        if !preamble.is_empty() {
                            sections.push(preamble);
                        }
                    }
                    State::InsideSection { current } => sections.push(current),
                }
                state = State::InsideSection {
                    current: Section::new(title),
                };
                continue;
            }

            let content = classify(line);
            match &mut state {
                State::ScanningProse { preamble } => preamble.push(content),
                State::InsideSection { current } => current.push(content),
            }
        }

        match state {
            State::ScanningProse { preamble } => sections.push(preamble),
            State::InsideSection { current } => sections.push(current),
        }

        Ok(StructuredSummary { sections })
    }

    /// Return the header title if `line` is a section header.
    ///
    /// A numbered line is a list item unless its text is a configured header.
    fn header_title(&self, line: &str) -> Option<String> {
        let numbered = NUMBERED.is_match(line);
        if bullet_body(line).is_some() && !numbered {
            return None;
        }

        let mut text = line;
        let mut marked = false;

        let without_hashes = text.trim_start_matches('#');
        if without_hashes.len() != text.len() {
            marked = true;
            text = without_hashes.trim_start();
        }

        if let Some(m) = NUMBERED.find(text) {
            text = &text[m.end()..];
        }

        if let Some(inner) = strip_wrapping_emphasis(text) {
            marked = true;
            text = inner;
        }

        // "**Title:**" and "**Title**:" both reduce to "Title".
        let title = text.trim().trim_end_matches(':').trim();
        let title = strip_wrapping_emphasis(title).unwrap_or(title).trim();

        if title.is_empty()
            || title.chars().count() > MAX_HEADER_CHARS
            || title.split_whitespace().count() > MAX_HEADER_WORDS
            || title.contains("**")
        {
            return None;
        }

        if numbered {
            return self.headers.matches(title).then(|| title.to_string());
        }
        if marked || is_upper_case(title) || self.headers.matches(title) {
            Some(title.to_string())
        } else {
            None
        }
    }
}

static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}[.)]\s+").unwrap());

fn classify(line: &str) -> LineKind<'_> {
    match bullet_body(line) {
        Some(body) => LineKind::Bullet(body),
        None => LineKind::Prose(line),
    }
}

/// The text after a bullet marker, if the line starts with one.
fn bullet_body(line: &str) -> Option<&str> {
    for marker in ['-', '*', '•', '+'] {
        if let Some(rest) = line.strip_prefix(marker) {
            if rest.starts_with(char::is_whitespace) {
                return Some(rest.trim_start());
            }
        }
    }
    NUMBERED.find(line).map(|m| line[m.end()..].trim_start())
}

/// `**text**` or `__text__` covering the whole string.
fn strip_wrapping_emphasis(text: &str) -> Option<&str> {
    for marker in ["**", "__"] {
        if let Some(inner) = text
            .strip_prefix(marker)
            .and_then(|rest| rest.strip_suffix(marker))
        {
            if !inner.trim().is_empty() {
                return Some(inner.trim());
            }
        }
    }
    None
}

/// Has cased letters and none of them lower-case. Scripts without case
/// (Thai, Khmer) never qualify.
fn is_upper_case(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// Split a line into runs on `**`/`__` emphasis pairs. An unmatched marker
/// is kept as literal text.
fn parse_runs(text: &str) -> Line {
    let mut runs = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let next = ["**", "__"]
            .iter()
            .filter_map(|m| rest.find(m).map(|i| (i, *m)))
            .min_by_key(|(i, _)| *i);

        let Some((start, marker)) = next else {
            push_run(&mut runs, rest, false);
            break;
        };

        let after_open = &rest[start + marker.len()..];
        match after_open.find(marker) {
            Some(len) if len > 0 => {
                push_run(&mut runs, &rest[..start], false);
                push_run(&mut runs, &after_open[..len], true);
                rest = &after_open[len + marker.len()..];
            }
            _ => {
                push_run(&mut runs, &rest[..start + marker.len()], false);
                rest = after_open;
            }
        }
    }

    Line(runs)
}

fn push_run(runs: &mut Vec<TextRun>, text: &str, emphasized: bool) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = runs.last_mut() {
        if last.emphasized == emphasized {
            last.text.push_str(text);
            return;
        }
    }
    runs.push(TextRun {
        text: text.to_string(),
        emphasized,
    });
}
