//! Program layout: date grouping and page splitting for session schedules.
//!
//! Raw `program.yml` records are converted into typed [`ProgramEntry`] values first;
//! every schema problem surfaces there as a [`ProgramError`]. Pagination over typed
//! entries cannot fail.
//!
//! Page splitting is a greedy fill against a heuristic line budget: each row is
//! appended to the current page and, once the running total reaches `max_lines`, the
//! page is closed. Rows are never split and capacity is only checked after a row has
//! been placed, so a page may run over by at most one row.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::latex::normalize_latex_string;
use crate::metadata::RecordId;

pub const DEFAULT_PROCEEDINGS_MAX_LINES: u32 = 35;
pub const DEFAULT_HANDBOOK_MAX_LINES: u32 = 350;
pub const DEFAULT_PAPER_MEDIAN_LINES: u32 = 3;
pub const DEFAULT_HEADER_LINES: u32 = 2;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("session '{title}' is missing required field '{field}'")]
    MissingField { title: String, field: &'static str },
    #[error("session at position {index} has no title")]
    MissingTitle { index: usize },
    #[error("session '{title}' has invalid {field} '{value}'")]
    InvalidTimestamp {
        title: String,
        field: &'static str,
        value: String,
    },
    #[error("subsession '{title}' declares its own subsessions; only one level of nesting is supported")]
    NestedSubsessions { title: String },
}

/// Session record exactly as it appears in a program file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub subsessions: Option<Vec<SessionRecord>>,
    #[serde(default)]
    pub papers: Option<Vec<MemberRef>>,
    #[serde(default)]
    pub tutorials: Option<Vec<MemberRef>>,
}

/// A paper or tutorial listed under a session: either a bare id or an inline record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberRef {
    Id(RecordId),
    Record(Map<String, Value>),
}

/// A schedulable leaf session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub papers: Vec<MemberRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tutorials: Vec<MemberRef>,
}

/// Wrapper session; only its subsessions are laid out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionGroup {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveDateTime>,
    pub subsessions: Vec<Session>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProgramEntry {
    Session(Session),
    Group(SessionGroup),
}

impl ProgramEntry {
    /// Start used when the entry itself is listed by date; groups without their own
    /// start fall back to their first subsession.
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        match self {
            ProgramEntry::Session(session) => Some(session.start_time),
            ProgramEntry::Group(group) => group
                .start_time
                .or_else(|| group.subsessions.first().map(|s| s.start_time)),
        }
    }

    /// The leaf sessions this entry contributes to a paginated layout.
    pub fn leaves(&self) -> &[Session] {
        match self {
            ProgramEntry::Session(session) => std::slice::from_ref(session),
            ProgramEntry::Group(group) => &group.subsessions,
        }
    }
}

/// One renderable line of the laid-out program.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Row {
    Header {
        title: String,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    },
    Paper {
        paper: MemberRef,
    },
    Tutorial {
        paper: MemberRef,
    },
}

pub type Page = Vec<Row>;

/// All pages laid out for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatePages {
    pub date: NaiveDate,
    pub pages: Vec<Page>,
}

/// All top-level entries starting on one calendar date (handbook listing).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSessions {
    pub date: NaiveDate,
    pub sessions: Vec<ProgramEntry>,
}

/// Heuristic line costs and page capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBudget {
    pub max_lines: u32,
    pub paper_median_lines: u32,
    pub header_lines: u32,
}

impl Default for PageBudget {
    fn default() -> Self {
        Self::with_max_lines(DEFAULT_PROCEEDINGS_MAX_LINES)
    }
}

impl PageBudget {
    pub const fn with_max_lines(max_lines: u32) -> Self {
        Self {
            max_lines,
            paper_median_lines: DEFAULT_PAPER_MEDIAN_LINES,
            header_lines: DEFAULT_HEADER_LINES,
        }
    }

    pub const fn cost(&self, row: &Row) -> u32 {
        match row {
            Row::Header { .. } => self.header_lines,
            Row::Paper { .. } | Row::Tutorial { .. } => self.paper_median_lines,
        }
    }
}

/// Convert raw records into typed entries, normalizing titles for LaTeX.
pub fn parse_program(records: Vec<SessionRecord>) -> Result<Vec<ProgramEntry>, ProgramError> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| parse_entry(index, record))
        .collect()
}

fn parse_entry(index: usize, record: SessionRecord) -> Result<ProgramEntry, ProgramError> {
    let title = record
        .title
        .as_deref()
        .map(normalize_latex_string)
        .ok_or(ProgramError::MissingTitle { index })?;

    let Some(subsessions) = record.subsessions else {
        return parse_leaf(title, record.start_time, record.end_time, record.papers, record.tutorials)
            .map(ProgramEntry::Session);
    };

    let start_time = record
        .start_time
        .as_deref()
        .map(|value| parse_field(&title, "start_time", value))
        .transpose()?;
    let end_time = record
        .end_time
        .as_deref()
        .map(|value| parse_field(&title, "end_time", value))
        .transpose()?;

    let subsessions = subsessions
        .into_iter()
        .enumerate()
        .map(|(position, child)| {
            let child_title = child
                .title
                .as_deref()
                .map(normalize_latex_string)
                .ok_or_else(|| ProgramError::MissingField {
                    title: format!("{title} (subsession {})", position + 1),
                    field: "title",
                })?;
            if child.subsessions.as_ref().is_some_and(|nested| !nested.is_empty()) {
                return Err(ProgramError::NestedSubsessions { title: child_title });
            }
            parse_leaf(
                child_title,
                child.start_time,
                child.end_time,
                child.papers,
                child.tutorials,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProgramEntry::Group(SessionGroup {
        title,
        start_time,
        end_time,
        subsessions,
    }))
}

fn parse_leaf(
    title: String,
    start_time: Option<String>,
    end_time: Option<String>,
    papers: Option<Vec<MemberRef>>,
    tutorials: Option<Vec<MemberRef>>,
) -> Result<Session, ProgramError> {
    let start_time = required_timestamp(&title, "start_time", start_time)?;
    let end_time = required_timestamp(&title, "end_time", end_time)?;
    Ok(Session {
        title,
        start_time,
        end_time,
        papers: papers.unwrap_or_default(),
        tutorials: tutorials.unwrap_or_default(),
    })
}

fn required_timestamp(
    title: &str,
    field: &'static str,
    value: Option<String>,
) -> Result<NaiveDateTime, ProgramError> {
    let value = value.ok_or_else(|| ProgramError::MissingField {
        title: title.to_string(),
        field,
    })?;
    parse_field(title, field, &value)
}

fn parse_field(title: &str, field: &'static str, value: &str) -> Result<NaiveDateTime, ProgramError> {
    parse_timestamp(value).ok_or_else(|| ProgramError::InvalidTimestamp {
        title: title.to_string(),
        field,
        value: value.to_string(),
    })
}

/// Parse the timestamp spellings found in program files.
///
/// Offsets are dropped: the wall-clock time printed in the program is what matters.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S %:z"] {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Some(parsed.naive_local());
        }
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Header row followed by one row per paper and per tutorial.
pub fn session_rows(session: &Session) -> impl Iterator<Item = Row> + '_ {
    let header = Row::Header {
        title: session.title.clone(),
        start_time: session.start_time,
        end_time: session.end_time,
    };
    std::iter::once(header)
        .chain(session.papers.iter().map(|paper| Row::Paper {
            paper: paper.clone(),
        }))
        .chain(session.tutorials.iter().map(|tutorial| Row::Tutorial {
            paper: tutorial.clone(),
        }))
}

/// Greedily split rows into pages. The trailing page is always emitted, even when empty.
pub fn split_pages<I>(rows: I, budget: PageBudget) -> Vec<Page>
where
    I: IntoIterator<Item = Row>,
{
    let mut pages = Vec::new();
    let (_, last) = rows
        .into_iter()
        .fold((0u32, Page::new()), |(total, mut page), row| {
            let total = total.saturating_add(budget.cost(&row));
            page.push(row);
            if total >= budget.max_lines {
                pages.push(page);
                (0, Page::new())
            } else {
                (total, page)
            }
        });
    pages.push(last);
    pages
}

/// Expand groups into their subsessions and bucket the leaves by start date,
/// keeping encounter order inside each date.
pub fn leaves_by_date(entries: &[ProgramEntry]) -> BTreeMap<NaiveDate, Vec<&Session>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&Session>> = BTreeMap::new();
    for session in entries.iter().flat_map(ProgramEntry::leaves) {
        by_date
            .entry(session.start_time.date())
            .or_default()
            .push(session);
    }
    by_date
}

/// Lay out a program: one independent page sequence per date, dates ascending.
pub fn paginate(entries: &[ProgramEntry], budget: PageBudget) -> Vec<DatePages> {
    leaves_by_date(entries)
        .into_iter()
        .map(|(date, sessions)| DatePages {
            date,
            pages: split_pages(sessions.into_iter().flat_map(session_rows), budget),
        })
        .collect()
}

/// Group top-level entries by start date without any pagination.
pub fn group_by_date(entries: &[ProgramEntry]) -> Vec<DateSessions> {
    let mut by_date: BTreeMap<NaiveDate, Vec<ProgramEntry>> = BTreeMap::new();
    for entry in entries {
        if let Some(start) = entry.start_time() {
            by_date.entry(start.date()).or_default().push(entry.clone());
        }
    }
    by_date
        .into_iter()
        .map(|(date, sessions)| DateSessions { date, sessions })
        .collect()
}
