//! YAML metadata describing a conference: details, papers, committees, workshops.
//!
//! Each input lives in `<root>/<name>.yml`. Records the pipeline only forwards to the
//! render context are kept as loose JSON maps; the fields it actually reads are typed.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::latex::{normalize_latex_string, normalize_string_fields};

/// Loose string-keyed record, used for conference details and pass-through inputs.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{name} is a required configuration but {} was not found", path.display())]
    Missing { name: String, path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("conference field '{field}' is missing")]
    MissingField { field: &'static str },
    #[error("conference field '{field}' has invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },
}

/// Identifier of a paper or workshop; submission systems emit both numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(value) => write!(f, "{value}"),
            RecordId::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(flatten)]
    pub extra: Record,
}

impl Author {
    /// Name as printed in the author index: `Last, First Middle`.
    pub fn index_name(&self) -> String {
        let mut given = self.first_name.clone();
        if let Some(middle) = self.middle_name.as_deref().filter(|m| !m.trim().is_empty()) {
            given.push(' ');
            given.push_str(middle);
        }
        format!("{}, {}", self.last_name, given)
    }

    /// Email cell for spreadsheets; lists are joined with commas.
    pub fn emails(&self) -> String {
        match self.extra.get("emails") {
            Some(Value::String(email)) => email.clone(),
            Some(Value::Array(emails)) => emails
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<u32>,
    #[serde(
        default,
        rename = "abstract",
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<String>,
    /// First and last page in the assembled volume, filled in by the paper catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<(u32, u32)>,
    #[serde(flatten)]
    pub extra: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeBlock {
    pub role: String,
    #[serde(default)]
    pub entries: Vec<Record>,
    #[serde(flatten)]
    pub extra: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workshop {
    pub id: RecordId,
    pub date: String,
    #[serde(flatten)]
    pub extra: Record,
}

/// Path of the YAML file backing a named input.
pub fn input_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.yml"))
}

/// Load `<root>/<name>.yml`.
///
/// A missing file yields `Ok(None)` unless `required` is set. An empty file is treated
/// the same as a missing optional one.
pub fn load_yaml<T: DeserializeOwned>(
    name: &str,
    root: &Path,
    required: bool,
) -> Result<Option<T>, MetadataError> {
    let path = input_path(root, name);
    if !path.exists() {
        if required {
            return Err(MetadataError::Missing {
                name: name.to_string(),
                path,
            });
        }
        debug!(input = name, "optional input not present");
        return Ok(None);
    }

    let raw = fs::read_to_string(&path).map_err(|source| MetadataError::Read {
        path: path.clone(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value = serde_yaml::from_str(&raw).map_err(|source| MetadataError::Parse {
        path: path.clone(),
        source,
    })?;
    debug!(input = name, path = %path.display(), "loaded input");
    Ok(Some(value))
}

/// Like [`load_yaml`] with `required = true`, unwrapping the option.
pub fn load_required<T: DeserializeOwned>(name: &str, root: &Path) -> Result<T, MetadataError> {
    load_yaml(name, root, true)?.ok_or_else(|| MetadataError::Missing {
        name: name.to_string(),
        path: input_path(root, name),
    })
}

pub fn normalize_conference(conference: &mut Record) {
    normalize_string_fields(conference);
}

pub fn normalize_paper_titles(papers: &mut [Paper]) {
    for paper in papers {
        paper.title = normalize_latex_string(&paper.title);
    }
}

/// Normalize every string field of every committee entry.
///
/// Entries holding non-string values are reported and left as they are.
pub fn normalize_committee(blocks: &mut [CommitteeBlock]) {
    for block in blocks {
        for entry in &mut block.entries {
            if entry
                .values()
                .any(|value| !matches!(value, Value::String(_) | Value::Null))
            {
                let shown = Value::Object(entry.clone());
                warn!(
                    role = %block.role,
                    entry = %shown,
                    "program committee entry is ill-formed"
                );
            }
            normalize_string_fields(entry);
        }
    }
}

/// Read a `YYYY-MM-DD` field from the conference details.
pub fn conference_date(conference: &Record, field: &'static str) -> Result<NaiveDate, MetadataError> {
    let value = conference
        .get(field)
        .ok_or(MetadataError::MissingField { field })?;
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    };
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map_err(|_| MetadataError::InvalidDate { field, value: text })
}

/// Human-readable span of the conference, e.g. `January 1-2`.
pub fn conference_dates(start: NaiveDate, end: NaiveDate) -> String {
    let start_month = start.format("%B");
    let end_month = end.format("%B");
    if start.month() == end.month() {
        if start.day() == end.day() {
            return format!("{} {}", start_month, start.day());
        }
        return format!("{} {}-{}", start_month, start.day(), end.day());
    }
    format!(
        "{} {} - {} {}",
        start_month,
        start.day(),
        end_month,
        end.day()
    )
}

/// [`conference_dates`] over the `start_date`/`end_date` fields of the details record.
pub fn conference_date_range(conference: &Record) -> Result<String, MetadataError> {
    let start = conference_date(conference, "start_date")?;
    let end = conference_date(conference, "end_date")?;
    Ok(conference_dates(start, end))
}

/// Distinct workshop dates in first-seen order.
pub fn workshop_days(workshops: &[Workshop]) -> Vec<String> {
    let mut days: Vec<String> = Vec::new();
    for workshop in workshops {
        if !days.contains(&workshop.date) {
            days.push(workshop.date.clone());
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn conference_dates_single_day() {
        assert_eq!(conference_dates(date(2020, 1, 1), date(2020, 1, 1)), "January 1");
    }

    #[test]
    fn conference_dates_same_month() {
        assert_eq!(
            conference_dates(date(2020, 1, 1), date(2020, 1, 2)),
            "January 1-2"
        );
    }

    #[test]
    fn conference_dates_across_months() {
        assert_eq!(
            conference_dates(date(2020, 1, 1), date(2020, 2, 2)),
            "January 1 - February 2"
        );
    }

    #[test]
    fn conference_date_range_reads_yaml_dates() {
        let conference: Record =
            serde_yaml::from_str("start_date: 2022-05-22\nend_date: 2022-05-27\n").unwrap();
        assert_eq!(conference_date_range(&conference).unwrap(), "May 22-27");
    }

    #[test]
    fn conference_date_rejects_garbage() {
        let conference: Record = serde_yaml::from_str("start_date: XXXX-XX-XX\n").unwrap();
        let err = conference_date(&conference, "start_date").unwrap_err();
        assert!(matches!(err, MetadataError::InvalidDate { field: "start_date", .. }));
        let err = conference_date(&conference, "end_date").unwrap_err();
        assert!(matches!(err, MetadataError::MissingField { field: "end_date" }));
    }

    #[test]
    fn load_yaml_handles_missing_and_empty_files() {
        let temp = tempdir().expect("tempdir");
        let missing: Option<Vec<Paper>> = load_yaml("papers", temp.path(), false).unwrap();
        assert!(missing.is_none());

        let err = load_yaml::<Vec<Paper>>("papers", temp.path(), true).unwrap_err();
        assert!(matches!(err, MetadataError::Missing { .. }));

        fs::write(temp.path().join("sponsors.yml"), "\n").unwrap();
        let empty: Option<Vec<Record>> = load_yaml("sponsors", temp.path(), false).unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn papers_accept_numeric_and_string_ids() {
        let papers: Vec<Paper> = serde_yaml::from_str(
            r#"
- id: 12
  title: Numbers
  file: 12.pdf
  authors:
    - first_name: Ada
      last_name: Lovelace
      emails: ada@example.org
- id: "main-7"
  title: Strings
  decision: Accept
"#,
        )
        .unwrap();
        assert_eq!(papers[0].id, RecordId::Number(12));
        assert_eq!(papers[0].authors[0].emails(), "ada@example.org");
        assert_eq!(papers[1].id.to_string(), "main-7");
        assert_eq!(papers[1].extra["decision"], Value::String("Accept".into()));
    }

    #[test]
    fn index_name_includes_middle_name() {
        let author = Author {
            first_name: "John".into(),
            middle_name: Some("Ronald".into()),
            last_name: "Tolkien".into(),
            extra: Record::new(),
        };
        assert_eq!(author.index_name(), "Tolkien, John Ronald");
    }

    #[test]
    fn committee_entries_are_normalized_even_when_ill_formed() {
        let mut blocks: Vec<CommitteeBlock> = serde_yaml::from_str(
            r#"
- role: Program Chairs
  entries:
    - { first_name: Ada, last_name: Love_lace, institution: R&D Lab }
    - { first_name: Alan, last_name: Turing, seats: 2 }
"#,
        )
        .unwrap();

        normalize_committee(&mut blocks);

        let entries = &blocks[0].entries;
        assert_eq!(entries[0]["last_name"], Value::String("Love\\_lace".into()));
        assert_eq!(entries[0]["institution"], Value::String("R\\&D Lab".into()));
        assert_eq!(entries[1]["seats"], serde_json::json!(2));
        assert_eq!(entries[1]["last_name"], Value::String("Turing".into()));
    }

    #[test]
    fn workshop_days_keep_first_seen_order() {
        let workshops: Vec<Workshop> = serde_yaml::from_str(
            r#"
- { id: 1, date: "May 26" }
- { id: 2, date: "May 27" }
- { id: 3, date: "May 26" }
"#,
        )
        .unwrap();
        assert_eq!(workshop_days(&workshops), vec!["May 26", "May 27"]);
    }
}
