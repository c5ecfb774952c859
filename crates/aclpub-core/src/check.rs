//! Sanity checks for `conference_details.yml`.

use serde_json::Value;

use crate::metadata::Record;

pub const REQUIRED_CONFERENCE_FIELDS: &[&str] = &[
    "book_title",
    "event_name",
    "cover_subtitle",
    "anthology_venue_id",
    "start_date",
    "end_date",
    "isbn",
    "location",
    "editors",
    "publisher",
    "volume_name",
];

/// Every problem found in the conference details; empty when the file looks usable.
pub fn check_conference(conference: &Record) -> Vec<String> {
    let mut findings = check_required_conference_fields(conference);
    findings.extend(check_latex_escapes(conference));
    findings
}

pub fn check_required_conference_fields(conference: &Record) -> Vec<String> {
    let mut findings: Vec<String> = REQUIRED_CONFERENCE_FIELDS
        .iter()
        .filter(|field| !conference.contains_key(**field))
        .map(|field| {
            format!("The input file conference_details.yml does not contain the '{field}' field.")
        })
        .collect();

    match conference.get("editors") {
        None => {}
        Some(Value::Array(editors)) => {
            for editor in editors {
                let well_formed = editor
                    .as_object()
                    .is_some_and(|e| e.contains_key("first_name") && e.contains_key("last_name"));
                if !well_formed {
                    findings.push(format!(
                        "In the file conference_details.yml, the editor {editor} is malformed. \
                         Each editor should have both first_name and last_name."
                    ));
                }
            }
        }
        Some(_) => findings.push(
            "In the file conference_details.yml, please add at least one editor to the editors field."
                .to_string(),
        ),
    }

    findings
}

/// Conference fields are escaped by the pipeline itself, so pre-escaped values end up doubled.
pub fn check_latex_escapes(conference: &Record) -> Vec<String> {
    REQUIRED_CONFERENCE_FIELDS
        .iter()
        .filter_map(|field| match conference.get(*field) {
            Some(Value::String(value)) if value.contains('\\') => Some(format!(
                "The input file conference_details.yml contains a LaTeX escape in '{field}': \
                 '{value}'. Please avoid using these escape characters."
            )),
            _ => None,
        })
        .collect()
}
