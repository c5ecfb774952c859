use std::fs;
use std::path::Path;

use aclpub_core::{
    GenerateConfig, GenerateError, LayoutPreferences, generate_handbook, generate_proceedings,
};
use serde_json::Value;
use tempfile::tempdir;

const CONFERENCE: &str = r#"
book_title: Proceedings of the 60th Annual Meeting
event_name: ACL 2022
cover_subtitle: Volume 1 Long Papers
anthology_venue_id: ACL
start_date: 2022-05-22
end_date: 2022-05-27
isbn: 978-1-955917-21-6
location: Dublin, Ireland
publisher: Association for Computational Linguistics
volume_name: "1"
editors:
  - first_name: Smaranda
    last_name: Muresan
"#;

const PAPERS: &str = r#"
- id: 1
  title: Parsing & Friends
  file: 1.pdf
  num_pages: 8
  authors:
    - first_name: Ada
      last_name: Lovelace
- id: 2
  title: Tagging_Things
  file: 2.pdf
  num_pages: 4
  authors:
    - first_name: Émile
      last_name: Zola
"#;

const PROGRAM: &str = r#"
- title: Morning Session
  start_time: 2022-05-23 09:00:00
  end_time: 2022-05-23 10:30:00
  papers: [1, 2]
- title: Posters
  start_time: 2022-05-24 14:00:00
  end_time: 2022-05-24 15:00:00
  subsessions:
    - title: Poster A
      start_time: 2022-05-24 14:00:00
      end_time: 2022-05-24 15:00:00
      papers: [2]
"#;

fn write_inputs(root: &Path) {
    fs::create_dir_all(root.join("papers")).expect("papers dir");
    fs::write(root.join("conference_details.yml"), CONFERENCE).expect("conference");
    fs::write(root.join("papers.yml"), PAPERS).expect("papers");
    fs::write(root.join("program.yml"), PROGRAM).expect("program");
    fs::write(root.join("papers").join("1.pdf"), "%PDF-1.4").expect("pdf");
}

fn config_for(dir: &Path) -> GenerateConfig {
    let layout = LayoutPreferences {
        proceedings_max_lines: 5,
        ..LayoutPreferences::default()
    };
    GenerateConfig {
        root: dir.join("input"),
        build_dir: dir.join("build"),
        output_dir: dir.join("output"),
        overwrite: false,
        layout,
    }
}

fn read_json(path: &Path) -> Value {
    let raw = fs::read_to_string(path).expect("read context");
    serde_json::from_str(&raw).expect("parse context")
}

#[test]
fn proceedings_context_contains_paginated_program() {
    let temp = tempdir().expect("tempdir");
    let config = config_for(temp.path());
    write_inputs(&config.root);

    let report = generate_proceedings(&config).expect("proceedings generated");

    assert_eq!(report.papers, 2);
    assert_eq!(report.program_dates, 2);
    assert!(!report.program_skipped);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let context = read_json(&report.context_path);
    assert_eq!(context["conference_dates"], "May 22-27");
    assert_eq!(context["papers"][0]["title"], "Parsing \\& Friends");
    assert_eq!(context["papers"][1]["page_range"], serde_json::json!([9, 12]));

    let program = context["program"].as_array().expect("program array");
    assert_eq!(program[0]["date"], "2022-05-23");
    let pages = program[0]["pages"].as_array().expect("pages");
    // header (2) + paper (3) fills the first page of five lines
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0][0]["type"], "header");
    assert_eq!(pages[0][1]["type"], "paper");
    assert_eq!(pages[1][0]["paper"], 2);

    assert_eq!(program[1]["pages"][0][0]["title"], "Poster A");

    let letters: Vec<&str> = context["author_index"]
        .as_array()
        .expect("index")
        .iter()
        .filter_map(|entry| entry["letter"].as_str())
        .collect();
    assert_eq!(letters, vec!["l", "z"]);
}

#[test]
fn proceedings_outputs_are_rearranged() {
    let temp = tempdir().expect("tempdir");
    let config = config_for(temp.path());
    write_inputs(&config.root);

    generate_proceedings(&config).expect("proceedings generated");

    let output = &config.output_dir;
    assert!(output.join("proceedings.json").is_file());
    assert!(output.join("inputs").join("papers.yml").is_file());
    assert!(output.join("inputs").join("program.yml").is_file());
    assert!(output.join("inputs").join("papers").join("1.pdf").is_file());
}

#[test]
fn malformed_program_is_skipped() {
    let temp = tempdir().expect("tempdir");
    let config = config_for(temp.path());
    write_inputs(&config.root);
    fs::write(
        config.root.join("program.yml"),
        "- title: Broken\n  start_time: not a time\n  end_time: 2022-05-23 10:00:00\n",
    )
    .expect("program");

    let report = generate_proceedings(&config).expect("generation continues");

    assert!(report.program_skipped);
    assert_eq!(report.program_dates, 0);
    assert!(report.warnings.iter().any(|w| w.contains("program.yml")));
    let context = read_json(&report.context_path);
    assert!(context["program"].is_null());
}

#[test]
fn non_empty_build_dir_requires_overwrite() {
    let temp = tempdir().expect("tempdir");
    let mut config = config_for(temp.path());
    write_inputs(&config.root);
    fs::create_dir_all(&config.build_dir).expect("build dir");
    fs::write(config.build_dir.join("stale.aux"), "").expect("stale file");

    let err = generate_proceedings(&config).unwrap_err();
    assert!(matches!(err, GenerateError::BuildDirNotEmpty(_)));

    config.overwrite = true;
    generate_proceedings(&config).expect("overwrite allowed");
    assert!(!config.build_dir.join("stale.aux").exists());
}

#[test]
fn missing_conference_details_fails() {
    let temp = tempdir().expect("tempdir");
    let config = config_for(temp.path());
    fs::create_dir_all(&config.root).expect("root");

    let err = generate_proceedings(&config).unwrap_err();
    assert!(matches!(err, GenerateError::Metadata(_)));
}

#[test]
fn handbook_lays_out_workshops_and_groups_main_program() {
    let temp = tempdir().expect("tempdir");
    let config = config_for(temp.path());
    write_inputs(&config.root);
    fs::write(
        config.root.join("workshops.yml"),
        "- { id: 7, date: \"May 26\" }\n- { id: 8, date: \"May 26\" }\n",
    )
    .expect("workshops");
    fs::create_dir_all(config.root.join("workshops")).expect("workshops dir");
    fs::write(
        config.root.join("workshops").join("7.yml"),
        "- title: Opening\n  start_time: 2022-05-26 09:00:00\n  end_time: 2022-05-26 09:15:00\n",
    )
    .expect("workshop program");

    let report = generate_handbook(&config).expect("handbook generated");

    assert_eq!(report.program_dates, 2);
    let context = read_json(&report.context_path);
    assert!(report.context_path.ends_with("handbook.json"));

    assert_eq!(context["program"][0]["date"], "2022-05-23");
    assert_eq!(context["program"][0]["sessions"][0]["title"], "Morning Session");
    assert_eq!(
        context["program"][1]["sessions"][0]["subsessions"][0]["title"],
        "Poster A"
    );

    let workshop = &context["program_workshops"]["7"];
    assert_eq!(workshop[0]["pages"][0][0]["title"], "Opening");
    assert!(context["program_workshops"].get("8").is_none());
    assert_eq!(context["workshop_days"], serde_json::json!(["May 26"]));
    assert!(context["tutorial_program"].is_null());
}
