//! Tab-separated export of `papers.yml` for pasting into a shared spreadsheet.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::metadata::Paper;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse papers: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to write sheet: {0}")]
    Write(#[source] io::Error),
}

/// One line per paper: id, title, abstract, then first name, last name and emails of
/// every author.
pub fn sheet_line(paper: &Paper) -> String {
    let mut cells = vec![
        clean_cell(&paper.id.to_string()),
        clean_cell(&paper.title),
        clean_cell(paper.abstract_text.as_deref().unwrap_or_default()),
    ];
    for author in &paper.authors {
        cells.push(clean_cell(&author.first_name));
        cells.push(clean_cell(&author.last_name));
        cells.push(clean_cell(&author.emails()));
    }
    cells.join("\t")
}

fn clean_cell(value: &str) -> String {
    value.replace(['\n', '\t'], " ")
}

pub fn render_sheet(papers: &[Paper]) -> String {
    papers
        .iter()
        .map(|paper| format!("{}\n", sheet_line(paper)))
        .collect()
}

/// Convert a papers file into a TSV file, returning the number of rows written.
pub fn export_paper_sheet(papers_yml: &Path, output_tsv: &Path) -> Result<usize, SheetError> {
    let raw = fs::read_to_string(papers_yml).map_err(|source| SheetError::Read {
        path: papers_yml.to_path_buf(),
        source,
    })?;
    let papers: Vec<Paper> = serde_yaml::from_str(&raw)?;
    fs::write(output_tsv, render_sheet(&papers)).map_err(SheetError::Write)?;
    info!(
        rows = papers.len(),
        path = %output_tsv.display(),
        "Paper sheet written"
    );
    Ok(papers.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAPERS: &str = r#"
- id: 4
  title: Private Parsing
  abstract: |
    Line one
    line two
  authors:
    - first_name: Ivan
      last_name: Habernal
      emails: ivan@example.org
    - first_name: Grace
      last_name: Hopper
- id: 5
  title: No Abstract
"#;

    #[test]
    fn flattens_abstract_and_authors() {
        let papers: Vec<Paper> = serde_yaml::from_str(PAPERS).unwrap();
        assert_eq!(
            sheet_line(&papers[0]),
            "4\tPrivate Parsing\tLine one line two \tIvan\tHabernal\tivan@example.org\tGrace\tHopper\t"
        );
        assert_eq!(sheet_line(&papers[1]), "5\tNo Abstract\t");
    }

    #[test]
    fn writes_one_line_per_paper() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("papers.yml");
        let output = temp.path().join("papers.tsv");
        fs::write(&input, PAPERS).unwrap();

        let rows = export_paper_sheet(&input, &output).unwrap();

        assert_eq!(rows, 2);
        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(written.lines().count(), 2);
    }
}
