use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::latex::index_letter;
use crate::metadata::Paper;

/// Author name and the start pages of the papers they wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorEntry {
    pub name: String,
    pub pages: Vec<u32>,
}

/// Index entries sharing one initial letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexLetter {
    pub letter: String,
    pub authors: Vec<AuthorEntry>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PaperCatalog {
    pub id_to_paper: BTreeMap<String, Paper>,
    pub author_index: Vec<IndexLetter>,
    pub total_pages: u32,
}

/// Assign consecutive page ranges starting at page 1 and build the author index.
///
/// Page counts come from each paper's `num_pages`; a paper without one counts as a
/// single page.
pub fn build_catalog(papers: &mut [Paper]) -> PaperCatalog {
    let mut page = 1u32;
    let mut total_pages = 0u32;
    let mut id_to_paper = BTreeMap::new();
    let mut author_to_pages: BTreeMap<String, Vec<u32>> = BTreeMap::new();

    for paper in papers.iter_mut() {
        let num_pages = match paper.num_pages {
            Some(count) if count > 0 => count,
            _ => {
                warn!(paper = %paper.id, "paper has no num_pages; assuming a single page");
                1
            }
        };
        let last = page.checked_add(num_pages - 1).unwrap_or_else(|| {
            warn!(
                paper = %paper.id,
                num_pages,
                "page count runs past the end of the volume; clamping"
            );
            u32::MAX
        });
        paper.page_range = Some((page, last));
        for author in &paper.authors {
            author_to_pages
                .entry(author.index_name())
                .or_default()
                .push(page);
        }
        id_to_paper.insert(paper.id.to_string(), paper.clone());
        total_pages = last;
        page = last.saturating_add(1);
    }

    let mut by_letter: BTreeMap<char, Vec<AuthorEntry>> = BTreeMap::new();
    for (name, pages) in author_to_pages {
        let Some(letter) = index_letter(&name) else {
            continue;
        };
        by_letter
            .entry(letter)
            .or_default()
            .push(AuthorEntry { name, pages });
    }

    let author_index = by_letter
        .into_iter()
        .map(|(letter, mut authors)| {
            authors.sort_by_key(|entry| entry.name.to_lowercase());
            IndexLetter {
                letter: letter.to_string(),
                authors,
            }
        })
        .collect();

    PaperCatalog {
        id_to_paper,
        author_index,
        total_pages,
    }
}
