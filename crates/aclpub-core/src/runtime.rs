//! Proceedings and handbook generation.
//!
//! Each run loads the conference inputs, lays out the program and writes a render
//! context (JSON) into the build directory for the template stage to consume.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::check::check_conference;
use crate::config::{FileConfig, LayoutPreferences};
use crate::metadata::{
    self, CommitteeBlock, MetadataError, Paper, Record, Workshop, conference_date_range,
    load_required, load_yaml,
};
use crate::papers::{IndexLetter, build_catalog};
use crate::program::{
    DatePages, DateSessions, PageBudget, ProgramEntry, ProgramError, SessionRecord, group_by_date,
    paginate, parse_program,
};

pub const PROCEEDINGS_CONTEXT_FILE: &str = "proceedings.json";
pub const HANDBOOK_CONTEXT_FILE: &str = "handbook.json";

const INPUT_FOLDERS: &[&str] = &[
    "papers",
    "invited_talks",
    "additional_pages",
    "prefaces",
    "sponsor_logos",
];

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(
        "build directory {} is not empty and overwrite is disabled",
        .0.display()
    )]
    BuildDirNotEmpty(PathBuf),
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error("failed to serialize render context: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to walk input folder: {0}")]
    Walk(#[from] walkdir::Error),
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Fully resolved settings for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub root: PathBuf,
    pub build_dir: PathBuf,
    pub output_dir: PathBuf,
    pub overwrite: bool,
    pub layout: LayoutPreferences,
}

impl GenerateConfig {
    /// Resolve a run against the persisted settings; `~` and environment variables in
    /// paths are expanded.
    pub fn from_file_config(root: &str, config: &FileConfig) -> Self {
        Self {
            root: expand_path(root),
            build_dir: expand_path(&config.build.build_dir),
            output_dir: expand_path(&config.build.output_dir),
            overwrite: config.build.overwrite,
            layout: config.layout,
        }
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(err) => {
            warn!(path = raw, error = %err, "could not expand path; using it verbatim");
            PathBuf::from(raw)
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub context_path: PathBuf,
    pub papers: usize,
    pub program_dates: usize,
    pub program_skipped: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProceedingsContext {
    pub root: String,
    pub conference: Record,
    pub conference_dates: Option<String>,
    pub sponsors: Option<Value>,
    pub prefaces: Option<Value>,
    pub organizing_committee: Option<Value>,
    pub program_committee: Option<Vec<CommitteeBlock>>,
    pub invited_talks: Option<Value>,
    pub additional_pages: Option<Value>,
    pub papers: Vec<Paper>,
    pub id_to_paper: BTreeMap<String, Paper>,
    pub author_index: Vec<IndexLetter>,
    pub program: Option<Vec<DatePages>>,
}

#[derive(Debug, Serialize)]
pub struct HandbookContext {
    pub root: String,
    pub build_dir: String,
    pub conference: Record,
    pub conference_dates: Option<String>,
    pub sponsors: Option<Value>,
    pub prefaces: Option<Value>,
    pub organizing_committee: Option<Value>,
    pub program_committee: Option<Vec<CommitteeBlock>>,
    pub tutorial_program: Option<Vec<DatePages>>,
    pub tutorials: Option<Value>,
    pub invited_talks: Option<Value>,
    pub additional_pages: Option<Value>,
    pub papers: Vec<Paper>,
    pub id_to_paper: BTreeMap<String, Paper>,
    pub program: Option<Vec<DateSessions>>,
    pub workshops: Vec<Workshop>,
    pub program_workshops: BTreeMap<String, Vec<DatePages>>,
    pub workshop_days: Vec<String>,
}

struct StageLogger {
    program_start: Instant,
    stage_start: Instant,
}

impl StageLogger {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            program_start: now,
            stage_start: now,
        }
    }

    fn begin(&mut self, name: &str) {
        self.stage_start = Instant::now();
        info!(
            stage = name,
            elapsed_ms = format_ms(self.program_start.elapsed()),
            "BEGIN"
        );
    }

    fn end(&mut self, name: &str) {
        info!(
            stage = name,
            elapsed_ms = format_ms(self.program_start.elapsed()),
            stage_ms = format_ms(self.stage_start.elapsed()),
            "END"
        );
    }
}

fn format_ms(d: std::time::Duration) -> String {
    format!("{:.3}", d.as_secs_f64() * 1_000.0)
}

/// Common inputs of both document kinds.
struct SharedInputs {
    conference: Record,
    conference_dates: Option<String>,
    papers: Vec<Paper>,
    sponsors: Option<Value>,
    organizing_committee: Option<Value>,
    program_committee: Option<Vec<CommitteeBlock>>,
    invited_talks: Option<Value>,
    additional_pages: Option<Value>,
}

fn load_shared_inputs(root: &Path, warnings: &mut Vec<String>) -> Result<SharedInputs, GenerateError> {
    let mut conference: Record = load_required("conference_details", root)?;
    for finding in check_conference(&conference) {
        warn!("{finding}");
        warnings.push(finding);
    }
    metadata::normalize_conference(&mut conference);
    let conference_dates = match conference_date_range(&conference) {
        Ok(dates) => Some(dates),
        Err(err) => {
            warn!(error = %err, "conference dates unavailable");
            warnings.push(err.to_string());
            None
        }
    };

    let mut papers: Vec<Paper> = load_required("papers", root)?;
    metadata::normalize_paper_titles(&mut papers);

    let mut program_committee: Option<Vec<CommitteeBlock>> =
        load_yaml("program_committee", root, false)?;
    if let Some(blocks) = program_committee.as_mut() {
        metadata::normalize_committee(blocks);
    }

    Ok(SharedInputs {
        conference,
        conference_dates,
        papers,
        sponsors: load_yaml("sponsors", root, false)?,
        organizing_committee: load_yaml("organizing_committee", root, false)?,
        program_committee,
        invited_talks: load_yaml("invited_talks", root, false)?,
        additional_pages: load_yaml("additional_pages", root, false)?,
    })
}

/// Load and type-check a program file. `Ok(None)` when the file does not exist.
pub fn load_program(name: &str, root: &Path) -> Result<Option<Vec<ProgramEntry>>, GenerateError> {
    let Some(records) = load_yaml::<Vec<SessionRecord>>(name, root, false)? else {
        return Ok(None);
    };
    Ok(Some(parse_program(records)?))
}

/// Load a program and apply `layout`, or skip it with a warning when it is malformed.
fn layout_or_skip<T>(
    name: &str,
    root: &Path,
    warnings: &mut Vec<String>,
    layout: impl FnOnce(&[ProgramEntry]) -> T,
) -> (Option<T>, bool) {
    match load_program(name, root) {
        Ok(Some(entries)) => (Some(layout(&entries)), false),
        Ok(None) => (None, false),
        Err(err) => {
            warn!(
                error = %err,
                "Sorry. Your {name}.yml file seems malformed. It will be skipped."
            );
            warnings.push(format!("{name}.yml skipped: {err}"));
            (None, true)
        }
    }
}

/// Paginate a standalone program file.
pub fn layout_program_file(path: &Path, budget: PageBudget) -> Result<Vec<DatePages>, GenerateError> {
    let raw = fs::read_to_string(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<SessionRecord> =
        serde_yaml::from_str(&raw).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let entries = parse_program(records)?;
    Ok(paginate(&entries, budget))
}

/// Findings about `conference_details.yml` under `root`.
pub fn check_inputs(root: &Path) -> Result<Vec<String>, GenerateError> {
    let conference: Record = load_required("conference_details", root)?;
    Ok(check_conference(&conference))
}

fn prepare_build_dir(dir: &Path, overwrite: bool) -> Result<(), GenerateError> {
    if dir.exists() {
        let non_empty = fs::read_dir(dir).map_err(io_at(dir))?.next().is_some();
        if non_empty && !overwrite {
            return Err(GenerateError::BuildDirNotEmpty(dir.to_path_buf()));
        }
        if overwrite {
            fs::remove_dir_all(dir).map_err(io_at(dir))?;
        }
    }
    fs::create_dir_all(dir).map_err(io_at(dir))
}

fn write_context<T: Serialize>(dir: &Path, file_name: &str, context: &T) -> Result<PathBuf, GenerateError> {
    let path = dir.join(file_name);
    let rendered = serde_json::to_string_pretty(context)?;
    fs::write(&path, rendered).map_err(io_at(&path))?;
    info!(path = %path.display(), "Render context written");
    Ok(path)
}

pub fn generate_proceedings(config: &GenerateConfig) -> Result<GenerationReport, GenerateError> {
    let mut logger = StageLogger::new();
    let mut warnings = Vec::new();
    let root = config.root.as_path();

    logger.begin("Prepare build directory");
    prepare_build_dir(&config.build_dir, config.overwrite)?;
    logger.end("Prepare build directory");

    logger.begin("Load inputs");
    let shared = load_shared_inputs(root, &mut warnings)?;
    let prefaces: Option<Value> = load_yaml("prefaces", root, false)?;
    logger.end("Load inputs");

    logger.begin("Index papers");
    let mut papers = shared.papers;
    let catalog = build_catalog(&mut papers);
    info!(
        papers = papers.len(),
        pages = catalog.total_pages,
        "Paper catalog built"
    );
    logger.end("Index papers");

    logger.begin("Lay out program");
    let budget = config.layout.proceedings_budget();
    let (program, program_skipped) =
        layout_or_skip("program", root, &mut warnings, |entries| paginate(entries, budget));
    logger.end("Lay out program");

    let context = ProceedingsContext {
        root: root.display().to_string(),
        conference: shared.conference,
        conference_dates: shared.conference_dates,
        sponsors: shared.sponsors,
        prefaces,
        organizing_committee: shared.organizing_committee,
        program_committee: shared.program_committee,
        invited_talks: shared.invited_talks,
        additional_pages: shared.additional_pages,
        id_to_paper: catalog.id_to_paper,
        author_index: catalog.author_index,
        papers,
        program,
    };
    let program_dates = context.program.as_ref().map_or(0, Vec::len);
    let paper_count = context.papers.len();

    logger.begin("Write outputs");
    let context_path = write_context(&config.build_dir, PROCEEDINGS_CONTEXT_FILE, &context)?;
    rearrange_outputs(root, &config.build_dir, &config.output_dir)?;
    logger.end("Write outputs");

    Ok(GenerationReport {
        context_path,
        papers: paper_count,
        program_dates,
        program_skipped,
        warnings,
    })
}

pub fn generate_handbook(config: &GenerateConfig) -> Result<GenerationReport, GenerateError> {
    let mut logger = StageLogger::new();
    let mut warnings = Vec::new();
    let root = config.root.as_path();

    logger.begin("Prepare build directory");
    prepare_build_dir(&config.build_dir, config.overwrite)?;
    logger.end("Prepare build directory");

    logger.begin("Load inputs");
    let shared = load_shared_inputs(root, &mut warnings)?;
    let prefaces: Option<Value> = load_yaml("prefaces_handbook", root, false)?;
    let tutorials: Option<Value> = load_yaml("tutorials", root, false)?;
    let workshops: Vec<Workshop> = load_yaml("workshops", root, false)?.unwrap_or_default();
    logger.end("Load inputs");

    let mut papers = shared.papers;
    let catalog = build_catalog(&mut papers);

    logger.begin("Lay out programs");
    let (program, program_skipped) =
        layout_or_skip("program", root, &mut warnings, group_by_date);
    let tutorial_budget = config.layout.handbook_budget();
    let (tutorial_program, _) = layout_or_skip("tutorial_program", root, &mut warnings, |entries| {
        paginate(entries, tutorial_budget)
    });

    let workshop_budget = config.layout.workshop_budget();
    let mut program_workshops = BTreeMap::new();
    for workshop in &workshops {
        let name = format!("workshops/{}", workshop.id);
        let (layout, _) = layout_or_skip(&name, root, &mut warnings, |entries| {
            paginate(entries, workshop_budget)
        });
        match layout {
            Some(layout) => {
                program_workshops.insert(workshop.id.to_string(), layout);
            }
            None => warn!(workshop = %workshop.id, "workshop has no program"),
        }
    }
    let workshop_days = metadata::workshop_days(&workshops);
    logger.end("Lay out programs");

    let program_dates = program.as_ref().map_or(0, Vec::len);
    let paper_count = papers.len();
    let context = HandbookContext {
        root: root.display().to_string(),
        build_dir: config.build_dir.display().to_string(),
        conference: shared.conference,
        conference_dates: shared.conference_dates,
        sponsors: shared.sponsors,
        prefaces,
        organizing_committee: shared.organizing_committee,
        program_committee: shared.program_committee,
        tutorial_program,
        tutorials,
        invited_talks: shared.invited_talks,
        additional_pages: shared.additional_pages,
        id_to_paper: catalog.id_to_paper,
        papers,
        program,
        workshops,
        program_workshops,
        workshop_days,
    };

    logger.begin("Write outputs");
    let context_path = write_context(&config.build_dir, HANDBOOK_CONTEXT_FILE, &context)?;
    logger.end("Write outputs");

    Ok(GenerationReport {
        context_path,
        papers: paper_count,
        program_dates,
        program_skipped,
        warnings,
    })
}

/// Assemble the output directory: render context, a copy of every input and the attachments.
fn rearrange_outputs(root: &Path, build_dir: &Path, output_dir: &Path) -> Result<(), GenerateError> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(io_at(output_dir))?;
    }
    fs::create_dir_all(output_dir).map_err(io_at(output_dir))?;

    let context = build_dir.join(PROCEEDINGS_CONTEXT_FILE);
    let context_copy = output_dir.join(PROCEEDINGS_CONTEXT_FILE);
    fs::copy(&context, &context_copy).map_err(io_at(&context))?;

    let inputs = output_dir.join("inputs");
    fs::create_dir_all(&inputs).map_err(io_at(&inputs))?;
    for entry in fs::read_dir(root).map_err(io_at(root))? {
        let path = entry.map_err(io_at(root))?.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if path.is_file() && is_yaml {
            if let Some(name) = path.file_name() {
                fs::copy(&path, inputs.join(name)).map_err(io_at(&path))?;
            }
        }
    }

    for folder in INPUT_FOLDERS {
        copy_tree(&root.join(folder), &inputs.join(folder))?;
    }
    copy_tree(&root.join("attachments"), &output_dir.join("attachments"))?;
    Ok(())
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), GenerateError> {
    if !from.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(from) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let dest_path = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path).map_err(io_at(&dest_path))?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(io_at(parent))?;
            }
            fs::copy(entry.path(), &dest_path).map_err(io_at(entry.path()))?;
        }
    }
    Ok(())
}
