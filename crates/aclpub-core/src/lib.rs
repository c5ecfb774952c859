//! Core library crate for assembling conference proceedings and handbooks.

pub mod check;
pub mod config;
pub mod latex;
pub mod logging;
pub mod metadata;
pub mod papers;
pub mod program;
pub mod runtime;
pub mod sheet;

pub use config::{
    BuildPreferences, ConfigError, ConfigLoadResult, ConfigSource, FileConfig, LayoutPreferences,
    LayoutTarget, RuntimeOverrides, apply_runtime_overrides, config_directory, config_path,
    load_config, save_config,
};
pub use logging::{LoggingDestination, LoggingError, current_log_path, init_logging};
pub use program::{
    DatePages, DateSessions, Page, PageBudget, ProgramEntry, ProgramError, Row, group_by_date,
    paginate, parse_program,
};
pub use runtime::{
    GenerateConfig, GenerateError, GenerationReport, check_inputs, generate_handbook,
    generate_proceedings, layout_program_file,
};
pub use sheet::{SheetError, export_paper_sheet};
