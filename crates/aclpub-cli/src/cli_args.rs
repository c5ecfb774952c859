use std::path::PathBuf;

use aclpub_core::config::{FileConfig, LayoutTarget, RuntimeOverrides, apply_runtime_overrides};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// Top-level CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Supported subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build the render context for the proceedings volume.
    Proceedings(GenerateArgs),
    /// Build the render context for the conference handbook.
    Handbook(GenerateArgs),
    /// Report missing or malformed fields in conference_details.yml.
    Check(CheckArgs),
    /// Print the paginated layout of a program file as JSON.
    Program(ProgramArgs),
    /// Export papers.yml as a tab-separated sheet.
    Sheet(SheetArgs),
    /// Inspect or change the persisted settings in config.toml.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Settings management subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the settings file location and its effective contents.
    Show,
    /// Store new defaults in config.toml.
    Set(ConfigSetArgs),
}

/// Line budget flags shared by the commands that paginate a program.
#[derive(Debug, Clone, Args, Default)]
pub struct LayoutArgs {
    /// Lines that fit on one program page.
    #[arg(long = "max-lines", value_name = "LINES")]
    pub max_lines: Option<u32>,

    /// Estimated lines taken by one paper or tutorial row.
    #[arg(long = "paper-lines", value_name = "LINES")]
    pub paper_lines: Option<u32>,

    /// Lines taken by a session header.
    #[arg(long = "header-lines", value_name = "LINES")]
    pub header_lines: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Directory holding conference_details.yml, papers.yml and friends.
    #[arg(value_hint = ValueHint::DirPath)]
    pub root: String,

    /// Wipe a non-empty build directory instead of refusing to run.
    #[arg(long, action = ArgAction::SetTrue)]
    pub overwrite: bool,

    /// Build directory (defaults to config value).
    #[arg(long = "build-dir", value_hint = ValueHint::DirPath)]
    pub build_dir: Option<String>,

    /// Output directory (defaults to config value).
    #[arg(long = "outdir", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<String>,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    #[arg(value_hint = ValueHint::DirPath)]
    pub root: String,
}

#[derive(Debug, Clone, Args)]
pub struct ProgramArgs {
    /// Program YAML file.
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Use the handbook page size instead of the proceedings one.
    #[arg(long, action = ArgAction::SetTrue)]
    pub handbook: bool,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

#[derive(Debug, Clone, Args)]
pub struct SheetArgs {
    #[arg(value_hint = ValueHint::FilePath)]
    pub papers: PathBuf,

    #[arg(value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigSetArgs {
    /// Apply --max-lines to the handbook and workshop budgets instead of the proceedings one.
    #[arg(long, action = ArgAction::SetTrue)]
    pub handbook: bool,

    #[arg(long = "build-dir", value_hint = ValueHint::DirPath)]
    pub build_dir: Option<String>,

    #[arg(long = "outdir", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<String>,

    /// Default for wiping a non-empty build directory.
    #[arg(
        long = "overwrite",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::value_parser!(bool)
    )]
    pub overwrite: Option<bool>,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

impl LayoutArgs {
    pub fn to_runtime_overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            max_lines: self.max_lines,
            paper_median_lines: self.paper_lines,
            header_lines: self.header_lines,
            ..RuntimeOverrides::default()
        }
    }
}

impl GenerateArgs {
    pub fn to_runtime_overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            build_dir: self.build_dir.clone(),
            output_dir: self.output_dir.clone(),
            overwrite: self.overwrite.then_some(true),
            ..self.layout.to_runtime_overrides()
        }
    }
}

impl ProgramArgs {
    pub fn target(&self) -> LayoutTarget {
        if self.handbook {
            LayoutTarget::Handbook
        } else {
            LayoutTarget::Proceedings
        }
    }
}

impl ConfigSetArgs {
    pub fn to_runtime_overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            build_dir: self.build_dir.clone(),
            output_dir: self.output_dir.clone(),
            overwrite: self.overwrite,
            ..self.layout.to_runtime_overrides()
        }
    }

    /// Merge the requested changes into `config`, returning whether anything was requested.
    pub fn apply_to(&self, config: &mut FileConfig, warnings: &mut Vec<String>) -> bool {
        let overrides = self.to_runtime_overrides();
        if overrides.is_empty() {
            return false;
        }
        let target = if self.handbook {
            LayoutTarget::Handbook
        } else {
            LayoutTarget::Proceedings
        };
        apply_runtime_overrides(config, &overrides, target, warnings);
        true
    }
}
