mod cli_args;

use aclpub_core::config::{ConfigSource, FileConfig, LayoutTarget, RuntimeOverrides, config_path};
use aclpub_core::runtime::expand_path;
use aclpub_core::{
    GenerateConfig, LoggingDestination, apply_runtime_overrides, check_inputs, export_paper_sheet,
    generate_handbook, generate_proceedings, init_logging, layout_program_file, load_config,
    save_config,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use cli_args::{
    CheckArgs, Cli, Command, ConfigCommand, ConfigSetArgs, GenerateArgs, ProgramArgs, SheetArgs,
};
use tracing::{debug, warn};

fn main() {
    let cli = Cli::parse();
    match init_logging(LoggingDestination::FileAndStderr) {
        Ok(Some(path)) => debug!(path = %path.display(), "logging to file"),
        Ok(None) => {}
        Err(err) => eprintln!("Warning: failed to initialize logging: {err}"),
    }
    if let Err(err) = dispatch(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Proceedings(args) => run_generate(args, LayoutTarget::Proceedings),
        Command::Handbook(args) => run_generate(args, LayoutTarget::Handbook),
        Command::Check(args) => run_check(args),
        Command::Program(args) => run_program(args),
        Command::Sheet(args) => run_sheet(args),
        Command::Config(ConfigCommand::Show) => show_config(),
        Command::Config(ConfigCommand::Set(args)) => set_config(args),
    }
}

/// Persisted settings with command-line overrides applied; every warning is echoed.
fn load_settings(overrides: &RuntimeOverrides, target: LayoutTarget) -> FileConfig {
    let load = load_config();
    let mut warnings = load.warnings;
    let mut config = load.config;
    apply_runtime_overrides(&mut config, overrides, target, &mut warnings);

    for warning in warnings {
        eprintln!("Warning: {warning}");
    }
    config
}

fn run_generate(args: GenerateArgs, target: LayoutTarget) -> Result<()> {
    let config = load_settings(&args.to_runtime_overrides(), target);
    let generate = GenerateConfig::from_file_config(&args.root, &config);

    let (kind, report) = match target {
        LayoutTarget::Proceedings => ("proceedings", generate_proceedings(&generate)),
        LayoutTarget::Handbook => ("handbook", generate_handbook(&generate)),
    };
    let report = report.with_context(|| {
        format!(
            "failed to generate the {kind} for {}",
            generate.root.display()
        )
    })?;

    if report.program_skipped {
        warn!("the program was skipped; the {kind} was generated without it");
    }
    println!("Wrote {}", report.context_path.display());
    println!(
        "{} papers, {} program dates, {} warnings",
        report.papers,
        report.program_dates,
        report.warnings.len()
    );
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<()> {
    let root = expand_path(&args.root);
    let findings = check_inputs(&root)
        .with_context(|| format!("failed to check {}", root.display()))?;
    if findings.is_empty() {
        println!("conference_details.yml looks good.");
        return Ok(());
    }
    for finding in &findings {
        println!("{finding}");
    }
    bail!("{} problem(s) found in conference_details.yml", findings.len())
}

fn run_program(args: ProgramArgs) -> Result<()> {
    let target = args.target();
    let config = load_settings(&args.layout.to_runtime_overrides(), target);
    let budget = match target {
        LayoutTarget::Proceedings => config.layout.proceedings_budget(),
        LayoutTarget::Handbook => config.layout.handbook_budget(),
    };
    let layout = layout_program_file(&args.file, budget)
        .with_context(|| format!("failed to lay out {}", args.file.display()))?;
    println!("{}", serde_json::to_string_pretty(&layout)?);
    Ok(())
}

fn run_sheet(args: SheetArgs) -> Result<()> {
    let rows = export_paper_sheet(&args.papers, &args.output)?;
    println!("Wrote {rows} papers to {}", args.output.display());
    Ok(())
}

fn show_config() -> Result<()> {
    let load = load_config();
    for warning in &load.warnings {
        eprintln!("Warning: {warning}");
    }
    let origin = match load.source {
        ConfigSource::File => "file",
        ConfigSource::Default => "defaults",
    };
    println!("# {} ({origin})", config_path().display());
    print!(
        "{}",
        toml::to_string_pretty(&load.config).context("failed to render settings")?
    );
    Ok(())
}

fn set_config(args: ConfigSetArgs) -> Result<()> {
    let load = load_config();
    let mut warnings = load.warnings;
    let mut config = load.config;
    let changed = args.apply_to(&mut config, &mut warnings);
    for warning in warnings {
        eprintln!("Warning: {warning}");
    }
    if !changed {
        bail!("no settings given; see `aclpub config set --help`");
    }

    save_config(&config).context("failed to save settings")?;
    println!("Saved {}", config_path().display());
    Ok(())
}
