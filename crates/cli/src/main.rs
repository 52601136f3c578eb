//! Cmdletgen CLI
//!
//! Command-line driver for the configuration-resolution engine: apply
//! reviewed overrides to service configs, generate the reviewable
//! report, and inspect individual configurations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use cmdletgen_common::NullAnalyzer;
use cmdletgen_config::{split_method_name, GeneratorManifest, ServiceConfig};
use cmdletgen_merge::{apply_overrides, OverrideDocument};
use cmdletgen_report::{write_report, ReportModel, ReportOptions};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cmdletgen")]
#[command(version, about = "Resolve and review cmdlet generation configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a reviewed overrides document to per-service config files
    #[command(after_help = "EXAMPLES:\n  \
        # Apply overrides to the configs directory\n  \
        cmdletgen merge --overrides overrides.xml --config-dir ./configs\n\n  \
        # Write flag files somewhere other than the config directory\n  \
        cmdletgen merge --overrides overrides.xml --config-dir ./configs --flag-dir ./build")]
    Merge {
        /// Path to the overrides document
        #[arg(short, long)]
        overrides: PathBuf,

        /// Directory holding per-service config files
        #[arg(short, long)]
        config_dir: PathBuf,

        /// Directory for flag files (defaults to the config directory)
        #[arg(long)]
        flag_dir: Option<PathBuf>,
    },

    /// Generate report.xml summarizing reviewable configuration
    #[command(after_help = "EXAMPLES:\n  \
        # Report on all configs listed in the manifest\n  \
        cmdletgen report --manifest Configs.xml --config-dir ./configs --out ./build\n\n  \
        # Only write a report when there is something actionable\n  \
        cmdletgen report --manifest Configs.xml --config-dir ./configs --out ./build --report-only")]
    Report {
        /// Path to the cross-service manifest
        #[arg(short, long)]
        manifest: PathBuf,

        /// Directory holding per-service config files
        #[arg(short, long)]
        config_dir: PathBuf,

        /// Overrides document to annotate the report with
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Output directory for report.xml and flag files
        #[arg(short, long, default_value = "./build")]
        out: PathBuf,

        /// Write the report only when new auto-configured operations
        /// exist and there are zero errors
        #[arg(long)]
        report_only: bool,
    },

    /// Load one service config and display the resolved model
    #[command(after_help = "EXAMPLES:\n  \
        # Human-readable summary\n  \
        cmdletgen inspect --config ./configs/FooService.xml\n\n  \
        # Full model as JSON\n  \
        cmdletgen inspect --config ./configs/FooService.xml --json")]
    Inspect {
        /// Path to the service config file
        #[arg(short, long)]
        config: PathBuf,

        /// Dump the full model as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        println!("{} Verbose mode enabled", "→".cyan());
    }

    match cli.command {
        Commands::Merge {
            overrides,
            config_dir,
            flag_dir,
        } => {
            merge_command(
                overrides.as_path(),
                config_dir.as_path(),
                flag_dir.as_deref(),
                cli.verbose,
            )?;
        }
        Commands::Report {
            manifest,
            config_dir,
            overrides,
            out,
            report_only,
        } => {
            report_command(
                manifest.as_path(),
                config_dir.as_path(),
                overrides.as_deref(),
                out.as_path(),
                report_only,
                cli.verbose,
            )?;
        }
        Commands::Inspect { config, json } => {
            inspect_command(config.as_path(), json)?;
        }
    }

    Ok(())
}

fn merge_command(
    overrides: &Path,
    config_dir: &Path,
    flag_dir: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    println!(
        "{} Applying overrides from: {}",
        "→".cyan(),
        overrides.display()
    );

    let flag_dir = flag_dir.unwrap_or(config_dir);
    let summary = apply_overrides(overrides, config_dir, flag_dir)
        .context("Failed to apply overrides")?;

    for service in &summary.applied {
        println!("{} Merged {}", "✓".green(), service.yellow());
    }
    for service in &summary.bootstrapped {
        println!(
            "{} Bootstrapped {} from its override",
            "✓".green(),
            service.yellow()
        );
    }
    for mismatch in &summary.version_mismatches {
        eprintln!(
            "{} Skipped {}: override targets FileVersion {} but the config is at {}",
            "⚠".yellow(),
            mismatch.c2j_filename,
            mismatch.requested,
            mismatch.current
        );
    }

    if verbose {
        println!(
            "  Applied: {}, bootstrapped: {}, skipped: {}",
            summary.applied.len(),
            summary.bootstrapped.len(),
            summary.version_mismatches.len()
        );
    }

    println!("\n{}", "✓ Override merge complete!".green().bold());
    Ok(())
}

fn report_command(
    manifest_path: &Path,
    config_dir: &Path,
    overrides_path: Option<&Path>,
    out: &Path,
    report_only: bool,
    verbose: bool,
) -> Result<()> {
    println!(
        "{} Loading manifest: {}",
        "→".cyan(),
        manifest_path.display()
    );
    let manifest = GeneratorManifest::load(manifest_path).context("Failed to load manifest")?;

    let overrides = match overrides_path {
        Some(path) => OverrideDocument::load(path)
            .with_context(|| format!("Failed to load overrides: {}", path.display()))?,
        None => OverrideDocument::default(),
    };

    let mut models = Vec::new();
    for file in &manifest.config_files {
        let path = config_dir.join(file);
        if verbose {
            println!("  Loading {}", path.display());
        }
        let model = ReportModel::load(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        models.push(model);
    }
    println!("{} Loaded {} service configs", "✓".green(), models.len());

    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory: {}", out.display()))?;

    let options = ReportOptions {
        output_dir: out.to_path_buf(),
        report_only,
    };
    let outcome = write_report(&mut models, &overrides, &NullAnalyzer, &options)
        .context("Failed to write report")?;

    println!(
        "{} {} of {} services need review",
        "✓".green(),
        outcome.included_services,
        models.len()
    );
    if outcome.has_errors {
        eprintln!(
            "{} Analysis errors present; build approval required",
            "⚠".yellow()
        );
    }
    if outcome.report_written {
        println!(
            "\n{}\n  📄 {}/report.xml",
            "✓ Report complete!".green().bold(),
            out.display()
        );
    } else {
        println!("\n{}", "Nothing actionable; report suppressed".bold());
    }

    Ok(())
}

fn inspect_command(config_path: &Path, json: bool) -> Result<()> {
    let config = ServiceConfig::load(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("\n{}", "Service Configuration:".bold());
    println!("  C2jFilename: {}", config.c2j_filename.yellow());
    println!("  Service: {}", config.service_name.yellow());
    println!("  FileVersion: {}", config.file_version);
    println!("  Operations: {}", config.operations.len());

    for op in &config.operations {
        let (raw_verb, raw_noun) = split_method_name(&op.method_name);
        let mut notes = Vec::new();
        match &op.verb {
            Some(verb) => notes.push(format!("Verb={verb}")),
            None => notes.push(format!("raw verb {raw_verb}")),
        }
        match &op.noun {
            Some(noun) => notes.push(format!("Noun={noun}")),
            None => notes.push(format!("raw noun {raw_noun}")),
        }
        if op.exclude {
            notes.push("excluded".to_string());
        }
        println!("  • {} ({})", op.method_name.cyan(), notes.join(", "));
    }

    Ok(())
}
