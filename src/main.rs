use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use mirror_heal::ui::{MultiSink, StatusFileSink, TerminalSplash};
use mirror_heal::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mirror-heal")]
#[command(about = "Verify live files against a recovery mirror and repair what differs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML or JSON)
    #[arg(long, global = true, env = "MIRROR_HEAL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Print the result as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Do not draw the terminal spinner
    #[arg(long, global = true)]
    no_splash: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot-time workflow: rebuild the mirror if needed, then verify and repair (default)
    Check,
    /// Refresh the mirror from the live trees, then verify and repair
    Rebuild,
    /// Regenerate the checksum manifest from the mirror
    Generate,
    /// Verify live files against the manifest and repair differences
    Verify,
    /// Print the effective configuration
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = RecoveryConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let _log_guard = logging::init_logging(&config.logging, cli.debug)?;

    let command = cli.command.unwrap_or(Commands::Check);

    if let Commands::ShowConfig = command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut sink = MultiSink::new();
    if !cli.no_splash && !cli.json {
        sink = sink.with(TerminalSplash::new());
    }
    if let Some(path) = &config.status_file {
        sink = sink.with(StatusFileSink::new(path));
    }

    let tools = tools::from_config(&config);
    let controller = RecoveryController::new(config, tools, Box::new(sink));

    match command {
        Commands::Check => print_outcome(&controller.run(), cli.json)?,
        Commands::Rebuild => print_outcome(&controller.run_forced_rebuild(), cli.json)?,
        Commands::Generate => {
            let report = controller.generate()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} {} files, {} symlinks recorded ({} excluded, {} failed) in {}",
                    style("Manifest generated:").green().bold(),
                    report.files,
                    report.symlinks,
                    report.excluded,
                    report.failures,
                    humantime::format_duration(report.elapsed)
                );
            }
        }
        Commands::Verify => {
            let report = controller.verify()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_verify_summary(&report);
            }
        }
        Commands::ShowConfig => {}
    }

    Ok(())
}

fn print_outcome(outcome: &RecoveryOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    if let Some(rebuild) = outcome.rebuild() {
        println!(
            "{} {:?}: {} files, {} symlinks copied, {} imported from update",
            style("Mirror rebuilt").yellow().bold(),
            rebuild.reason,
            rebuild.copied.files,
            rebuild.copied.symlinks,
            rebuild.imported.added
        );
    }

    match outcome {
        RecoveryOutcome::MirrorMissing { mirror_root } => {
            println!(
                "{} {} does not exist, recovery check skipped",
                style("Warning:").red().bold(),
                mirror_root.display()
            );
        }
        RecoveryOutcome::Verified { report, .. } => print_verify_summary(report),
        RecoveryOutcome::Aborted { reason, .. } => {
            println!("{} {}", style("Recovery check aborted:").red().bold(), reason);
        }
    }

    Ok(())
}

fn print_verify_summary(report: &VerifyReport) {
    let label = if report.is_clean() {
        style("Verified:").green().bold()
    } else {
        style("Verified with repairs:").yellow().bold()
    };

    println!(
        "{} {} checked, {} matched, {} restored, {} replaced, {} malformed, {} unresolved, {} failed",
        label,
        report.checked,
        report.matched,
        report.repaired_missing,
        report.repaired_drift,
        report.malformed,
        report.unresolved,
        report.failures
    );
}
