//! htn-refine CLI: precondition inference and two-regularization for HTN domains.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use htn_refine::config::RefineConfig;
use htn_refine::model::Domain;
use htn_refine::pipeline::{self, Pass, RefineReport};

#[derive(Parser)]
#[command(name = "htn-refine", version, about = "HTN domain preprocessing passes")]
struct Cli {
    /// Pass configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer method preconditions.
    Infer {
        #[command(flatten)]
        io: DomainIo,
    },

    /// Split long totally ordered methods into binary ones.
    Regularize {
        #[command(flatten)]
        io: DomainIo,
    },

    /// Run the passes enabled in the configuration.
    Run {
        #[command(flatten)]
        io: DomainIo,
    },

    /// Print the effective configuration.
    Config,
}

#[derive(clap::Args)]
struct DomainIo {
    /// Domain model as JSON.
    #[arg(long)]
    domain: PathBuf,

    /// Where to write the transformed domain.
    #[arg(long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RefineConfig::load(path)?,
        None => RefineConfig::default(),
    };

    match cli.command {
        Commands::Infer { io } => {
            transform(&io, &config, &[Pass::InferPreconditions])?;
        }

        Commands::Regularize { io } => {
            transform(&io, &config, &[Pass::TwoRegularize])?;
        }

        Commands::Run { io } => {
            transform(&io, &config, &Pass::selected(&config))?;
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn transform(io: &DomainIo, config: &RefineConfig, passes: &[Pass]) -> Result<()> {
    let mut domain = read_domain(&io.domain)?;
    let report = pipeline::run_passes(&mut domain, config, passes)?;
    print_report(&report);

    let json = serde_json::to_string_pretty(&domain).into_diagnostic()?;
    std::fs::write(&io.output, json).into_diagnostic()?;
    println!("Wrote {}", io.output.display());
    Ok(())
}

fn read_domain(path: &Path) -> Result<Domain> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&content).into_diagnostic()
}

fn print_report(report: &RefineReport) {
    if let Some(stats) = &report.statistics {
        println!("Inference Statistics: {stats}");
    }
    if let Some(reg) = &report.regularization {
        println!(
            "Two-regularization: {} methods split, {} synthetic tasks, {} synthetic methods",
            reg.rewritten_methods, reg.synthetic_tasks, reg.synthetic_methods
        );
    }
}
