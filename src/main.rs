//! guidegen: generate per-platform installation guides.
//!
//! - `guidegen generate` writes every document of every class.
//! - `guidegen check` fails when a document on disk is stale.
//! - `guidegen render --class C --target KEY` prints one document.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glob::Pattern;
use guidegen::config::{Config, DEFAULT_CONFIG};
use guidegen::{ClassReport, Generator};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "guidegen",
    version,
    about = "Generate per-platform installation guides from a shared template"
)]
struct Cli {
    /// Project configuration file
    #[arg(short, long, env = "GUIDEGEN_CONFIG", default_value = DEFAULT_CONFIG, global = true)]
    config: PathBuf,

    /// More output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render and write documents
    Generate {
        /// Restrict to these classes (default: all)
        #[arg(long = "class")]
        classes: Vec<String>,
        /// Only targets whose key matches one of these glob patterns
        #[arg(long = "target")]
        targets: Vec<String>,
    },
    /// Fail if any generated document on disk is missing or out of date
    Check {
        #[arg(long = "class")]
        classes: Vec<String>,
    },
    /// Print one target's document to stdout
    Render {
        #[arg(long)]
        class: String,
        #[arg(long)]
        target: String,
    },
    /// Print the path a symbolic document key resolves to
    Resolve { key: String },
    /// List target keys in declaration order
    Targets {
        #[arg(long = "class")]
        classes: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let generator = Generator::load(config).context("failed to prepare generation")?;

    match cli.command {
        Command::Generate { classes, targets } => generate(&generator, &classes, &targets),
        Command::Check { classes } => check(&generator, &classes),
        Command::Render { class, target } => {
            match generator.render(&class, &target)? {
                Ok(doc) => print!("{}", doc.text),
                Err(failure) => {
                    report_failure(&class, &failure);
                    bail!("{}", failure);
                }
            }
            Ok(())
        }
        Command::Resolve { key } => match generator.resolve(&key) {
            Some(path) => {
                println!("{}", path);
                Ok(())
            }
            None => bail!("unresolved reference '{}'", key),
        },
        Command::Targets { classes } => {
            for class in selected_classes(&generator, &classes) {
                for target in generator.targets(&class)? {
                    println!("{}\t{}", class, target.key);
                }
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "guidegen=debug",
        _ => "guidegen=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn selected_classes(generator: &Generator, requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        generator.class_keys().map(str::to_string).collect()
    } else {
        requested.to_vec()
    }
}

fn generate(generator: &Generator, classes: &[String], targets: &[String]) -> Result<()> {
    let filters = targets
        .iter()
        .map(|t| Pattern::new(t).with_context(|| format!("invalid target pattern '{}'", t)))
        .collect::<Result<Vec<_>>>()?;

    let mut failed = 0;
    let mut broken = 0;
    for class in selected_classes(generator, classes) {
        let report = match generator.generate(&class, &filters) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(class = %class, "{}", e);
                broken += 1;
                continue;
            }
        };
        let summary = generator.write(&report);
        eprintln!(
            "{}: {} written, {} unchanged, {} failed",
            class,
            summary.written,
            summary.unchanged,
            report.failures().count() + summary.failures.len()
        );
        failed += report_failures(&report);
        for failure in &summary.failures {
            report_failure(&class, failure);
        }
        failed += summary.failures.len();
    }

    if broken > 0 {
        bail!("{} class(es) could not be generated", broken);
    }
    if failed > 0 {
        bail!("{} target(s) failed", failed);
    }
    Ok(())
}

fn check(generator: &Generator, classes: &[String]) -> Result<()> {
    let mut problems = 0;
    for class in selected_classes(generator, classes) {
        let report = match generator.generate(&class, &[]) {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(class = %class, "{}", e);
                problems += 1;
                continue;
            }
        };
        problems += report_failures(&report);
        for stale in generator.check(&report) {
            eprintln!("{} ({}): {}", stale.path.display(), stale.target, stale.reason);
            problems += 1;
        }
    }

    if problems > 0 {
        bail!("{} document(s) need regenerating; run `guidegen generate`", problems);
    }
    Ok(())
}

fn report_failures(report: &ClassReport) -> usize {
    let mut count = 0;
    for failure in report.failures() {
        report_failure(&report.class, failure);
        count += 1;
    }
    count
}

fn report_failure(class: &str, failure: &guidegen::TargetFailure) {
    for error in &failure.errors {
        tracing::error!(class, target = %failure.target, "{}", error);
    }
}
