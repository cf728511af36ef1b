//! Xi Script command line tool
//!
//! Runs scripts through their lifecycle hooks, checks them for errors and
//! dumps token streams.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use xiscript::feedback::{CheckReport, ErrorReport};
use xiscript::frontend::{tokenize, Parser as ScriptParser};
use xiscript::{Limits, ScriptEngine, ScriptInstance};

/// Xi Script
#[derive(Parser, Debug)]
#[command(name = "xis")]
#[command(version = "0.1.0")]
#[command(about = "Xi Script - run and check entity behaviour scripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a script: top level, OnStart, OnUpdate per tick, OnDestroy
    Run {
        /// Input source file
        input: PathBuf,

        /// Number of OnUpdate calls
        #[arg(long, default_value = "1")]
        ticks: u32,

        /// Delta time passed to OnUpdate
        #[arg(long, default_value = "0.016")]
        dt: f64,

        /// JSON file with interpreter limits
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[arg(long)]
        max_call_depth: Option<usize>,

        #[arg(long)]
        max_iterations: Option<u64>,
    },
    /// Check a source file for errors without running it
    Check {
        /// Input source file
        input: PathBuf,

        /// Keep parsing after the first error
        #[arg(long)]
        all: bool,

        /// Print a JSON report
        #[arg(long)]
        json: bool,
    },
    /// Print the token stream of a source file
    Tokens {
        input: PathBuf,
    },
    /// Print version information
    Version,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { input, ticks, dt, config, max_call_depth, max_iterations } => {
            let mut limits = load_limits(config.as_deref())?;
            if let Some(depth) = max_call_depth {
                limits.max_call_depth = depth;
            }
            if let Some(iterations) = max_iterations {
                limits.max_iterations = iterations;
            }
            run_file(&input, limits, ticks, dt)
        }
        Commands::Check { input, all, json } => check_file(&input, all, json),
        Commands::Tokens { input } => dump_tokens(&input),
        Commands::Version => {
            println!("xis 0.1.0");
            println!("Xi Script runtime");
            Ok(())
        }
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_limits(config: Option<&Path>) -> Result<Limits> {
    let Some(path) = config else {
        return Ok(Limits::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid limits in {}", path.display()))
}

/// Drive a script through its whole lifecycle
fn run_file(input: &Path, limits: Limits, ticks: u32, dt: f64) -> Result<()> {
    let source = read_source(input)?;
    let mut engine = ScriptEngine::with_limits(limits);
    let mut instance = ScriptInstance::new(source);

    instance
        .initialize(&mut engine, |_| {})
        .with_context(|| format!("{} failed to initialize", input.display()))?;
    println!("  [✓] Initialized {}", input.display());

    instance.start().context("OnStart failed")?;
    for tick in 1..=ticks {
        instance.update(dt).with_context(|| format!("OnUpdate failed on tick {}", tick))?;
    }
    println!("  [✓] Ran {} ticks (dt = {})", ticks, dt);

    instance.destroy();
    if let Some(err) = instance.error() {
        bail!("OnDestroy failed: {}", err);
    }
    println!("  [✓] Destroyed");
    Ok(())
}

fn check_file(input: &Path, all: bool, json: bool) -> Result<()> {
    let source = read_source(input)?;
    let file = input.display().to_string();

    let errors = match tokenize(&source) {
        Err(err) => vec![err],
        Ok(tokens) => {
            let mut parser = ScriptParser::new(tokens);
            if all {
                parser.parse_with_recovery().1
            } else {
                parser.parse().err().into_iter().collect()
            }
        }
    };
    let report = CheckReport::new(file, &errors);

    if json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else if report.success {
        println!("  [✓] {}: no errors found", report.file);
    } else {
        for error in &report.errors {
            eprintln!("{}", error.render());
        }
    }

    if !report.success {
        bail!("{} error(s) in {}", report.errors.len(), report.file);
    }
    Ok(())
}

fn dump_tokens(input: &Path) -> Result<()> {
    let source = read_source(input)?;
    match tokenize(&source) {
        Ok(tokens) => {
            for token in &tokens {
                println!("{:>4}:{:<3} {:<14} {}", token.line(), token.column(), token.kind.to_string(), token.lexeme);
            }
            Ok(())
        }
        Err(err) => {
            let report = ErrorReport::from_error(&err, &input.display().to_string());
            bail!("{}", report.render())
        }
    }
}
