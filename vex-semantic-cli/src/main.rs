use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, Subcommand};

use vex_diagnostics::ErrorLevel;
use vex_semantic::{AnalyzerConfig, SemanticAnalyzer};

#[derive(ClapParser)]
#[command(name = "vex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Vex semantic analyzer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lex, parse, and semantically analyze a Vex source file
    Check {
        /// Input .vx file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print diagnostics as JSON instead of human-readable text
        #[arg(long)]
        json: bool,

        /// Relax strict-typing requirements for fixtures (spec.md §6)
        #[arg(long)]
        test_mode: bool,

        /// Treat warnings as errors for the purpose of the exit code
        #[arg(long)]
        strict: bool,

        /// Maximum number of diagnostics to collect before capping
        #[arg(long, default_value_t = vex_diagnostics::DEFAULT_DIAGNOSTIC_CAP)]
        diagnostic_cap: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            input,
            json,
            test_mode,
            strict,
            diagnostic_cap,
        } => run_check(&input, json, test_mode, strict, diagnostic_cap),
    }
}

fn run_check(
    input: &PathBuf,
    json: bool,
    test_mode: bool,
    strict: bool,
    diagnostic_cap: usize,
) -> Result<()> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    log::info!("checking {}", input.display());

    let mut parser = vex_parser::Parser::new(&source)
        .map_err(|e| anyhow::anyhow!("lexer error: {e}"))?;
    let program = parser
        .parse_file()
        .map_err(|e| anyhow::anyhow!("parse error: {e}"))?;

    let config = AnalyzerConfig {
        test_mode,
        strict_mode: strict,
        diagnostic_cap,
    };
    let mut analyzer = SemanticAnalyzer::new(config);
    let ok = analyzer.analyze_program(&program);

    if json {
        println!("{}", analyzer.engine.to_json());
    } else if analyzer.engine.has_diagnostics() {
        analyzer.engine.print_all(&source);
        analyzer.engine.print_summary();
    } else {
        println!("{}: no issues found", input.display());
    }

    if !ok {
        std::process::exit(1);
    }

    let errors = analyzer
        .engine
        .diagnostics()
        .iter()
        .filter(|d| d.level == ErrorLevel::Error)
        .count();
    if errors > 0 {
        bail!("{errors} error(s) found in {}", input.display());
    }

    Ok(())
}
