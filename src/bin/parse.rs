use adababy::escape::inspect;
use adababy::parser::MIN_ERR_DIST;
use adababy::{Diagnostic, ErrorSink, FatalError, Scanner, TokenKind};
use clap::Parser;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
enum CommandError {
    #[error("I/O error")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    #[error("cannot write report")]
    Json(
        #[from]
        #[source]
        serde_json::Error,
    ),
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error("Detected one or more errors")]
    HasError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ArgEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[clap(name = "parse", about = "Checks AdaBaby sources for syntax errors")]
struct Cli {
    files: Vec<PathBuf>,
    /// Print the token stream instead of parsing
    #[clap(long)]
    tokens: bool,
    #[clap(long, arg_enum, default_value = "text")]
    format: Format,
    /// Tokens to consume after an error before reporting another one
    #[clap(long, default_value_t = MIN_ERR_DIST)]
    min_error_distance: u32,
}

#[derive(Debug, Serialize)]
struct Report {
    file: String,
    errors: usize,
    warnings: usize,
    diagnostics: Vec<Diagnostic>,
}

fn main() -> Result<(), CommandError> {
    init_tracing();
    let cli = Cli::parse();
    if cli.files.is_empty() {
        println!("Syntax: parse <ada source file>");
        return Ok(());
    }
    let mut has_error = false;
    for file in &cli.files {
        let result = if cli.tokens {
            dump_tokens(file)
        } else {
            check(file, &cli)
        };
        match result {
            Ok(0) => {}
            Ok(_) => has_error = true,
            Err(CommandError::Fatal(e)) => {
                has_error = true;
                eprintln!("{}: {}", file.display(), e);
            }
            Err(e) => return Err(e),
        }
    }
    if has_error {
        return Err(CommandError::HasError);
    }
    Ok(())
}

/// Parses one file and returns its error count.
fn check(file: &Path, cli: &Cli) -> Result<usize, CommandError> {
    let errors = match cli.format {
        Format::Text => {
            println!("Reading source file {}", file.display());
            ErrorSink::new().with_output(io::stdout())
        }
        Format::Json => ErrorSink::new(),
    };
    let mut parser = adababy::Parser::new(Scanner::open(file)?, errors)
        .with_min_error_distance(cli.min_error_distance);
    parser.parse()?;
    let errors = parser.into_errors();
    let count = errors.count();
    match cli.format {
        Format::Text => println!("-- {}", errors.summary()),
        Format::Json => {
            let report = Report {
                file: file.display().to_string(),
                errors: count,
                warnings: errors.warning_count(),
                diagnostics: errors.into_diagnostics(),
            };
            println!("{}", serde_json::to_string(&report)?);
        }
    }
    Ok(count)
}

fn dump_tokens(file: &Path) -> Result<usize, CommandError> {
    let mut scanner = Scanner::open(file)?;
    let mut no_match = 0;
    loop {
        let token = scanner.scan()?;
        if token.kind == TokenKind::NoSym {
            no_match += 1;
        }
        println!(
            "{}:{} {:?} {}",
            token.line,
            token.col,
            token.kind,
            inspect(&token.text)
        );
        if token.kind == TokenKind::Eof {
            return Ok(no_match);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
