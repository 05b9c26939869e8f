//! `dts-outline` command line interface.
//!
//! # Enabling Debug Logging
//!
//! Pass `--debug`, or set the `DTS_OUTLINE_LOG` environment variable:
//!
//! ```bash
//! DTS_OUTLINE_LOG=trace dts-outline outline babylon.d.ts
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dts_outline::{parse_with_options, render_json, render_skips, render_text, Lexer};

mod config;

use config::{ColorMode, OutlineConfig, OutputFormat};

#[derive(Parser, Debug)]
#[command(
    name = "dts-outline",
    version,
    about = "Outline the modules and classes of a TypeScript-style declaration file"
)]
struct Cli {
    /// Enable verbose debug logging (or set DTS_OUTLINE_LOG=debug)
    #[arg(short, long)]
    debug: bool,

    /// Configuration file (default: ./dts-outline.toml, then ~/.dts-outline.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a declaration file and print its outline
    Outline {
        /// Path to the declaration file
        file: PathBuf,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Link `extends` targets declared later in the same module
        #[arg(long)]
        resolve_forward_extends: bool,
        /// When to color text output
        #[arg(long, value_enum)]
        color: Option<ColorMode>,
        /// Print skipped constructs to stderr
        #[arg(long)]
        skips: bool,
    },
    /// Print the token stream of a declaration file
    Tokens {
        /// Path to the declaration file
        file: PathBuf,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("DTS_OUTLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false)
                .with_target(true)
                .with_level(true),
        )
        .init();
}

fn color_choice(mode: ColorMode, stream: atty::Stream) -> ColorChoice {
    match mode {
        ColorMode::Always => ColorChoice::Always,
        ColorMode::Never => ColorChoice::Never,
        ColorMode::Auto if atty::is(stream) => ColorChoice::Auto,
        ColorMode::Auto => ColorChoice::Never,
    }
}

fn read_source(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "reading declaration file");
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = OutlineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Outline {
            file,
            format,
            resolve_forward_extends,
            color,
            skips,
        } => {
            let mut options = config.parse.options();
            options.resolve_forward_extends |= resolve_forward_extends;
            let format = format.unwrap_or_else(|| config.output.format());
            let color = color.unwrap_or_else(|| config.output.color());
            let show_skips = skips || config.output.show_skips();

            run_outline(&file, &options, format, color, config.output.pretty(), show_skips)
        }
        Command::Tokens { file } => run_tokens(&file),
    }
}

fn run_outline(
    path: &Path,
    options: &dts_outline::ParseOptions,
    format: OutputFormat,
    color: ColorMode,
    pretty: bool,
    show_skips: bool,
) -> Result<()> {
    let source = read_source(path)?;
    let outline = parse_with_options(&source, options);
    if !outline.is_complete() {
        tracing::info!(
            skips = outline.skips.len(),
            "{} parsed with skipped constructs",
            path.display()
        );
    }

    match format {
        OutputFormat::Text => {
            let mut stdout = StandardStream::stdout(color_choice(color, atty::Stream::Stdout));
            render_text(&mut stdout, &outline)?;
        }
        OutputFormat::Json => render_json(io::stdout().lock(), &outline, pretty)?,
    }

    if show_skips {
        let mut stderr = StandardStream::stderr(color_choice(color, atty::Stream::Stderr));
        render_skips(&mut stderr, &outline)?;
    }
    Ok(())
}

fn run_tokens(path: &Path) -> Result<()> {
    use std::io::Write;

    let source = read_source(path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for token in Lexer::new(&source).tokenize() {
        writeln!(out, "{:>6} {:<18} {:?}", token.start, token.kind.as_str(), token.text)?;
    }
    Ok(())
}
