//! rststub: generate Python stub files from reStructuredText API references.
//!
//! - **stdin mode**: `rststub < bge.logic.rst` prints one stub to stdout
//! - **file mode**: `rststub docs/api -o stubs` converts a directory of sources

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;

use rststub::render::create_renderer;
use rststub::{convert, generate, GenerateConfig, Patches};

#[derive(Parser)]
#[command(
    name = "rststub",
    about = "Generate typed Python stubs from reStructuredText API references"
)]
struct Cli {
    /// Directory of .rst sources. If omitted, reads one document from stdin.
    input: Option<PathBuf>,

    /// Output directory (required when an input directory is given)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// File name pattern matched inside the input directory
    #[arg(long, default_value = "*.rst")]
    pattern: String,

    /// Directory of patch documents and an optional blacklist.txt
    #[arg(long)]
    patches: Option<PathBuf>,

    /// Output format: stub (default), json
    #[arg(short = 'f', long, default_value = "stub")]
    format: String,

    /// Treat a lower-case name as a class unit. Can be given multiple times.
    #[arg(long = "class-name")]
    class_names: Vec<String>,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long, default_value_t = 0)]
    jobs: usize,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.input.clone() {
        Some(input) => file_mode(cli, input),
        None => stdin_mode(&cli),
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// stdin mode: one module document in, one rendered stub out.
fn stdin_mode(cli: &Cli) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let patches = match &cli.patches {
        Some(dir) => Patches::load(dir)?,
        None => Patches::empty(),
    };
    let renderer = create_renderer(&cli.format)?;
    let output = convert(&input, "<stdin>", &patches, renderer.as_ref())?;
    print!("{output}");
    Ok(())
}

/// file mode: convert every matching source below `input` into `--output`.
fn file_mode(cli: Cli, input: PathBuf) -> Result<()> {
    let output = cli
        .output
        .context("--output is required when an input directory is given")?;
    if !input.is_dir() {
        bail!("input is not a directory: {}", input.display());
    }

    let config = GenerateConfig {
        input,
        output,
        pattern: cli.pattern,
        patches: cli.patches,
        format: cli.format,
        class_names: cli.class_names,
        jobs: cli.jobs,
    };
    let summary = generate(&config).context("generation failed")?;
    if summary.failed > 0 {
        bail!(
            "{} of {} units failed",
            summary.failed,
            summary.successful + summary.failed
        );
    }
    Ok(())
}
