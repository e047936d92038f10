//! Stylizer CLI - generate stylized avatars from a photo and a reference style.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stylizer::{catalog, default_registry, Config, ExportFormat, GenerateOutcome, Session};

/// Generate a stylized avatar from a photo and a reference style image.
#[derive(Parser, Debug)]
#[command(name = "stylizer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input photo path.
    #[arg(value_name = "INPUT", required_unless_present = "list_styles")]
    input: Option<PathBuf>,

    /// Style to apply: a catalog label, a file path, or an http(s) URL.
    #[arg(short, long, value_name = "STYLE", required_unless_present = "list_styles")]
    style: Option<String>,

    /// Directory the stylized avatar is written to.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    out_dir: PathBuf,

    /// Export format (png or jpeg).
    #[arg(short, long, default_value = "png", value_name = "FORMAT")]
    format: ExportFormat,

    /// Output JPEG quality (1-100).
    #[arg(short, long, default_value = "95", value_name = "INT")]
    quality: u8,

    /// Edge length inputs are stretched to before inference.
    #[arg(long, default_value = "256", value_name = "INT")]
    size: u32,

    /// List the built-in style catalog and exit.
    #[arg(long)]
    list_styles: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stylizer={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    if args.list_styles {
        for style in catalog::STYLES {
            println!("{:<10} {}", style.label, style.url);
        }
        return Ok(());
    }

    let input = args.input.as_deref().context("INPUT is required")?;
    let style_arg = args.style.as_deref().context("--style is required")?;

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let config = Config {
        target_size: args.size,
        jpeg_quality: args.quality,
    };

    let registry = default_registry().context("Failed to initialize model cache")?;
    let session = Session::new(registry, config).context("Failed to initialize session")?;

    let bytes =
        fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    session
        .upload_content(bytes)
        .context("Input is not a readable image")?;

    // Catalog labels win; anything else is taken as a path or URL.
    let style = catalog::find(style_arg)
        .map(|option| catalog::resolve(option.url))
        .unwrap_or_else(|| catalog::resolve(style_arg));
    session.select_style(style);

    match session.generate().context("Failed to generate avatar")? {
        GenerateOutcome::Completed => {}
        GenerateOutcome::NotReady => anyhow::bail!("Content and style must both be selected"),
        GenerateOutcome::Busy => anyhow::bail!("A stylization is already running"),
    }

    let export = session
        .export(args.format)
        .context("Failed to encode avatar")?;
    let output = args.out_dir.join(export.file_name());
    fs::write(&output, export.bytes())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Successfully wrote {}", output.display());

    Ok(())
}
