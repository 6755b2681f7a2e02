use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "glaze", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP filter service.
    Serve(ServeArgs),
    /// Apply a filter to a local image file (no network, for smoke tests).
    Apply(ApplyArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Directory of overlay asset images.
    #[arg(long, default_value = "assets/filter")]
    assets: PathBuf,

    /// Per-request timeout for fetching the source image, in seconds.
    #[arg(long, default_value_t = 15)]
    fetch_timeout: u64,
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input image path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Filter name (built-in or overlay asset stem).
    #[arg(long)]
    filter: String,

    /// Output path; the extension is replaced to match the result.
    #[arg(long)]
    out: PathBuf,

    /// Directory of overlay asset images.
    #[arg(long, default_value = "assets/filter")]
    assets: PathBuf,

    /// Pin the jpegify quality (1-11) instead of sampling it.
    #[arg(long)]
    jpeg_quality: Option<u8>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glaze=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Serve(args) => cmd_serve(args),
        Command::Apply(args) => cmd_apply(args),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let state = glaze::AppState::new(args.assets, Duration::from_secs(args.fetch_timeout))?;
    tokio::runtime::Runtime::new()
        .context("build tokio runtime")?
        .block_on(glaze::serve(args.addr, state))
}

fn cmd_apply(args: ApplyArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read input '{}'", args.in_path.display()))?;

    let mut filter = {
        let mut rng = rand::rng();
        glaze::ResolvedFilter::resolve(&args.filter, &args.assets, &mut rng)?
    };
    if let Some(quality) = args.jpeg_quality {
        anyhow::ensure!(
            (1..=11).contains(&quality),
            "--jpeg-quality must be in 1..=11"
        );
        match &mut filter {
            glaze::ResolvedFilter::Jpegify { quality: q } => *q = quality,
            _ => anyhow::bail!("--jpeg-quality only applies to the jpegify filter"),
        }
    }

    let rendered = glaze::render(&bytes, &filter)?;
    let out = args.out.with_extension(rendered.format.extension());
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&out, &rendered.bytes)
        .with_context(|| format!("write output '{}'", out.display()))?;

    eprintln!("wrote {}", out.display());
    Ok(())
}
