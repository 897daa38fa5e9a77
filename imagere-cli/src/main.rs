mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use imagere_core::TransformParams;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "imagere")]
#[command(about = "Resize, convert and recompress images locally or through an Imagere server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform image files locally
    Process {
        /// Directories or files to process
        #[arg(required = true)]
        paths: Vec<String>,

        #[command(flatten)]
        transform: TransformArgs,

        /// Directory the results are written to
        #[arg(short, long)]
        out_dir: PathBuf,
    },

    /// Send one image to an Imagere server and save the result
    Upload {
        /// Image file to upload
        file: PathBuf,

        #[command(flatten)]
        transform: TransformArgs,

        /// Server base URL
        #[arg(short, long, env = "IMAGERE_SERVER", default_value = "http://localhost:3000")]
        server: String,

        /// Where to write the processed image (default: processed-image.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct TransformArgs {
    /// Maximum width in pixels
    #[arg(long)]
    width: Option<String>,

    /// Maximum height in pixels
    #[arg(long)]
    height: Option<String>,

    /// Quality for JPEG and WebP output (1-100)
    #[arg(short, long)]
    quality: Option<String>,

    /// Output format: jpeg, png or webp (default: keep the original)
    #[arg(short, long)]
    format: Option<String>,
}

impl TransformArgs {
    fn params(&self) -> Result<TransformParams> {
        Ok(TransformParams::parse(
            self.width.as_deref(),
            self.height.as_deref(),
            self.quality.as_deref(),
            self.format.as_deref(),
        )?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imagere_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            paths,
            transform,
            out_dir,
        } => {
            commands::process::execute(paths, transform.params()?, out_dir)?;
        }
        Commands::Upload {
            file,
            transform,
            server,
            output,
        } => {
            commands::upload::execute(file, transform.params()?, server, output).await?;
        }
    }

    Ok(())
}
