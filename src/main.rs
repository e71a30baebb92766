use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use sentinel::config::Config;
use sentinel::content::ContentTag;
use sentinel::output::terminal;
use sentinel::pipeline::{BatchRequest, ImageSource, TextRequest};

/// Sentinel: content moderation from independent signals.
///
/// Runs every registered signal provider over a piece of content, merges
/// their scores and decides whether to allow, flag or block it.
#[derive(Parser)]
#[command(name = "sentinel", version, about)]
struct Cli {
    /// Print the result as JSON instead of the colored summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Moderate a piece of text
    Text {
        content: String,

        /// Where the text appears: text, question, answer or comment
        #[arg(long, default_value = "text")]
        content_type: String,
    },

    /// Moderate an image from a file or URL
    Image(ImageArgs),

    /// Moderate text and an image together
    Batch {
        /// Text content to moderate
        #[arg(long)]
        text: Option<String>,

        /// Where the text appears: text, question, answer or comment
        #[arg(long, default_value = "text")]
        content_type: String,

        /// Image file to moderate
        #[arg(long, conflicts_with = "url")]
        image: Option<PathBuf>,

        /// Image URL to fetch and moderate
        #[arg(long)]
        url: Option<String>,
    },

    /// Serve the moderation HTTP API
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (default: 8000)
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Address to bind (default: 0.0.0.0)
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Download the ONNX toxicity and sentiment models
    #[cfg(feature = "onnx")]
    DownloadModel,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ImageArgs {
    /// Path to the image file
    path: Option<PathBuf>,

    /// Image URL to fetch and moderate
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sentinel=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Text {
            content,
            content_type,
        } => {
            let tag: ContentTag = content_type.parse()?;
            let moderator = config.moderator()?;
            let result = moderator.moderate_text(&content, tag).await?;
            emit(cli.json, &result, || terminal::display_result("Text", &result))?;
        }

        Commands::Image(args) => {
            let source = match (args.path, args.url) {
                (Some(path), _) => ImageSource::Bytes(read_image(&path)?),
                (None, Some(url)) => ImageSource::Url(url),
                (None, None) => anyhow::bail!("provide an image path or --url"),
            };
            let moderator = config.moderator()?;
            let result = moderator.moderate_image(source).await?;
            emit(cli.json, &result, || terminal::display_result("Image", &result))?;
        }

        Commands::Batch {
            text,
            content_type,
            image,
            url,
        } => {
            let text = match text {
                Some(content) => Some(TextRequest {
                    content,
                    content_type: content_type.parse()?,
                }),
                None => None,
            };
            let image_bytes = image.as_deref().map(read_image).transpose()?;
            let request = BatchRequest::new(text, ImageSource::from_fields(image_bytes, url)?)?;

            let moderator = config.moderator()?;
            let result = moderator.moderate_batch(request).await?;
            emit(cli.json, &result, || terminal::display_batch(&result))?;
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            info!(port, bind = %bind, "Starting web server");
            sentinel::web::run_server(config, port, &bind).await?;
        }

        #[cfg(feature = "onnx")]
        Commands::DownloadModel => {
            println!("Downloading models to {}", config.model_dir.display());
            sentinel::classifier::download::download_models(&config.model_dir).await?;
            println!("\n{}", "Models ready.".green());
        }
    }

    Ok(())
}

fn read_image(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Print `value` as JSON, or run the terminal renderer.
fn emit<T: Serialize>(json: bool, value: &T, render: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        render();
        println!("{}", "\nUse --json for machine-readable output.".dimmed());
    }
    Ok(())
}
