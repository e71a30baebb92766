// Model download helper for the ONNX classifiers.
//
// Downloads two models from HuggingFace:
// 1. toxic-bert — multi-label toxicity classification
// 2. distilbert SST-2 — binary sentiment, the first step of the sentiment chain
//
// Each model lives in its own subdirectory of the model dir
// (~/.local/share/sentinel/models/ on Linux) so it persists across runs.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// File names shared by every model subdirectory.
pub const MODEL_FILE: &str = "model_quantized.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// A downloadable model: where it lives locally and where it comes from.
pub struct ModelSource {
    pub subdir: &'static str,
    pub hf_url: &'static str,
}

pub const TOXICITY_MODEL: ModelSource = ModelSource {
    subdir: "toxic-bert",
    hf_url: "https://huggingface.co/Xenova/toxic-bert/resolve/main",
};

pub const SENTIMENT_MODEL: ModelSource = ModelSource {
    subdir: "sst2-sentiment",
    hf_url: "https://huggingface.co/Xenova/distilbert-base-uncased-finetuned-sst-2-english/resolve/main",
};

/// Returns the default directory for storing model files.
/// Uses the platform data directory: ~/.local/share/sentinel/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sentinel")
        .join("models")
}

/// Directory holding one model's files.
pub fn model_dir(base: &Path, source: &ModelSource) -> PathBuf {
    base.join(source.subdir)
}

/// Check whether a model's ONNX file and tokenizer both exist.
pub fn model_files_present(base: &Path, source: &ModelSource) -> bool {
    let dir = model_dir(base, source);
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

/// Download every model. Skips files that already exist and creates
/// directories as needed.
pub async fn download_models(base: &Path) -> Result<()> {
    for source in [&TOXICITY_MODEL, &SENTIMENT_MODEL] {
        println!("\n{} model:", source.subdir);

        let dir = model_dir(base, source);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

        for (remote, local, show_progress) in [
            (TOKENIZER_FILE.to_string(), TOKENIZER_FILE, false),
            (format!("onnx/{MODEL_FILE}"), MODEL_FILE, true),
        ] {
            let dest = dir.join(local);
            if dest.exists() {
                info!(file = %dest.display(), "Model file already exists, skipping");
                println!("  {local} (already exists)");
                continue;
            }
            println!("  Downloading {local}...");
            download_file(&format!("{}/{}", source.hf_url, remote), &dest, show_progress).await?;
        }
    }

    Ok(())
}

/// Stream a single file to disk, optionally with a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = show_progress.then(|| progress_bar(response.content_length()));

    // Write to a sibling temp file so an interrupted download never leaves a
    // truncated model behind under the real name.
    let partial = dest.with_extension("part");
    let mut file = std::fs::File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;

    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        file.write_all(&chunk)
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        if let Some(ref pb) = pb {
            pb.inc(chunk.len() as u64);
        }
    }

    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

fn progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    }
}
