//! Model artifact downloading and session loading.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ort::session::Session;

use crate::error::{Error, Result};

/// The two inference graphs of the stylization network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Style predictor - encodes a reference image into its bottleneck vector.
    StylePredictor,
    /// Style transformer - combines a content image with a bottleneck into
    /// the stylized output.
    StyleTransformer,
}

impl ModelKind {
    /// Get the filename for this model kind.
    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::StylePredictor => "style_predictor.onnx",
            Self::StyleTransformer => "style_transformer.onnx",
        }
    }

    /// Get the download URL for this model kind.
    /// ONNX exports of magenta's arbitrary-image-stylization-v1-256 graphs.
    #[must_use]
    pub const fn url(&self) -> &'static str {
        match self {
            Self::StylePredictor => {
                "https://huggingface.co/onnx-community/arbitrary-image-stylization-v1-256/resolve/main/style_predictor/model.onnx"
            }
            Self::StyleTransformer => {
                "https://huggingface.co/onnx-community/arbitrary-image-stylization-v1-256/resolve/main/style_transformer/model.onnx"
            }
        }
    }

    /// Get the approximate size in bytes for progress indication.
    #[must_use]
    pub const fn approx_size(&self) -> u64 {
        match self {
            Self::StylePredictor => 9_600_000,   // ~9.6 MB
            Self::StyleTransformer => 2_800_000, // ~2.8 MB
        }
    }
}

/// Manages the model cache directory and downloads.
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Uses the platform-appropriate cache directory:
    /// - Windows: `%LOCALAPPDATA%\stylizer\models`
    /// - Linux: `~/.cache/stylizer/models`
    /// - macOS: `~/Library/Caches/stylizer/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        let cache_dir = base.join("stylizer").join("models");

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self { cache_dir })
    }

    /// Get the path to a model file, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be downloaded or accessed.
    pub fn get_model_path(&self, kind: ModelKind) -> Result<PathBuf> {
        let path = self.cache_dir.join(kind.filename());

        if !path.exists() {
            download_model(kind, &path)?;
        }

        Ok(path)
    }

    /// Load an ONNX model session.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    pub fn load_session(&self, kind: ModelKind) -> Result<Session> {
        let path = self.get_model_path(kind)?;

        Session::builder()
            .map_err(|source| Error::ModelLoad {
                name: kind.filename().to_string(),
                source,
            })?
            .commit_from_file(&path)
            .map_err(|source| Error::ModelLoad {
                name: kind.filename().to_string(),
                source,
            })
    }
}

/// Download a model to the specified path.
fn download_model(kind: ModelKind, path: &Path) -> Result<()> {
    download_file(kind.url(), path, kind.filename(), kind.approx_size())
}

/// Download a file from a URL to a path with progress indication.
fn download_file(url: &str, path: &Path, name: &str, approx_size: u64) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|source| Error::ModelFetch {
            name: name.to_string(),
            source,
        })?;

    let total_size = response.content_length().unwrap_or(approx_size);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {name}"));

    // Write to a temporary file first, then rename for atomicity
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;

    let mut downloaded = 0u64;
    let mut reader = response;

    loop {
        let mut buffer = [0u8; 8192];
        let bytes_read = std::io::Read::read(&mut reader, &mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }

    pb.finish_with_message(format!("Downloaded {name}"));

    // Atomic rename
    fs::rename(&temp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_table_is_consistent() {
        for kind in [ModelKind::StylePredictor, ModelKind::StyleTransformer] {
            assert!(kind.filename().ends_with(".onnx"));
            assert!(kind.url().ends_with(".onnx"));
            assert!(kind.approx_size() > 0);
        }
        assert_ne!(
            ModelKind::StylePredictor.filename(),
            ModelKind::StyleTransformer.filename()
        );
    }
}
