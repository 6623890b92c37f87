use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::fetcher::Fetcher;
use crate::models::ExtractedSaleText;
use crate::utils::error::{AppError, Result};

/// Text recognition over a decoded image.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &DynamicImage) -> Result<String>;
}

/// Runs the `tesseract` executable, feeding a PNG on stdin and reading text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: String,
    language: Option<String>,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            program: config.tesseract_path.clone(),
            language: config.language.clone(),
        }
    }

    /// Invokes `tesseract --version` to confirm the configured binary runs.
    pub async fn ensure_available(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;
        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(AppError::Ocr(format!("{} not available (exit status {})", self.program, s))),
            Err(e) => Err(AppError::Ocr(format!("{} not available: {}", self.program, e))),
        }
    }

    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageOutputFormat::Png)
            .map_err(|e| AppError::Ocr(format!("failed to encode image for OCR: {}", e)))?;
        Ok(buffer)
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let png = Self::encode_png(image)?;

        let mut command = Command::new(&self.program);
        command.arg("stdin").arg("stdout");
        if let Some(language) = &self.language {
            command.arg("-l").arg(language);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Ocr(format!("failed to spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .await
                .map_err(|e| AppError::Ocr(format!("failed to pipe image to {}: {}", self.program, e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AppError::Ocr(format!("failed to wait for {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(AppError::Ocr(format!(
                "{} exited with status {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Tesseract ends every page with a form feed.
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Downloads a banner and reads its text. Failures are logged and surface as `None`,
/// so one bad image never stops the caller's loop.
#[derive(Clone)]
pub struct ImageTextExtractor {
    fetcher: Fetcher,
    engine: Arc<dyn OcrEngine>,
}

impl ImageTextExtractor {
    pub fn new(fetcher: Fetcher, engine: Arc<dyn OcrEngine>) -> Self {
        Self { fetcher, engine }
    }

    pub async fn extract_text(&self, image_url: &str) -> ExtractedSaleText {
        match self.try_extract_text(image_url).await {
            Ok(text) => {
                if text.is_empty() {
                    debug!(url = image_url, "OCR found no text");
                } else {
                    info!(url = image_url, text = %text, "Extracted sale text");
                }
                Some(text)
            }
            Err(e) => {
                warn!(url = image_url, kind = e.kind(), error = %e, "Error processing image");
                None
            }
        }
    }

    pub async fn try_extract_text(&self, image_url: &str) -> Result<String> {
        let bytes = self.fetcher.fetch(image_url).await?;
        let image = decode_image(&bytes)?;
        self.engine.recognize(&image).await
    }
}
