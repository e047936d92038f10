//! Per-session selection state and pipeline orchestration.

use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::image::{
    preprocess, render, ExportFormat, ExportedImage, ImageSource, RasterSurface,
    DEFAULT_TARGET_SIZE,
};
use crate::model::ModelProvider;
use crate::pipeline::{StylePredictor, StylizationPipeline, StyleTransformer};
use crate::tensor::TensorTracker;

/// Session-level settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Edge length both inputs are stretched to before inference.
    pub target_size: u32,
    /// Output JPEG quality (1-100).
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            jpeg_quality: 95,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.target_size == 0 {
            return Err(Error::InvalidParameter {
                name: "target_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::InvalidParameter {
                name: "jpeg_quality".to_string(),
                reason: "must be between 1 and 100".to_string(),
            });
        }

        Ok(())
    }
}

/// What the session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Processing,
    Done,
    Failed,
}

impl Status {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Result of a generate request that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Stylization ran and the canvas now holds the result.
    Completed,
    /// Content or style is missing; nothing ran.
    NotReady,
    /// A stylization is already in flight for this session.
    Busy,
}

struct Selection {
    content: Option<Vec<u8>>,
    style: Option<ImageSource>,
}

/// Holds the current selection and drives the stylization pipeline.
///
/// At most one stylization runs per session at a time; a `generate` issued
/// while another is in flight is rejected with [`GenerateOutcome::Busy`]
/// rather than interleaved, since both would race on the canvas.
pub struct Session<P> {
    provider: P,
    config: Config,
    selection: Mutex<Selection>,
    status: Mutex<Status>,
    canvas: Mutex<Option<RasterSurface>>,
    tracker: TensorTracker,
}

impl<P> Session<P>
where
    P: ModelProvider,
    P::Models: StylePredictor + StyleTransformer,
{
    /// Create a session backed by the given model provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(provider: P, config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            config,
            selection: Mutex::new(Selection {
                content: None,
                style: None,
            }),
            status: Mutex::new(Status::Idle),
            canvas: Mutex::new(None),
            tracker: TensorTracker::new(),
        })
    }

    #[must_use]
    pub fn status(&self) -> Status {
        *self.status.lock().unwrap()
    }

    /// Count of pipeline tensors currently alive. Zero whenever no
    /// stylization is in flight.
    #[must_use]
    pub fn live_tensors(&self) -> usize {
        self.tracker.live()
    }

    /// Store uploaded content bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the bytes do not carry a known image
    /// signature, mirroring the uploader's `image/*` gate.
    pub fn upload_content(&self, bytes: Vec<u8>) -> Result<()> {
        image::guess_format(&bytes).map_err(|source| Error::Decode { source })?;
        self.selection.lock().unwrap().content = Some(bytes);
        Ok(())
    }

    /// Select the reference style.
    pub fn select_style(&self, style: ImageSource) {
        self.selection.lock().unwrap().style = Some(style);
    }

    /// Run the full preprocess, predict, transform, render flow.
    ///
    /// Refuses to run without touching the models when content or style is
    /// missing (`NotReady`) or another stylization is in flight (`Busy`).
    /// On success the canvas is overwritten and the status becomes `Done`;
    /// on failure the error is logged, the status becomes `Failed`, and the
    /// session stays retryable. All intermediate tensors are released on
    /// every path.
    ///
    /// # Errors
    ///
    /// Propagates preprocessing, model-loading, and inference failures.
    pub fn generate(&self) -> Result<GenerateOutcome> {
        let (content, style) = {
            let selection = self.selection.lock().unwrap();
            match (&selection.content, &selection.style) {
                (Some(content), Some(style)) => {
                    (ImageSource::Bytes(content.clone()), style.clone())
                }
                _ => {
                    tracing::debug!("generate skipped: content or style not selected");
                    return Ok(GenerateOutcome::NotReady);
                }
            }
        };

        {
            let mut status = self.status.lock().unwrap();
            if *status == Status::Processing {
                tracing::warn!("generate rejected: stylization already in flight");
                return Ok(GenerateOutcome::Busy);
            }
            *status = Status::Processing;
        }

        match self.run_stylization(&content, &style) {
            Ok(surface) => {
                *self.canvas.lock().unwrap() = Some(surface);
                *self.status.lock().unwrap() = Status::Done;
                tracing::info!("stylization complete");
                Ok(GenerateOutcome::Completed)
            }
            Err(err) => {
                tracing::error!("stylization failed: {err}");
                *self.status.lock().unwrap() = Status::Failed;
                Err(err)
            }
        }
    }

    fn run_stylization(&self, content: &ImageSource, style: &ImageSource) -> Result<RasterSurface> {
        let models = self.provider.models()?;

        let content_tensor = preprocess(content, self.config.target_size, &self.tracker)?;
        let style_tensor = preprocess(style, self.config.target_size, &self.tracker)?;

        let pipeline = StylizationPipeline::new(models, self.tracker.clone());
        let stylized = pipeline.stylize(content_tensor, style_tensor)?;

        let surface = render(&stylized);
        stylized.release();

        Ok(surface)
    }

    /// Encode the rendered canvas for download. Only available after a
    /// successful stylization.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing has been rendered or encoding fails.
    pub fn export(&self, format: ExportFormat) -> Result<ExportedImage> {
        let canvas = self.canvas.lock().unwrap();
        let surface = canvas.as_ref().ok_or_else(|| Error::InvalidParameter {
            name: "canvas".to_string(),
            reason: "no stylized image has been rendered".to_string(),
        })?;

        let bytes = surface.encode(format, self.config.jpeg_quality)?;
        Ok(ExportedImage::new(format, bytes))
    }

    /// Dimensions of the rendered canvas, if any.
    #[must_use]
    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        self.canvas
            .lock()
            .unwrap()
            .as_ref()
            .map(|surface| (surface.width(), surface.height()))
    }

    /// Drop the selection and canvas and return to a fresh idle session.
    pub fn reset(&self) {
        {
            let mut selection = self.selection.lock().unwrap();
            selection.content = None;
            selection.style = None;
        }
        *self.canvas.lock().unwrap() = None;
        *self.status.lock().unwrap() = Status::Idle;
    }
}
