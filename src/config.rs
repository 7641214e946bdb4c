//! Configuration types for attachment previews.
//!
//! All preview behaviour is controlled through [`PreviewConfig`], built via
//! its [`PreviewConfigBuilder`]. The defaults reproduce what a message pane
//! expects out of the box: three thumbnails per PDF, each fitted into a
//! 160 × 240 px box, and a 600 × 900 popup for the full view.

use crate::error::PreviewError;
use serde::{Deserialize, Serialize};

/// A width × height box in pixels (or display units for windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: u32,
    pub height: u32,
}

impl BoxSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// When the pipeline sends its single completion notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompletionMode {
    /// After every render task of the run has finished. Every preview unit
    /// reaches the surface before the completion notice. (default)
    #[default]
    AfterRenders,
    /// As soon as all attachments have been scanned and dispatched. PDF
    /// renders may still be in flight, so the surface must count units itself.
    AfterScan,
}

/// Configuration for the preview pipeline.
///
/// Built via [`PreviewConfig::builder()`] or using
/// [`PreviewConfig::default()`].
///
/// # Example
/// ```rust
/// use attachment_preview::{BoxSize, PreviewConfig};
///
/// let config = PreviewConfig::builder()
///     .max_preview_pages(5)
///     .thumbnail_box(BoxSize::new(200, 300))
///     .build()
///     .unwrap();
/// assert_eq!(config.max_preview_pages, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Maximum thumbnails produced per PDF attachment. Default: 3.
    pub max_preview_pages: u32,

    /// Box every thumbnail is fitted into, aspect ratio preserved. Default: 160 × 240.
    pub thumbnail_box: BoxSize,

    /// Box of the popup full view. Default: 600 × 900.
    pub full_view_box: BoxSize,

    /// JPEG quality for rendered pages (1–100). Default: 85.
    pub jpeg_quality: u8,

    /// Upper bound on thumbnail generation for one PDF attachment, in seconds. Default: 30.
    pub render_timeout_secs: u64,

    /// Capacity of the outbound notice channel. Default: 32.
    pub channel_capacity: usize,

    /// When the completion notice is sent. Default: [`CompletionMode::AfterRenders`].
    pub completion: CompletionMode,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_preview_pages: 3,
            thumbnail_box: BoxSize::new(160, 240),
            full_view_box: BoxSize::new(600, 900),
            jpeg_quality: 85,
            render_timeout_secs: 30,
            channel_capacity: 32,
            completion: CompletionMode::default(),
        }
    }
}

impl PreviewConfig {
    /// Create a new builder for `PreviewConfig`.
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PreviewConfig`].
#[derive(Debug)]
pub struct PreviewConfigBuilder {
    config: PreviewConfig,
}

impl PreviewConfigBuilder {
    pub fn max_preview_pages(mut self, n: u32) -> Self {
        self.config.max_preview_pages = n;
        self
    }

    pub fn thumbnail_box(mut self, size: BoxSize) -> Self {
        self.config.thumbnail_box = size;
        self
    }

    pub fn full_view_box(mut self, size: BoxSize) -> Self {
        self.config.full_view_box = size;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn channel_capacity(mut self, n: usize) -> Self {
        self.config.channel_capacity = n.max(1);
        self
    }

    pub fn completion(mut self, mode: CompletionMode) -> Self {
        self.config.completion = mode;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PreviewConfig, PreviewError> {
        let c = &self.config;
        if c.max_preview_pages == 0 {
            return Err(PreviewError::InvalidConfig(
                "max_preview_pages must be ≥ 1".into(),
            ));
        }
        for (name, b) in [("thumbnail_box", c.thumbnail_box), ("full_view_box", c.full_view_box)] {
            if b.width == 0 || b.height == 0 {
                return Err(PreviewError::InvalidConfig(format!(
                    "{name} must be non-empty, got {}x{}",
                    b.width, b.height
                )));
            }
        }
        Ok(self.config)
    }
}
