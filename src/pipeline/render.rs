//! Render backends: open PDF bytes and rasterise individual pages.
//!
//! The pipeline only depends on the [`RenderBackend`] / [`PreviewDocument`]
//! pair, so hosts with their own rasteriser (or tests) can plug in without
//! pdfium. [`PdfiumBackend`] is the production implementation.
//!
//! ## Blocking calls
//!
//! pdfium wraps a C++ library with thread-local state that is not safe to
//! drive from async code. Backend methods are plain blocking calls and the
//! pipeline moves every one of them onto `tokio::task::spawn_blocking`, so a
//! slow page never stalls the executor threads delivering other previews.
//!
//! ## One load per page
//!
//! A pdfium `PdfDocument` borrows its `Pdfium` binding and cannot cross
//! threads on its own. Each page render is an independent blocking task, so
//! [`PdfiumDocument`] keeps the bytes and the page sizes it measured at open
//! time and reloads the document inside each task. For the handful of pages a
//! preview needs this costs far less than the rasterisation itself.

use crate::error::{PageError, PreviewError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Intrinsic page size at scale 1.0, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Something that can open PDF bytes into a [`PreviewDocument`].
pub trait RenderBackend: Send + Sync {
    /// Open a document. Blocking.
    ///
    /// Fails with [`PreviewError::RenderBackend`] when the bytes are not a PDF
    /// the backend can read.
    fn open(&self, part_name: &str, bytes: Arc<[u8]>) -> Result<Arc<dyn PreviewDocument>, PreviewError>;
}

/// An opened document. Pages are 1-based. All methods are blocking.
pub trait PreviewDocument: Send + Sync {
    fn page_count(&self) -> u32;

    /// Size of the page at scale 1.0.
    fn page_size(&self, page: u32) -> Result<PageSize, PageError>;

    /// Rasterise a page into (at most) `width` × `height` pixels.
    fn render_page(&self, page: u32, width: u32, height: u32) -> Result<DynamicImage, PageError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Environment variable naming an explicit pdfium library to load.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// pdfium-backed renderer.
///
/// Binds to the library at `library_path` when set, otherwise to the
/// platform's system pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_path: Option<PathBuf>,
}

impl PdfiumBackend {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    /// Honour `PDFIUM_LIB_PATH` when set and non-empty.
    pub fn from_env() -> Self {
        let library_path = std::env::var(PDFIUM_LIB_PATH_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::new(library_path)
    }

    /// Bind to pdfium. Cheap after the first call: the OS keeps the library loaded.
    pub fn bind(&self) -> Result<Pdfium, PreviewError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| PreviewError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

impl RenderBackend for PdfiumBackend {
    fn open(&self, part_name: &str, bytes: Arc<[u8]>) -> Result<Arc<dyn PreviewDocument>, PreviewError> {
        if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
            return Err(PreviewError::RenderBackend {
                part_name: part_name.to_string(),
                detail: format!("not a PDF, first bytes {:?}", &bytes[..4]),
            });
        }

        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&bytes, None)
            .map_err(|e| open_error(part_name, e))?;

        let page_sizes: Vec<PageSize> = document
            .pages()
            .iter()
            .map(|page| PageSize {
                width: page.width().value,
                height: page.height().value,
            })
            .collect();
        info!("{}: PDF loaded, {} pages", part_name, page_sizes.len());

        drop(document);
        Ok(Arc::new(PdfiumDocument {
            backend: self.clone(),
            part_name: part_name.to_string(),
            bytes,
            page_sizes,
        }))
    }
}

fn open_error(part_name: &str, e: PdfiumError) -> PreviewError {
    let err_str = format!("{:?}", e);
    let detail = if err_str.contains("Password") || err_str.contains("password") {
        "document is encrypted".to_string()
    } else {
        err_str
    };
    PreviewError::RenderBackend {
        part_name: part_name.to_string(),
        detail,
    }
}

/// A PDF opened through [`PdfiumBackend`].
pub struct PdfiumDocument {
    backend: PdfiumBackend,
    part_name: String,
    bytes: Arc<[u8]>,
    page_sizes: Vec<PageSize>,
}

impl PreviewDocument for PdfiumDocument {
    fn page_count(&self) -> u32 {
        self.page_sizes.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize, PageError> {
        page.checked_sub(1)
            .and_then(|idx| self.page_sizes.get(idx as usize))
            .copied()
            .ok_or_else(|| PageError::RenderFailed {
                page,
                detail: format!("out of range (document has {} pages)", self.page_sizes.len()),
            })
    }

    fn render_page(&self, page: u32, width: u32, height: u32) -> Result<DynamicImage, PageError> {
        let fail = |detail: String| PageError::RenderFailed { page, detail };

        let index = page
            .checked_sub(1)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| fail("page index out of range".into()))?;

        let pdfium = self.backend.bind().map_err(|e| fail(e.to_string()))?;
        let document = pdfium
            .load_pdf_from_byte_slice(&self.bytes, None)
            .map_err(|e| fail(format!("{:?}", e)))?;

        let pdf_page = document
            .pages()
            .get(index)
            .map_err(|e| fail(format!("{:?}", e)))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_maximum_height(height as i32);

        let bitmap = pdf_page
            .render_with_config(&render_config)
            .map_err(|e| fail(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!(
            "{}: rendered page {} → {}x{} px",
            self.part_name,
            page,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
