//! The attachment preview pipeline.
//!
//! One [`PreviewPipeline::run`] handles one displayed message:
//!
//! ```text
//! list attachments
//!  │
//!  ├─ for each attachment, in MIME order
//!  │    ├─ classify        other → skip (no placeholder, no fetch)
//!  │    ├─ Placeholder     delivered before the fetch starts
//!  │    ├─ fetch bytes     failure → log, next attachment
//!  │    ├─ image           → one PreviewUnit, inline
//!  │    └─ pdf             → spawned render task (pages render concurrently,
//!  │                         each delivered as soon as it is ready)
//!  │
//!  └─ Completion          once, iff at least one placeholder went out
//! ```
//!
//! Failures never escape a run. A listing failure means there is nothing to
//! preview; fetch, open and page failures are logged, counted in the
//! [`RunReport`], and simply produce no unit.

use crate::config::{BoxSize, CompletionMode, PreviewConfig};
use crate::error::PreviewError;
use crate::output::{CompletionSignal, PreviewUnit, RunReport, SurfaceNotice};
use crate::pipeline::classify::{classify, AttachmentKind};
use crate::pipeline::encode::data_url;
use crate::pipeline::render::RenderBackend;
use crate::pipeline::thumbnail::render_page_thumbnail;
use crate::source::{AttachmentSource, MessageId};
use crate::surface::{channel_surface, Delivery, DisplaySurface, NoticeStream};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Orchestrates attachment source, render backend and display surface.
///
/// Cheap to clone: collaborators are shared behind `Arc`s.
#[derive(Clone)]
pub struct PreviewPipeline {
    source: Arc<dyn AttachmentSource>,
    backend: Arc<dyn RenderBackend>,
    config: PreviewConfig,
}

impl PreviewPipeline {
    pub fn new(
        source: Arc<dyn AttachmentSource>,
        backend: Arc<dyn RenderBackend>,
        config: PreviewConfig,
    ) -> Self {
        Self {
            source,
            backend,
            config,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub(crate) fn source(&self) -> &Arc<dyn AttachmentSource> {
        &self.source
    }

    pub(crate) fn backend(&self) -> &Arc<dyn RenderBackend> {
        &self.backend
    }

    /// Preview every attachment of `message` onto `surface`.
    ///
    /// Returns once every render task has finished, whatever the
    /// [`CompletionMode`]; the mode only decides when the surface hears about
    /// completion.
    pub async fn run(&self, message: &MessageId, surface: Arc<dyn DisplaySurface>) -> RunReport {
        let start = Instant::now();
        info!("Previewing attachments of {}", message);

        let mut report = RunReport::default();
        let attachments = match self.source.list_attachments(message).await {
            Ok(list) => list,
            Err(e) => {
                warn!("{}", e);
                report.duration_ms = start.elapsed().as_millis() as u64;
                return report;
            }
        };
        report.attachments = attachments.len();

        let tally = Arc::new(Tally::default());
        let mut renders = JoinSet::new();

        for attachment in &attachments {
            let kind = classify(&attachment.content_type);
            if !kind.is_previewable() {
                debug!(
                    "{}: skipping '{}' ({})",
                    message, attachment.part_name, attachment.content_type
                );
                continue;
            }

            report.placeholders += 1;
            surface.notify(SurfaceNotice::Placeholder).await;

            let bytes = match self
                .source
                .fetch_attachment(message, &attachment.part_name)
                .await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("{}", e);
                    tally.failed_attachments.fetch_add(1, Ordering::SeqCst);
                    continue;
                }
            };

            if kind == AttachmentKind::Image {
                let unit = PreviewUnit {
                    message_id: message.to_string(),
                    part_name: attachment.part_name.clone(),
                    page_number: None,
                    image: data_url(&attachment.content_type, &bytes),
                    is_last_of_batch: false,
                    total_expected: None,
                };
                tally.deliver(surface.as_ref(), unit).await;
                continue;
            }

            let job = PdfJob {
                backend: Arc::clone(&self.backend),
                surface: Arc::clone(&surface),
                tally: Arc::clone(&tally),
                message_id: message.to_string(),
                part_name: attachment.part_name.clone(),
                bytes: Arc::from(bytes),
                max_pages: self.config.max_preview_pages,
                target: self.config.thumbnail_box,
                jpeg_quality: self.config.jpeg_quality,
                timeout_secs: self.config.render_timeout_secs,
            };
            renders.spawn(job.run());
        }

        let renders_settled = match self.config.completion {
            CompletionMode::AfterRenders => {
                drain(&mut renders, &tally).await;
                true
            }
            CompletionMode::AfterScan => {
                reap_finished(&mut renders, &tally);
                renders.is_empty()
            }
        };

        if report.placeholders > 0 {
            let signal = CompletionSignal {
                previews_delivered: tally.previews.load(Ordering::SeqCst),
                renders_settled,
            };
            surface.notify(SurfaceNotice::Completion(signal)).await;
            report.completion_sent = true;
        }

        drain(&mut renders, &tally).await;

        report.previews = tally.previews.load(Ordering::SeqCst);
        report.failed_attachments = tally.failed_attachments.load(Ordering::SeqCst);
        report.failed_pages = tally.failed_pages.load(Ordering::SeqCst);
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "{}: {} previews from {} attachments ({} failed attachments, {} failed pages) in {}ms",
            message,
            report.previews,
            report.placeholders,
            report.failed_attachments,
            report.failed_pages,
            report.duration_ms
        );
        report
    }

    /// Run in the background, streaming notices through a bounded channel.
    ///
    /// The stream ends when the run finishes and drops its surface. With
    /// [`CompletionMode::AfterRenders`] the completion notice is the last
    /// item; with [`CompletionMode::AfterScan`] preview units may still
    /// follow it. A message with nothing to preview yields an empty stream.
    /// Dropping the stream early is fine: remaining notices are discarded
    /// and the run still finishes.
    pub fn preview_stream(&self, message: MessageId) -> (NoticeStream, JoinHandle<RunReport>) {
        let (surface, notices) = channel_surface(self.config.channel_capacity);
        let pipeline = self.clone();
        let handle = tokio::spawn(async move { pipeline.run(&message, Arc::new(surface)).await });
        (notices, handle)
    }
}

/// Run-wide counters shared with render tasks.
#[derive(Default)]
struct Tally {
    previews: AtomicUsize,
    failed_attachments: AtomicUsize,
    failed_pages: AtomicUsize,
}

impl Tally {
    async fn deliver(&self, surface: &dyn DisplaySurface, unit: PreviewUnit) {
        if surface.notify(SurfaceNotice::Preview(unit)).await == Delivery::Delivered {
            self.previews.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn drain(renders: &mut JoinSet<()>, tally: &Tally) {
    while let Some(joined) = renders.join_next().await {
        settle(joined, tally);
    }
}

/// Collect render tasks that already finished, without waiting.
fn reap_finished(renders: &mut JoinSet<()>, tally: &Tally) {
    while let Some(joined) = renders.try_join_next() {
        settle(joined, tally);
    }
}

fn settle(joined: Result<(), JoinError>, tally: &Tally) {
    if let Err(e) = joined {
        warn!("render task failed: {}", e);
        tally.failed_attachments.fetch_add(1, Ordering::SeqCst);
    }
}

/// Thumbnail generation for one PDF attachment.
struct PdfJob {
    backend: Arc<dyn RenderBackend>,
    surface: Arc<dyn DisplaySurface>,
    tally: Arc<Tally>,
    message_id: String,
    part_name: String,
    bytes: Arc<[u8]>,
    max_pages: u32,
    target: BoxSize,
    jpeg_quality: u8,
    timeout_secs: u64,
}

/// Per-attachment page accounting, readable after a timeout.
#[derive(Default)]
struct PageCount {
    expected: AtomicUsize,
    settled: AtomicUsize,
    rendered: AtomicUsize,
}

impl PdfJob {
    async fn run(self) {
        let job = Arc::new(self);
        let pages = Arc::new(PageCount::default());

        let bounded = tokio::time::timeout(
            Duration::from_secs(job.timeout_secs),
            Arc::clone(&job).thumbnails(Arc::clone(&pages)),
        )
        .await;

        let outcome = match bounded {
            Ok(result) => result,
            Err(_) => {
                let abandoned = pages
                    .expected
                    .load(Ordering::SeqCst)
                    .saturating_sub(pages.settled.load(Ordering::SeqCst));
                job.tally.failed_pages.fetch_add(abandoned, Ordering::SeqCst);
                Err(PreviewError::RenderTimeout {
                    part_name: job.part_name.clone(),
                    secs: job.timeout_secs,
                })
            }
        };

        if let Err(e) = outcome {
            warn!("{}: {}", job.message_id, e);
        }
        // A detached surface is not a render failure.
        if pages.rendered.load(Ordering::SeqCst) == 0 {
            job.tally.failed_attachments.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn thumbnails(self: Arc<Self>, pages: Arc<PageCount>) -> Result<(), PreviewError> {
        let backend = Arc::clone(&self.backend);
        let bytes = Arc::clone(&self.bytes);
        let part_name = self.part_name.clone();
        let document = tokio::task::spawn_blocking(move || backend.open(&part_name, bytes))
            .await
            .map_err(|e| PreviewError::Internal(format!("Open task panicked: {}", e)))??;

        let total = document.page_count();
        let expected = total.min(self.max_pages);
        pages.expected.store(expected as usize, Ordering::SeqCst);
        debug!(
            "{}: {} pages, previewing {}",
            self.part_name, total, expected
        );

        stream::iter(1..=expected)
            .map(|page| {
                let job = Arc::clone(&self);
                let pages = Arc::clone(&pages);
                let document = Arc::clone(&document);
                async move {
                    let target = job.target;
                    let quality = job.jpeg_quality;
                    let rendered = tokio::task::spawn_blocking(move || {
                        render_page_thumbnail(document.as_ref(), page, target, quality)
                    })
                    .await;

                    match rendered {
                        Ok(Ok(image)) => {
                            pages.rendered.fetch_add(1, Ordering::SeqCst);
                            let unit = PreviewUnit {
                                message_id: job.message_id.clone(),
                                part_name: job.part_name.clone(),
                                page_number: Some(page),
                                image,
                                is_last_of_batch: false,
                                total_expected: Some(expected),
                            };
                            job.tally.deliver(job.surface.as_ref(), unit).await;
                        }
                        Ok(Err(e)) => {
                            warn!("{}: {}", job.part_name, e);
                            job.tally.failed_pages.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            warn!("{}: page {} task failed: {}", job.part_name, page, e);
                            job.tally.failed_pages.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    pages.settled.fetch_add(1, Ordering::SeqCst);
                }
            })
            .buffer_unordered(expected.max(1) as usize)
            .collect::<Vec<()>>()
            .await;

        Ok(())
    }
}
