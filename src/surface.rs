//! Display surfaces: where preview notices go.
//!
//! A surface is the presentation context of a displayed message (a message
//! pane, a browser tab, a terminal). The pipeline pushes
//! [`SurfaceNotice`]s to it and never waits for anything but queue space.
//!
//! # Backpressure
//!
//! Renders finish at unpredictable times and a slow consumer must not make
//! the pipeline buffer an unbounded number of JPEGs. [`ChannelSurface`] wraps
//! a bounded `tokio::sync::mpsc` channel: a full queue suspends the sending
//! render task until the consumer catches up, and a consumer that went away
//! (the user navigated to another message) turns every later notice into a
//! silent no-op.
//!
//! # Example
//!
//! ```rust
//! use attachment_preview::{channel_surface, DisplaySurface, SurfaceNotice};
//! use futures::StreamExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (surface, mut notices) = channel_surface(8);
//! surface.notify(SurfaceNotice::Placeholder).await;
//! drop(surface);
//! assert_eq!(notices.next().await, Some(SurfaceNotice::Placeholder));
//! assert_eq!(notices.next().await, None);
//! # }
//! ```

use crate::output::SurfaceNotice;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Outcome of handing a notice to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The surface accepted the notice.
    Delivered,
    /// The surface is gone; the notice was dropped.
    Detached,
}

/// Receives notices from the preview pipeline.
///
/// Implementations must be `Send + Sync`: render tasks for different pages
/// deliver concurrently. `notify` may wait for queue space but must not wait
/// for the user.
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    async fn notify(&self, notice: SurfaceNotice) -> Delivery;
}

/// Sending half of a bounded notice channel.
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    tx: mpsc::Sender<SurfaceNotice>,
}

/// Receiving half of a bounded notice channel, as a `Stream`.
pub type NoticeStream = ReceiverStream<SurfaceNotice>;

/// Create a bounded surface/stream pair holding at most `capacity` notices.
pub fn channel_surface(capacity: usize) -> (ChannelSurface, NoticeStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSurface { tx }, ReceiverStream::new(rx))
}

#[async_trait]
impl DisplaySurface for ChannelSurface {
    async fn notify(&self, notice: SurfaceNotice) -> Delivery {
        match self.tx.send(notice).await {
            Ok(()) => Delivery::Delivered,
            Err(_) => {
                debug!("surface detached, notice dropped");
                Delivery::Detached
            }
        }
    }
}

/// A surface that accepts and discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSurface;

#[async_trait]
impl DisplaySurface for NoopSurface {
    async fn notify(&self, _notice: SurfaceNotice) -> Delivery {
        Delivery::Delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CompletionSignal;
    use futures::StreamExt;

    #[tokio::test]
    async fn delivers_in_send_order() {
        let (surface, notices) = channel_surface(4);
        surface.notify(SurfaceNotice::Placeholder).await;
        surface
            .notify(SurfaceNotice::Completion(CompletionSignal {
                previews_delivered: 0,
                renders_settled: true,
            }))
            .await;
        drop(surface);

        let got: Vec<_> = notices.collect().await;
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], SurfaceNotice::Placeholder);
        assert!(matches!(got[1], SurfaceNotice::Completion(_)));
    }

    #[tokio::test]
    async fn dropped_receiver_is_a_no_op() {
        let (surface, notices) = channel_surface(1);
        drop(notices);
        assert_eq!(surface.notify(SurfaceNotice::Placeholder).await, Delivery::Detached);
    }

    #[test]
    fn noop_surface_accepts_everything() {
        let delivery = tokio_test::block_on(NoopSurface.notify(SurfaceNotice::Placeholder));
        assert_eq!(delivery, Delivery::Delivered);
    }
}
