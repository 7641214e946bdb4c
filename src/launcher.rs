//! Opening saved attachments with the desktop's default application.

use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Hands a file to whatever application the host associates with it.
///
/// Fire-and-forget: `open` returns immediately and failures are only logged.
pub trait FileOpener: Send + Sync {
    fn open(&self, path: &Path);
}

/// Opens files through the platform's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl SystemOpener {
    /// Launch the default handler for `path` without waiting for it.
    pub fn try_open(path: &Path) -> io::Result<()> {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }
        debug!("Opening {}", path.display());
        open::that_detached(path)
    }
}

impl FileOpener for SystemOpener {
    fn open(&self, path: &Path) {
        if let Err(e) = Self::try_open(path) {
            warn!("Could not open {}: {}", path.display(), e);
        }
    }
}
