//! Append-only JSON lines event file
//!
//! Lines are handed to a `tracing-appender` worker thread, so recording an
//! event never waits on the disk. Dropping the sink flushes what is queued.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};

use super::{EventSink, SinkError};
use crate::event::ServiceEvent;

/// Writes one JSON object per line
pub struct JsonlFileSink {
    path: PathBuf,
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl JsonlFileSink {
    /// Open `path` for appending, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);

        Ok(Self {
            path,
            writer,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for JsonlFileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonlFileSink")
            .field("path", &self.path)
            .finish()
    }
}

impl EventSink for JsonlFileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn record(&self, event: &ServiceEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        // One write per event keeps lines whole on the worker side.
        self.writer.clone().write_all(&line)?;
        tracing::trace!(path = %self.path.display(), service = %event.service_name, "queued event for file");
        Ok(())
    }
}
