//! Console output for profiled steps

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

// ANSI color codes
const CYAN: &str = "\x1b[01;36m";
const RESET: &str = "\x1b[0m";

/// Link to the call graph of profile `uuid`
pub fn profile_url(base_url: &str, uuid: &str) -> String {
    format!("{}/profiles/{}/graph", base_url.trim_end_matches('/'), uuid)
}

/// In-memory sink shared with a [`ProfileLinkReporter`]
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Prints one clickable profile link per profiled step
pub struct ProfileLinkReporter {
    base_url: String,
    out: Box<dyn Write + Send>,
}

impl ProfileLinkReporter {
    pub fn new(base_url: impl Into<String>, out: impl Write + Send + 'static) -> Self {
        Self {
            base_url: base_url.into(),
            out: Box::new(out),
        }
    }

    /// Reporter writing to stdout
    pub fn stdout(base_url: impl Into<String>) -> Self {
        Self::new(base_url, io::stdout())
    }

    /// Reporter writing to a buffer the caller can inspect
    pub fn buffered(base_url: impl Into<String>) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(base_url, buffer.clone()), buffer)
    }

    /// Print the link for profile `uuid`
    pub fn profile_link(&mut self, uuid: &str) {
        let url = profile_url(&self.base_url, uuid);
        tracing::info!(profile_url = %url, "Blackfire profile ready");

        if let Err(e) = writeln!(self.out, "{}  {} {}", CYAN, url, RESET) {
            tracing::warn!(error = %e, "Failed to print Blackfire profile link");
        }
    }
}

impl fmt::Debug for ProfileLinkReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileLinkReporter")
            .field("base_url", &self.base_url)
            .finish()
    }
}
