//! Injected output destinations
//!
//! The engine never prints through globals. It writes to the two [`Sink`]s of an [`OutputSinks`] value handed to it
//! at construction: `out` for progress and reports, `err` for diagnostics and live script stderr.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// A cloneable, internally synchronised writer. Clones share the same destination.
#[derive(Clone)]
pub struct Sink {
    inner: Arc<Mutex<dyn Write + Send>>,
}

impl Sink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// A sink that drops everything written to it.
    pub fn null() -> Self {
        Self::new(io::sink())
    }

    /// A sink backed by a fresh [`CaptureBuffer`], returned alongside it.
    pub fn capture() -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, dyn Write + Send + 'static>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("output sink lock poisoned"))
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        // Hold the lock for the whole chunk so concurrent writers never interleave mid-line
        self.lock()?.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}

/// Shared in-memory byte buffer, safe to write from several tasks at once.
#[derive(Clone, Default, Debug)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        match self.bytes.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::other("capture buffer lock poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The pair of sinks the engine writes to.
#[derive(Clone, Debug)]
pub struct OutputSinks {
    /// Progress lines, verdicts, reports, live script stdout
    pub out: Sink,
    /// Diagnostics, live script stderr, timeout markers in verbose mode
    pub err: Sink,
}

impl OutputSinks {
    pub fn new(out: Sink, err: Sink) -> Self {
        Self { out, err }
    }

    /// The process's own stdout and stderr.
    pub fn standard() -> Self {
        Self::new(Sink::stdout(), Sink::stderr())
    }

    /// Discard all output.
    pub fn null() -> Self {
        Self::new(Sink::null(), Sink::null())
    }
}
