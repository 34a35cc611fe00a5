//! Progress logging for migration runs
//!
//! The engine reports one line before and one line after every migration it
//! runs. Where those lines go is up to the [`MigrationLogger`] it was built
//! with; [`TracingLogger`] is the default.

use std::io::Write;
use std::sync::Mutex;

/// Sink for progress lines
pub trait MigrationLogger: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> MigrationLogger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Sends progress lines to `tracing` at info level, target `migrator`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl MigrationLogger for TracingLogger {
    fn log(&self, line: &str) {
        tracing::info!(target: "migrator", "{}", line);
    }
}

/// Writes one prefixed line per entry to any writer
pub struct WriterLogger<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterLogger<W> {
    pub const PREFIX: &'static str = "migrator: ";

    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl WriterLogger<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> MigrationLogger for WriterLogger<W> {
    fn log(&self, line: &str) {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        // a broken log sink must not fail the migration
        if let Err(e) = writeln!(writer, "{}{}", Self::PREFIX, line) {
            tracing::warn!("Failed to write migration log line: {}", e);
        }
    }
}
