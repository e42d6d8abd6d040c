//! Logging
//!
//! Components never reach for the process-wide subscriber on their own. They
//! receive a [`Logger`] at construction and run their work under it:
//!
//! - async work through `WithSubscriber::with_subscriber`
//! - synchronous transforms through `tracing::dispatcher::with_default`
//!
//! Formatted events are written through a [`LogChannel`]: every event becomes
//! one message on a single ordered channel drained by a dedicated writer
//! thread, so lines from concurrent callers never interleave. The channel is
//! unbounded; a stalled sink never blocks the code doing the logging.
//!
//! ```text
//! caller A ─┐
//! caller B ─┼─▶ mpsc channel ─▶ writer thread ─▶ sink (stderr / file)
//! caller C ─┘
//! ```

use crate::config::{LogFormat, LoggingConfig};
use std::future::Future;
use std::io::{self, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing::{Dispatch, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Injected logger handed to the orchestrator, normalizer and connection
#[derive(Debug, Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Capture the subscriber active at the call site
    pub fn current() -> Self {
        Self::new(tracing::dispatcher::get_default(|d| d.clone()))
    }

    /// A logger that discards everything
    pub fn disabled() -> Self {
        Self::new(Dispatch::none())
    }

    pub fn from_subscriber<S>(subscriber: S) -> Self
    where
        S: Subscriber + Send + Sync + 'static,
    {
        Self::new(Dispatch::new(subscriber))
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run a synchronous closure with this logger as the default subscriber
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Attach this logger to a future for every poll
    pub fn instrument<F: Future>(&self, future: F) -> WithDispatch<F> {
        future.with_subscriber(self.dispatch.clone())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::current()
    }
}

enum LogMessage {
    Line(Vec<u8>),
    Flush(SyncSender<()>),
}

/// Serialized log sink
///
/// Cloning shares the same channel and writer thread. The thread exits once
/// every clone is dropped.
#[derive(Debug, Clone)]
pub struct LogChannel {
    sender: Sender<LogMessage>,
}

impl LogChannel {
    /// Start a writer thread draining into `sink`
    pub fn new<W>(sink: W) -> io::Result<Self>
    where
        W: Write + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        std::thread::Builder::new()
            .name("vitalis-log".into())
            .spawn(move || drain(receiver, sink))?;
        Ok(Self { sender })
    }

    pub fn stderr() -> io::Result<Self> {
        Self::new(io::stderr())
    }

    /// Append to a log file, creating it if needed
    pub fn file(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Self::new(file)
    }

    /// Sink selected by the logging configuration
    pub fn from_config(config: &LoggingConfig) -> io::Result<Self> {
        match &config.file {
            Some(path) => Self::file(Path::new(path)),
            None => Self::stderr(),
        }
    }

    /// Block until every line queued so far has been written
    pub fn flush(&self) {
        let (ack, done) = mpsc::sync_channel(1);
        if self.sender.send(LogMessage::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }
}

fn drain<W: Write>(receiver: Receiver<LogMessage>, mut sink: W) {
    for message in receiver {
        match message {
            LogMessage::Line(line) => {
                // Nowhere left to report a broken sink
                let _ = sink.write_all(&line);
            }
            LogMessage::Flush(ack) => {
                let _ = sink.flush();
                let _ = ack.send(());
            }
        }
    }
    let _ = sink.flush();
}

/// Buffers one formatted event and queues it when dropped
pub struct LogLineWriter {
    sender: Sender<LogMessage>,
    buf: Vec<u8>,
}

impl Write for LogLineWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogLineWriter {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);
            let _ = self.sender.send(LogMessage::Line(line));
        }
    }
}

impl<'a> MakeWriter<'a> for LogChannel {
    type Writer = LogLineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogLineWriter {
            sender: self.sender.clone(),
            buf: Vec::with_capacity(256),
        }
    }
}

/// Formatting layer writing `format` output into `channel`
pub fn fmt_layer<S>(format: LogFormat, channel: LogChannel) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(channel)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(channel)
            .boxed(),
    }
}

/// Level filter from a configured directive, falling back to `info`
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("invalid log level '{}': {}; using info", level, e);
        EnvFilter::new("info")
    })
}

/// Build a self-contained dispatch for an injected [`Logger`]
pub fn build_dispatch(config: &LoggingConfig, channel: LogChannel) -> Dispatch {
    let subscriber = tracing_subscriber::registry()
        .with(env_filter(&config.level))
        .with(fmt_layer(config.format, channel));
    Dispatch::new(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn json_config() -> LoggingConfig {
        LoggingConfig {
            level: "info".into(),
            format: LogFormat::Json,
            file: None,
        }
    }

    #[test]
    fn test_concurrent_lines_stay_whole() {
        let buf = SharedBuf::default();
        let channel = LogChannel::new(buf.clone()).unwrap();
        let logger = Logger::new(build_dispatch(&json_config(), channel.clone()));

        let handles: Vec<_> = (0..8)
            .map(|thread| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    for seq in 0..50 {
                        logger.in_scope(|| tracing::info!(thread, seq, "tick"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        channel.flush();

        let output = buf.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 400);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["fields"]["message"], "tick");
        }
    }

    #[test]
    fn test_level_filter_applies() {
        let buf = SharedBuf::default();
        let channel = LogChannel::new(buf.clone()).unwrap();
        let config = LoggingConfig {
            level: "warn".into(),
            ..json_config()
        };
        let logger = Logger::new(build_dispatch(&config, channel.clone()));

        logger.in_scope(|| {
            tracing::info!("hidden");
            tracing::warn!("shown");
        });
        channel.flush();

        let output = buf.contents();
        assert!(output.contains("shown"));
        assert!(!output.contains("hidden"));
    }

    #[tokio::test]
    async fn test_instrumented_future_uses_injected_logger() {
        let buf = SharedBuf::default();
        let channel = LogChannel::new(buf.clone()).unwrap();
        let logger = Logger::new(build_dispatch(&json_config(), channel.clone()));

        logger
            .instrument(async {
                tokio::task::yield_now().await;
                tracing::info!(step = 2, "after yield");
            })
            .await;
        channel.flush();

        assert!(buf.contents().contains("after yield"));
    }

    /// Sink that holds its first write until the gate opens
    struct GatedSink {
        gate: Option<Receiver<()>>,
        buf: SharedBuf,
    }

    impl Write for GatedSink {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            if let Some(gate) = self.gate.take() {
                let _ = gate.recv();
            }
            self.buf.write(bytes)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_stalled_sink_does_not_block_callers() {
        let buf = SharedBuf::default();
        let (open, gate) = mpsc::channel();
        let channel = LogChannel::new(GatedSink {
            gate: Some(gate),
            buf: buf.clone(),
        })
        .unwrap();
        let logger = Logger::new(build_dispatch(&json_config(), channel.clone()));

        let (done, finished) = mpsc::channel();
        std::thread::spawn(move || {
            for seq in 0..5000 {
                logger.in_scope(|| tracing::info!(seq, "queued"));
            }
            let _ = done.send(());
        });
        assert!(finished
            .recv_timeout(std::time::Duration::from_secs(10))
            .is_ok());

        open.send(()).unwrap();
        channel.flush();
        assert_eq!(buf.contents().lines().count(), 5000);
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let buf = SharedBuf::default();
        let channel = LogChannel::new(buf.clone()).unwrap();
        Logger::disabled().in_scope(|| tracing::error!("dropped"));
        channel.flush();
        assert!(buf.contents().is_empty());
    }
}
