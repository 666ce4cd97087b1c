//! Shared helpers: capture JSON log lines emitted through `JsonFormatter`.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use correlog::formatter::JsonFormatter;
use serde_json::Value;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Capture {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    /// Parsed log documents, in emission order.
    pub fn lines(&self) -> Vec<Value> {
        self.text()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    pub fn at_level(&self, level: &str) -> Vec<Value> {
        self.lines()
            .into_iter()
            .filter(|l| l["level"] == level)
            .collect()
    }
}

fn json_layer<S>(capture: &Capture) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .event_format(JsonFormatter::new("orders").unwrap())
        .with_writer(capture.clone())
}

/// Route events from `correlog` and the calling test crate into a capture
/// buffer for the current thread.
pub fn capture_logs(test_target: &str) -> (Capture, DefaultGuard) {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry()
        .with(
            Targets::new()
                .with_target("correlog", tracing::Level::TRACE)
                .with_target(test_target, tracing::Level::TRACE),
        )
        .with(json_layer(&capture));
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

/// Capture every event emitted while `f` runs, unfiltered.
pub fn capture_with(f: impl FnOnce()) -> Capture {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry().with(json_layer(&capture));
    tracing::subscriber::with_default(subscriber, f);
    capture
}
