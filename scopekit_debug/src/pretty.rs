// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Instants are
//! printed in milliseconds since the sink was created.

use std::io::Write;
use std::time::{Duration, Instant};

use scopekit_core::trace::{
    CompletionEvent, DemandEvent, DispatchEvent, GestureEvent, SkipEvent, SkipReason, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
    epoch: Instant,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            epoch: Instant::now(),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ms(&self, at: Instant) -> f64 {
        millis(at.saturating_duration_since(self.epoch))
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn reason_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Hidden => "hidden",
        SkipReason::InFlight => "in-flight",
        SkipReason::Deferred => "deferred",
        SkipReason::Ignored => "ignored",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_dispatch(&mut self, e: &DispatchEvent) {
        let _ = writeln!(
            self.writer,
            "[dispatch] {}/{} job={} accel={} coalesced={} at {:.3}ms",
            e.widget,
            e.layer,
            e.job,
            e.accel_factor,
            e.coalesced,
            self.ms(e.at),
        );
    }

    fn on_skip(&mut self, e: &SkipEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] {}/{} {} at {:.3}ms",
            e.widget,
            e.layer,
            reason_name(e.reason),
            self.ms(e.at),
        );
    }

    fn on_completion(&mut self, e: &CompletionEvent) {
        let again = if e.redispatched { " +redispatch" } else { "" };
        let _ = writeln!(
            self.writer,
            "[done] {}/{} job={} took={:.3}ms accel={}{again}",
            e.widget,
            e.layer,
            e.job,
            millis(e.elapsed),
            e.accel_factor,
        );
    }

    fn on_demand(&mut self, e: &DemandEvent) {
        let _ = writeln!(
            self.writer,
            "[demand] frames={} audio={} at {:.3}ms",
            e.frames,
            e.audio,
            self.ms(e.at),
        );
    }

    fn on_gesture(&mut self, e: &GestureEvent) {
        let handled = if e.handled { "handled" } else { "ignored" };
        let _ = writeln!(
            self.writer,
            "[gesture] {} {:?} d=({:+.0},{:+.0}) {handled}",
            e.widget, e.direction, e.displacement.x, e.displacement.y,
        );
    }
}

#[cfg(test)]
mod tests {
    use scopekit_core::job::{JobId, WidgetId};
    use scopekit_core::layer::Layer;

    use super::*;

    #[test]
    fn pretty_print_dispatch() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_dispatch(&DispatchEvent {
            widget: WidgetId(4),
            layer: Layer::Scope,
            job: JobId(9),
            accel_factor: 2,
            coalesced: 3,
            at: Instant::now(),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("[dispatch] w4/scope job=#9"), "got: {output}");
        assert!(output.contains("coalesced=3"), "got: {output}");
    }

    #[test]
    fn pretty_print_skip_and_completion() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_skip(&SkipEvent {
            widget: WidgetId(1),
            layer: Layer::Hud,
            reason: SkipReason::InFlight,
            at: Instant::now(),
        });
        sink.on_completion(&CompletionEvent {
            widget: WidgetId(1),
            layer: Layer::Hud,
            job: JobId(2),
            elapsed: Duration::from_micros(1500),
            accel_factor: 1,
            redispatched: true,
            at: Instant::now(),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("in-flight"), "got: {output}");
        assert!(lines[1].contains("took=1.500ms"), "got: {output}");
        assert!(lines[1].ends_with("+redispatch"), "got: {output}");
    }
}
