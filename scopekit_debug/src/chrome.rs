// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Every widget becomes a process and every layer a thread within it, so
//! render jobs of one widget stack up per layer in the viewer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};
use std::time::Duration;

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Process id used for manager-wide events.
const MANAGER_PID: u32 = 0;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Completions become complete (`X`) slices spanning the measured render
/// time. Dispatches, skips, demand changes and drag steps are instant events.
/// Widget ids are offset by one so they never collide with the manager's
/// process.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Dispatch {
                widget,
                layer,
                job,
                accel_factor,
                coalesced,
                at,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Dispatch",
                    "cat": "Scheduler",
                    "ts": micros(at),
                    "pid": widget_pid(widget.0),
                    "tid": layer.index(),
                    "s": "t",
                    "args": {
                        "job": job.0,
                        "accel_factor": accel_factor,
                        "coalesced": coalesced,
                    }
                }));
            }
            RecordedEvent::Skip {
                widget,
                layer,
                reason,
                at,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Skip",
                    "cat": "Scheduler",
                    "ts": micros(at),
                    "pid": widget_pid(widget.0),
                    "tid": layer.index(),
                    "s": "t",
                    "args": {
                        "reason": format!("{reason:?}"),
                    }
                }));
            }
            RecordedEvent::Completion {
                widget,
                layer,
                job,
                elapsed,
                accel_factor,
                redispatched,
                at,
            } => {
                events.push(json!({
                    "ph": "X",
                    "name": format!("render {layer}"),
                    "cat": "Render",
                    "ts": micros(at.saturating_sub(elapsed)),
                    "dur": micros(elapsed),
                    "pid": widget_pid(widget.0),
                    "tid": layer.index(),
                    "args": {
                        "job": job.0,
                        "accel_factor": accel_factor,
                        "redispatched": redispatched,
                    }
                }));
            }
            RecordedEvent::Demand { frames, audio, at } => {
                events.push(json!({
                    "ph": "i",
                    "name": "SourceDemand",
                    "cat": "Manager",
                    "ts": micros(at),
                    "pid": MANAGER_PID,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frames": frames,
                        "audio": audio,
                    }
                }));
            }
            RecordedEvent::Gesture {
                widget,
                direction,
                displacement,
                handled,
                at,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Rescale",
                    "cat": "Gesture",
                    "ts": micros(at),
                    "pid": widget_pid(widget.0),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "direction": format!("{direction:?}"),
                        "dx": displacement.x,
                        "dy": displacement.y,
                        "handled": handled,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(&mut *writer, &events).map_err(io::Error::other)?;
    writer.flush()
}

fn micros(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000_000.0
}

fn widget_pid(widget: u32) -> u64 {
    u64::from(widget) + 1
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use scopekit_core::job::{JobId, WidgetId};
    use scopekit_core::layer::Layer;
    use scopekit_core::trace::{CompletionEvent, DemandEvent, DispatchEvent, TraceSink};

    use super::*;
    use crate::recorder::RecorderSink;

    fn exported(bytes: &[u8]) -> Vec<Value> {
        let mut out = Vec::new();
        export(bytes, &mut out).unwrap();
        match serde_json::from_slice(&out).unwrap() {
            Value::Array(events) => events,
            other => panic!("expected an array, got {other}"),
        }
    }

    #[test]
    fn empty_recording_is_an_empty_array() {
        assert!(exported(&[]).is_empty());
    }

    #[test]
    fn completion_becomes_a_slice() {
        let epoch = Instant::now();
        let mut rec = RecorderSink::with_epoch(epoch);
        rec.on_dispatch(&DispatchEvent {
            widget: WidgetId(2),
            layer: Layer::Hud,
            job: JobId(1),
            accel_factor: 1,
            coalesced: 1,
            at: epoch + Duration::from_micros(100),
        });
        rec.on_completion(&CompletionEvent {
            widget: WidgetId(2),
            layer: Layer::Hud,
            job: JobId(1),
            elapsed: Duration::from_micros(40),
            accel_factor: 1,
            redispatched: false,
            at: epoch + Duration::from_micros(150),
        });

        let events = exported(rec.as_bytes());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["ph"], "i");
        assert_eq!(events[0]["pid"], 3);
        assert_eq!(events[0]["tid"], 2);
        assert_eq!(events[1]["ph"], "X");
        assert_eq!(events[1]["name"], "render hud");
        assert!((events[1]["ts"].as_f64().unwrap() - 110.0).abs() < 1e-6);
        assert!((events[1]["dur"].as_f64().unwrap() - 40.0).abs() < 1e-6);
    }

    #[test]
    fn demand_is_a_global_instant() {
        let mut rec = RecorderSink::new();
        rec.on_demand(&DemandEvent {
            frames: true,
            audio: false,
            at: Instant::now(),
        });
        let events = exported(rec.as_bytes());
        assert_eq!(events[0]["pid"], MANAGER_PID);
        assert_eq!(events[0]["s"], "g");
        assert_eq!(events[0]["args"]["frames"], true);
    }
}
