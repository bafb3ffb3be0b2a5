// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Event instants are stored as nanoseconds since the recorder was created,
//! so recordings can be decoded after the process that made them is gone.

use std::time::{Duration, Instant};

use kurbo::Vec2;
use scopekit_core::gesture::RescaleDirection;
use scopekit_core::job::{JobId, WidgetId};
use scopekit_core::layer::Layer;
use scopekit_core::trace::{
    CompletionEvent, DemandEvent, DispatchEvent, GestureEvent, SkipEvent, SkipReason, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_DISPATCH: u8 = 1;
const TAG_SKIP: u8 = 2;
const TAG_COMPLETION: u8 = 3;
const TAG_DEMAND: u8 = 4;
const TAG_GESTURE: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    epoch: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_epoch(Instant::now())
    }

    /// Creates an empty recorder measuring instants from `epoch`.
    ///
    /// Events before `epoch` are recorded at zero.
    #[must_use]
    pub fn with_epoch(epoch: Instant) -> Self {
        Self {
            buf: Vec::new(),
            epoch,
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Drops everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_duration(&mut self, d: Duration) {
        self.write_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
    }

    fn write_instant(&mut self, at: Instant) {
        self.write_duration(at.saturating_duration_since(self.epoch));
    }

    fn write_layer(&mut self, layer: Layer) {
        self.write_u8(match layer {
            Layer::Background => 0,
            Layer::Scope => 1,
            Layer::Hud => 2,
        });
    }

    fn write_reason(&mut self, reason: SkipReason) {
        self.write_u8(match reason {
            SkipReason::Hidden => 0,
            SkipReason::InFlight => 1,
            SkipReason::Deferred => 2,
            SkipReason::Ignored => 3,
        });
    }

    fn write_direction(&mut self, direction: RescaleDirection) {
        self.write_u8(match direction {
            RescaleDirection::North => 0,
            RescaleDirection::Northeast => 1,
            RescaleDirection::East => 2,
            RescaleDirection::Southeast => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_dispatch(&mut self, e: &DispatchEvent) {
        self.write_u8(TAG_DISPATCH);
        self.write_u32(e.widget.0);
        self.write_layer(e.layer);
        self.write_u64(e.job.0);
        self.write_u32(e.accel_factor);
        self.write_u32(e.coalesced);
        self.write_instant(e.at);
    }

    fn on_skip(&mut self, e: &SkipEvent) {
        self.write_u8(TAG_SKIP);
        self.write_u32(e.widget.0);
        self.write_layer(e.layer);
        self.write_reason(e.reason);
        self.write_instant(e.at);
    }

    fn on_completion(&mut self, e: &CompletionEvent) {
        self.write_u8(TAG_COMPLETION);
        self.write_u32(e.widget.0);
        self.write_layer(e.layer);
        self.write_u64(e.job.0);
        self.write_duration(e.elapsed);
        self.write_u32(e.accel_factor);
        self.write_bool(e.redispatched);
        self.write_instant(e.at);
    }

    fn on_demand(&mut self, e: &DemandEvent) {
        self.write_u8(TAG_DEMAND);
        self.write_bool(e.frames);
        self.write_bool(e.audio);
        self.write_instant(e.at);
    }

    fn on_gesture(&mut self, e: &GestureEvent) {
        self.write_u8(TAG_GESTURE);
        self.write_u32(e.widget.0);
        self.write_direction(e.direction);
        self.write_f64(e.displacement.x);
        self.write_f64(e.displacement.y);
        self.write_bool(e.handled);
        self.write_instant(e.at);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
///
/// `at` fields are offsets from the recorder's epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`DispatchEvent`].
    Dispatch {
        /// Widget owning the layer.
        widget: WidgetId,
        /// Layer being rendered.
        layer: Layer,
        /// Submitted job.
        job: JobId,
        /// Acceleration factor handed to the renderer.
        accel_factor: u32,
        /// Triggers folded into the job.
        coalesced: u32,
        /// Offset of the submission.
        at: Duration,
    },
    /// A [`SkipEvent`].
    Skip {
        /// Widget owning the layer.
        widget: WidgetId,
        /// Layer that was not rendered.
        layer: Layer,
        /// Why nothing was submitted.
        reason: SkipReason,
        /// Offset of the decision.
        at: Duration,
    },
    /// A [`CompletionEvent`].
    Completion {
        /// Widget owning the layer.
        widget: WidgetId,
        /// Layer that finished rendering.
        layer: Layer,
        /// Completed job.
        job: JobId,
        /// Render time measured by the job.
        elapsed: Duration,
        /// Acceleration factor after the completion.
        accel_factor: u32,
        /// Whether a follow-up job was dispatched.
        redispatched: bool,
        /// Offset of the completion.
        at: Duration,
    },
    /// A [`DemandEvent`].
    Demand {
        /// Frames wanted.
        frames: bool,
        /// Audio wanted.
        audio: bool,
        /// Offset of the recomputation.
        at: Duration,
    },
    /// A [`GestureEvent`].
    Gesture {
        /// Widget receiving the drag.
        widget: WidgetId,
        /// Locked direction.
        direction: RescaleDirection,
        /// Step displacement.
        displacement: Vec2,
        /// Whether the renderer changed a parameter.
        handled: bool,
        /// Offset of the step.
        at: Duration,
    },
}

impl RecordedEvent {
    /// Offset of the event from the recorder's epoch.
    #[must_use]
    pub fn at(&self) -> Duration {
        match *self {
            Self::Dispatch { at, .. }
            | Self::Skip { at, .. }
            | Self::Completion { at, .. }
            | Self::Demand { at, .. }
            | Self::Gesture { at, .. } => at,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        let v = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|v| v != 0)
    }

    fn read_duration(&mut self) -> Option<Duration> {
        self.read_u64().map(Duration::from_nanos)
    }

    fn read_layer(&mut self) -> Option<Layer> {
        Layer::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_reason(&mut self) -> Option<SkipReason> {
        Some(match self.read_u8()? {
            0 => SkipReason::Hidden,
            1 => SkipReason::InFlight,
            2 => SkipReason::Deferred,
            _ => SkipReason::Ignored,
        })
    }

    fn read_direction(&mut self) -> Option<RescaleDirection> {
        Some(match self.read_u8()? {
            0 => RescaleDirection::North,
            1 => RescaleDirection::Northeast,
            2 => RescaleDirection::East,
            _ => RescaleDirection::Southeast,
        })
    }

    fn decode_dispatch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Dispatch {
            widget: WidgetId(self.read_u32()?),
            layer: self.read_layer()?,
            job: JobId(self.read_u64()?),
            accel_factor: self.read_u32()?,
            coalesced: self.read_u32()?,
            at: self.read_duration()?,
        })
    }

    fn decode_skip(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Skip {
            widget: WidgetId(self.read_u32()?),
            layer: self.read_layer()?,
            reason: self.read_reason()?,
            at: self.read_duration()?,
        })
    }

    fn decode_completion(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Completion {
            widget: WidgetId(self.read_u32()?),
            layer: self.read_layer()?,
            job: JobId(self.read_u64()?),
            elapsed: self.read_duration()?,
            accel_factor: self.read_u32()?,
            redispatched: self.read_bool()?,
            at: self.read_duration()?,
        })
    }

    fn decode_demand(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Demand {
            frames: self.read_bool()?,
            audio: self.read_bool()?,
            at: self.read_duration()?,
        })
    }

    fn decode_gesture(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Gesture {
            widget: WidgetId(self.read_u32()?),
            direction: self.read_direction()?,
            displacement: Vec2::new(self.read_f64()?, self.read_f64()?),
            handled: self.read_bool()?,
            at: self.read_duration()?,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_DISPATCH => self.decode_dispatch(),
            TAG_SKIP => self.decode_skip(),
            TAG_COMPLETION => self.decode_completion(),
            TAG_DEMAND => self.decode_demand(),
            TAG_GESTURE => self.decode_gesture(),
            _ => None,
        }
    }
}
