// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each prefixed by a one-byte
//! tag. [`decode`] reads them back as an iterator of [`RecordedEvent`] and
//! stops at the first unknown tag or truncated record.

use graft_core::lane::Lane;
use graft_core::reconciler::RootId;
use graft_core::time::HostTime;
use graft_core::trace::{
    AbandonEvent, CommitBeginEvent, CommitEndEvent, CommitSummary, PassBeginEvent, PreemptEvent,
    SliceEvent, TraceSink, YieldEvent, YieldReason,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PASS_BEGIN: u8 = 1;
const TAG_SLICE: u8 = 2;
const TAG_YIELD: u8 = 3;
const TAG_PREEMPT: u8 = 4;
const TAG_ABANDON: u8 = 5;
const TAG_COMMIT_BEGIN: u8 = 6;
const TAG_COMMIT_END: u8 = 7;
const TAG_COMMIT_SUMMARY: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    fn write_time(&mut self, t: HostTime) {
        self.write_u64(t.ticks());
    }

    fn write_lane(&mut self, lane: Lane) {
        self.write_u8(match lane {
            Lane::Background => 0,
            Lane::Urgent => 1,
        });
    }

    /// Tag, root, lane and pass: the prefix shared by every record.
    fn write_header(&mut self, tag: u8, root: RootId, lane: Lane, pass: u64) {
        self.write_u8(tag);
        self.write_u32(root.0);
        self.write_lane(lane);
        self.write_u64(pass);
    }
}

impl TraceSink for RecorderSink {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.write_header(TAG_PASS_BEGIN, e.root, e.lane, e.pass);
        self.write_time(e.timestamp);
        self.write_u8(u8::from(e.protected));
    }

    fn on_slice(&mut self, e: &SliceEvent) {
        self.write_header(TAG_SLICE, e.root, e.lane, e.pass);
        self.write_time(e.start);
        self.write_time(e.end);
        self.write_u32(e.items);
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.write_header(TAG_YIELD, e.root, e.lane, e.pass);
        self.write_time(e.timestamp);
        self.write_u8(match e.reason {
            YieldReason::Budget => 0,
            YieldReason::HigherPriority => 1,
        });
        self.write_u32(e.remaining);
    }

    fn on_preempt(&mut self, e: &PreemptEvent) {
        self.write_header(TAG_PREEMPT, e.root, e.lane, e.pass);
        self.write_lane(e.by);
        self.write_time(e.timestamp);
        self.write_u32(e.discarded_effects);
        self.write_u32(e.consecutive);
    }

    fn on_abandon(&mut self, e: &AbandonEvent) {
        self.write_header(TAG_ABANDON, e.root, e.lane, e.pass);
        self.write_time(e.timestamp);
    }

    fn on_commit_begin(&mut self, e: &CommitBeginEvent) {
        self.write_header(TAG_COMMIT_BEGIN, e.root, e.lane, e.pass);
        self.write_time(e.timestamp);
        self.write_u32(e.effects);
    }

    fn on_commit_end(&mut self, e: &CommitEndEvent) {
        self.write_header(TAG_COMMIT_END, e.root, e.lane, e.pass);
        self.write_time(e.timestamp);
        self.write_u32(e.applied);
        self.write_u32(e.failed);
        self.write_u32(e.skipped);
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        self.write_header(TAG_COMMIT_SUMMARY, s.root, s.lane, s.pass);
        self.write_time(s.started_at);
        self.write_time(s.committed_at);
        self.write_u32(s.slices);
        self.write_u64(s.items);
        self.write_u64(s.render_ticks);
        self.write_u64(s.commit_ticks);
        self.write_u32(s.effects);
        self.write_u32(s.failed);
        self.write_u32(s.description_errors);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PassBeginEvent`].
    PassBegin(PassBeginEvent),
    /// A [`SliceEvent`].
    Slice(SliceEvent),
    /// A [`YieldEvent`].
    Yield(YieldEvent),
    /// A [`PreemptEvent`].
    Preempt(PreemptEvent),
    /// An [`AbandonEvent`].
    Abandon(AbandonEvent),
    /// A [`CommitBeginEvent`].
    CommitBegin(CommitBeginEvent),
    /// A [`CommitEndEvent`].
    CommitEnd(CommitEndEvent),
    /// A [`CommitSummary`].
    CommitSummary(CommitSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
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
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_lane(&mut self) -> Option<Lane> {
        match self.read_u8()? {
            0 => Some(Lane::Background),
            1 => Some(Lane::Urgent),
            _ => None,
        }
    }

    fn read_header(&mut self) -> Option<(RootId, Lane, u64)> {
        Some((RootId(self.read_u32()?), self.read_lane()?, self.read_u64()?))
    }

    fn decode_pass_begin(&mut self) -> Option<RecordedEvent> {
        let (root, lane, pass) = self.read_header()?;
        Some(RecordedEvent::PassBegin(PassBeginEvent {
            root,
            lane,
            pass,
            timestamp: self.read_time()?,
            protected: self.read_u8()? != 0,
        }))
    }

    fn decode_slice(&mut self) -> Option<RecordedEvent> {
        let (root, lane, pass) = self.read_header()?;
        Some(RecordedEvent::Slice(SliceEvent {
            root,
            lane,
            pass,
            start: self.read_time()?,
            end: self.read_time()?,
            items: self.read_u32()?,
        }))
    }

    fn decode_yield(&mut self) -> Option<RecordedEvent> {
        let (root, lane, pass) = self.read_header()?;
        Some(RecordedEvent::Yield(YieldEvent {
            root,
            lane,
            pass,
            timestamp: self.read_time()?,
            reason: match self.read_u8()? {
                0 => YieldReason::Budget,
                _ => YieldReason::HigherPriority,
            },
            remaining: self.read_u32()?,
        }))
    }

    fn decode_preempt(&mut self) -> Option<RecordedEvent> {
        let (root, lane, pass) = self.read_header()?;
        Some(RecordedEvent::Preempt(PreemptEvent {
            root,
            lane,
            by: self.read_lane()?,
            pass,
            timestamp: self.read_time()?,
            discarded_effects: self.read_u32()?,
            consecutive: self.read_u32()?,
        }))
    }

    fn decode_abandon(&mut self) -> Option<RecordedEvent> {
        let (root, lane, pass) = self.read_header()?;
        Some(RecordedEvent::Abandon(AbandonEvent {
            root,
            lane,
            pass,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_commit_begin(&mut self) -> Option<RecordedEvent> {
        let (root, lane, pass) = self.read_header()?;
        Some(RecordedEvent::CommitBegin(CommitBeginEvent {
            root,
            lane,
            pass,
            timestamp: self.read_time()?,
            effects: self.read_u32()?,
        }))
    }

    fn decode_commit_end(&mut self) -> Option<RecordedEvent> {
        let (root, lane, pass) = self.read_header()?;
        Some(RecordedEvent::CommitEnd(CommitEndEvent {
            root,
            lane,
            pass,
            timestamp: self.read_time()?,
            applied: self.read_u32()?,
            failed: self.read_u32()?,
            skipped: self.read_u32()?,
        }))
    }

    fn decode_commit_summary(&mut self) -> Option<RecordedEvent> {
        let (root, lane, pass) = self.read_header()?;
        Some(RecordedEvent::CommitSummary(CommitSummary {
            root,
            lane,
            pass,
            started_at: self.read_time()?,
            committed_at: self.read_time()?,
            slices: self.read_u32()?,
            items: self.read_u64()?,
            render_ticks: self.read_u64()?,
            commit_ticks: self.read_u64()?,
            effects: self.read_u32()?,
            failed: self.read_u32()?,
            description_errors: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_PASS_BEGIN => self.decode_pass_begin(),
            TAG_SLICE => self.decode_slice(),
            TAG_YIELD => self.decode_yield(),
            TAG_PREEMPT => self.decode_preempt(),
            TAG_ABANDON => self.decode_abandon(),
            TAG_COMMIT_BEGIN => self.decode_commit_begin(),
            TAG_COMMIT_END => self.decode_commit_end(),
            TAG_COMMIT_SUMMARY => self.decode_commit_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
