//! Per-cycle event scheduler
//!
//! Converts the absolute, latency-compensated alignment of queued events into
//! offsets within the current callback buffer.
//!
//! For a cycle starting at clock position `now` with `nframes` frames and an
//! output latency of `latency` frames, each front event is placed at
//! `mt = alignment - latency`:
//!
//! - `mt >= now + nframes`: belongs to a later cycle, draining stops
//! - `mt < now`: its time has passed, the event is dropped and counted late
//! - otherwise: written to the sink at offset `mt - now`
//!
//! The window is evaluated against the current cycle's own length, so a
//! buffer-size change between cycles never shifts an event: alignments are
//! absolute and every cycle covers exactly the frames it processes.

use thiserror::Error;

use crate::queue::EventQueue;

/// The output sink could not accept a message
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    #[error("output sink full")]
    Full,
    #[error("offset {offset} outside the output buffer")]
    OutOfRange { offset: u32 },
}

/// Destination for scheduled messages within one cycle's output buffer.
///
/// Implementations are called from the audio callback and must not block.
pub trait MidiSink {
    fn write_event(&mut self, offset: u32, bytes: &[u8]) -> Result<(), SinkError>;
}

/// What happened to the queue during one cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Events written to the sink
    pub emitted: usize,
    /// Events whose target had already elapsed
    pub late: usize,
    /// Events the sink refused
    pub rejected: usize,
    /// Draining stopped at an event for a later cycle
    pub deferred: bool,
}

/// Drain every event due in `[now, now + nframes)` into `sink`.
///
/// Inspects at most `queue.capacity()` events.
pub fn drain<S>(
    queue: &mut EventQueue,
    now: i64,
    nframes: u32,
    latency: u32,
    sink: &mut S,
) -> CycleReport
where
    S: MidiSink + ?Sized,
{
    let mut report = CycleReport::default();
    let window_end = now + nframes as i64;

    for _ in 0..queue.capacity() {
        let Some(event) = queue.peek_front() else {
            break;
        };

        let mt = event.alignment - latency as i64;
        if mt >= window_end {
            report.deferred = true;
            break;
        }

        if mt < now {
            report.late += 1;
        } else {
            let offset = (mt - now) as u32;
            match sink.write_event(offset, event.payload()) {
                Ok(()) => report.emitted += 1,
                Err(_) => report.rejected += 1,
            }
        }

        queue.pop_front();
    }

    report
}
