//! Real-time safe anomaly counters
//!
//! The audio callback never logs. Everything worth reporting is counted here
//! with relaxed atomics, and a monitor task on the tokio runtime turns
//! counter deltas into log lines.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::scheduler::CycleReport;

/// Monitor poll period
const MONITOR_INTERVAL: Duration = Duration::from_millis(100);

/// Cycles between periodic health lines (debug level)
const HEALTH_EVERY_CYCLES: u64 = 3000;

/// Callback periods above this get a one-time advisory
pub const ADVISED_MAX_PERIOD: u32 = 256;

/// Lock-free counters shared between the callback and the monitor.
///
/// All `record_*` methods are **REAL-TIME SAFE**: atomic operations only.
#[derive(Debug, Default)]
pub struct Diagnostics {
    cycles: AtomicU64,
    frames_decoded: AtomicU64,
    events_emitted: AtomicU64,
    late_events: AtomicU64,
    rejected_events: AtomicU64,
    queue_overflows: AtomicU64,
    oversized_buffers: AtomicU64,
    decoder_overflows: AtomicU64,
    discontinuities: AtomicU64,
    sequence_restarts: AtomicU64,
    unsupported_rate_warnings: AtomicU64,
    last_unsupported_rate: AtomicU32,
    dispatch_drops: AtomicU64,
    clock_overflow: AtomicBool,
    /// Frames in the most recent cycle
    period: AtomicU32,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, nframes: u32, report: &CycleReport) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.period.store(nframes, Ordering::Relaxed);
        if report.emitted > 0 {
            self.events_emitted
                .fetch_add(report.emitted as u64, Ordering::Relaxed);
        }
        if report.late > 0 {
            self.late_events.fetch_add(report.late as u64, Ordering::Relaxed);
        }
        if report.rejected > 0 {
            self.rejected_events
                .fetch_add(report.rejected as u64, Ordering::Relaxed);
        }
    }

    pub fn record_frame_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_overflow(&self) {
        self.queue_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversized_buffer(&self) {
        self.oversized_buffers.fetch_add(1, Ordering::Relaxed);
    }

    /// Decoder overflow is reported as a running total by the decoder
    pub fn set_decoder_overflows(&self, total: u64) {
        self.decoder_overflows.store(total, Ordering::Relaxed);
    }

    pub fn record_discontinuity(&self) {
        self.discontinuities.fetch_add(1, Ordering::Relaxed);
    }

    /// Timecode resumed after a dropout
    pub fn record_sequence_restart(&self) {
        self.sequence_restarts.fetch_add(1, Ordering::Relaxed);
    }

    /// Start of a streak of frames at a rate MTC cannot express
    pub fn record_unsupported_rate(&self, fps: u32) {
        self.last_unsupported_rate.store(fps, Ordering::Relaxed);
        self.unsupported_rate_warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch_drop(&self) {
        self.dispatch_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clock_overflow(&self) {
        self.clock_overflow.store(true, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            late_events: self.late_events.load(Ordering::Relaxed),
            rejected_events: self.rejected_events.load(Ordering::Relaxed),
            queue_overflows: self.queue_overflows.load(Ordering::Relaxed),
            oversized_buffers: self.oversized_buffers.load(Ordering::Relaxed),
            decoder_overflows: self.decoder_overflows.load(Ordering::Relaxed),
            discontinuities: self.discontinuities.load(Ordering::Relaxed),
            sequence_restarts: self.sequence_restarts.load(Ordering::Relaxed),
            unsupported_rate_warnings: self.unsupported_rate_warnings.load(Ordering::Relaxed),
            last_unsupported_rate: self.last_unsupported_rate.load(Ordering::Relaxed),
            dispatch_drops: self.dispatch_drops.load(Ordering::Relaxed),
            clock_overflow: self.clock_overflow.load(Ordering::Relaxed),
            period: self.period.load(Ordering::Relaxed),
        }
    }

    /// Spawn the task that polls the counters and logs what changed.
    ///
    /// Polls every 100ms. **Returns:** shutdown flag (set to true to stop)
    pub fn spawn_monitoring_task(self: Arc<Self>, rt_handle: tokio::runtime::Handle) -> Arc<AtomicBool> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        rt_handle.spawn(async move {
            debug!("Diagnostics monitor started");
            let mut last = self.snapshot();
            let mut period_reported = false;

            while !shutdown_clone.load(Ordering::Relaxed) {
                tokio::time::sleep(MONITOR_INTERVAL).await;
                let current = self.snapshot();
                if !period_reported && current.period > 0 {
                    period_reported = true;
                    report_period(current.period);
                }
                report_changes(&last, &current);
                last = current;
            }

            let totals = self.snapshot();
            info!(
                "Diagnostics totals: {} cycles, {} frames decoded, {} events emitted, {} late, {} queue overflows",
                totals.cycles,
                totals.frames_decoded,
                totals.events_emitted,
                totals.late_events,
                totals.queue_overflows
            );
        });

        shutdown
    }
}

fn report_period(period: u32) {
    info!("Audio callback period: {} frames", period);
    if period > ADVISED_MAX_PERIOD {
        info!(
            "Period of {} frames is large; timecode output jitters by up to one period. \
             Consider a period of {} frames or less",
            period, ADVISED_MAX_PERIOD
        );
    }
}

/// Log the differences between two snapshots
fn report_changes(last: &DiagnosticsSnapshot, current: &DiagnosticsSnapshot) {
    let delta = current.delta(last);

    if delta.late_events > 0 {
        warn!(
            "Late MTC events dropped: +{} ({} total); latency compensation may be too large",
            delta.late_events, current.late_events
        );
    }
    if delta.queue_overflows > 0 {
        warn!(
            "Event queue exhausted, {} events dropped ({} total)",
            delta.queue_overflows, current.queue_overflows
        );
    }
    if delta.oversized_buffers > 0 {
        warn!(
            "Audio buffer too large to decode, {} cycles skipped ({} total)",
            delta.oversized_buffers, current.oversized_buffers
        );
    }
    if delta.decoder_overflows > 0 {
        warn!(
            "LTC decoder queue overflow: {} frames lost ({} total)",
            delta.decoder_overflows, current.decoder_overflows
        );
    }
    if delta.discontinuities > 0 {
        warn!(
            "Timecode discontinuity: +{} ({} total)",
            delta.discontinuities, current.discontinuities
        );
    }
    if delta.sequence_restarts > 0 {
        info!(
            "LTC resumed after a dropout ({} total)",
            current.sequence_restarts
        );
    }
    if let Some(message) =
        unsupported_rate_warning(delta.unsupported_rate_warnings, current.last_unsupported_rate)
    {
        warn!("{}", message);
    }
    if delta.rejected_events > 0 {
        warn!(
            "MIDI dispatch ring full, {} messages dropped ({} total)",
            delta.rejected_events, current.rejected_events
        );
    }
    if delta.dispatch_drops > 0 {
        warn!(
            "MIDI send failed for {} messages ({} total)",
            delta.dispatch_drops, current.dispatch_drops
        );
    }
    if current.clock_overflow && !last.clock_overflow {
        warn!("Sample clock overflow; timing is no longer reliable");
    }

    if current.cycles > last.cycles
        && current.cycles / HEALTH_EVERY_CYCLES != last.cycles / HEALTH_EVERY_CYCLES
    {
        debug!(
            "Translator health: {} cycles, {} frames decoded, {} events emitted, {} late",
            current.cycles, current.frames_decoded, current.events_emitted, current.late_events
        );
    }
}

/// Warning for `streaks` new runs of unsupported-rate frames, `None` if there
/// were none. Only the most recent rate is known.
fn unsupported_rate_warning(streaks: u64, last_rate: u32) -> Option<String> {
    match streaks {
        0 => None,
        1 => Some(format!(
            "Unsupported frame rate {} fps, using the 25 fps MTC code",
            last_rate
        )),
        n => Some(format!(
            "Unsupported frame rate in {} new streaks (latest {} fps), using the 25 fps MTC code",
            n, last_rate
        )),
    }
}

/// Point-in-time copy of [`Diagnostics`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub cycles: u64,
    pub frames_decoded: u64,
    pub events_emitted: u64,
    pub late_events: u64,
    pub rejected_events: u64,
    pub queue_overflows: u64,
    pub oversized_buffers: u64,
    pub decoder_overflows: u64,
    pub discontinuities: u64,
    pub sequence_restarts: u64,
    pub unsupported_rate_warnings: u64,
    pub last_unsupported_rate: u32,
    pub dispatch_drops: u64,
    pub clock_overflow: bool,
    /// Frames in the most recent cycle
    pub period: u32,
}

impl DiagnosticsSnapshot {
    /// Counter increases since `earlier`
    pub fn delta(&self, earlier: &DiagnosticsSnapshot) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            cycles: self.cycles.saturating_sub(earlier.cycles),
            frames_decoded: self.frames_decoded.saturating_sub(earlier.frames_decoded),
            events_emitted: self.events_emitted.saturating_sub(earlier.events_emitted),
            late_events: self.late_events.saturating_sub(earlier.late_events),
            rejected_events: self.rejected_events.saturating_sub(earlier.rejected_events),
            queue_overflows: self.queue_overflows.saturating_sub(earlier.queue_overflows),
            oversized_buffers: self.oversized_buffers.saturating_sub(earlier.oversized_buffers),
            decoder_overflows: self.decoder_overflows.saturating_sub(earlier.decoder_overflows),
            discontinuities: self.discontinuities.saturating_sub(earlier.discontinuities),
            sequence_restarts: self.sequence_restarts.saturating_sub(earlier.sequence_restarts),
            unsupported_rate_warnings: self
                .unsupported_rate_warnings
                .saturating_sub(earlier.unsupported_rate_warnings),
            last_unsupported_rate: self.last_unsupported_rate,
            dispatch_drops: self.dispatch_drops.saturating_sub(earlier.dispatch_drops),
            clock_overflow: self.clock_overflow && !earlier.clock_overflow,
            period: self.period,
        }
    }
}
