//! Lock-free hand-off of scheduled MTC messages
//!
//! Design:
//! - Producer (audio callback): [`DispatchSink`] implements the scheduler's
//!   sink and pushes `(cycle start, offset, bytes)` without blocking
//! - Consumer (dispatcher thread): waits until
//!   `cycle_start + offset / sample_rate`, then sends through midir
//! - A full ring rejects the message; the scheduler counts it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use tracing::{debug, info, warn};

use super::output::MessageOutput;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::queue::MAX_PAYLOAD;
use crate::scheduler::{MidiSink, SinkError};

/// Default ring capacity in messages
pub const DEFAULT_DISPATCH_CAPACITY: usize = 256;

/// How long the dispatcher sleeps when the ring is empty
const IDLE_POLL: Duration = Duration::from_micros(500);

/// A message with the wall-clock cycle it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedMessage {
    /// When the audio callback for this cycle started
    pub cycle_start: Instant,
    /// Offset within the cycle, in samples
    pub offset: u32,
    bytes: [u8; MAX_PAYLOAD],
    len: u8,
}

impl TimedMessage {
    pub fn new(cycle_start: Instant, offset: u32, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_PAYLOAD);
        let mut bytes = [0u8; MAX_PAYLOAD];
        bytes[..len].copy_from_slice(&payload[..len]);
        Self {
            cycle_start,
            offset,
            bytes,
            len: len as u8,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Wall-clock time the message is due
    pub fn due(&self, sample_rate: u32) -> Instant {
        let secs = self.offset as f64 / sample_rate.max(1) as f64;
        self.cycle_start + Duration::from_secs_f64(secs)
    }
}

/// Create a connected sink/receiver pair.
pub fn dispatch_channel(capacity: usize) -> (DispatchSink, DispatchReceiver) {
    let (producer, consumer) = HeapRb::<TimedMessage>::new(capacity.max(1)).split();
    (
        DispatchSink {
            producer,
            cycle_start: Instant::now(),
        },
        DispatchReceiver { consumer },
    )
}

/// Producer half, owned by the audio callback
pub struct DispatchSink {
    producer: HeapProd<TimedMessage>,
    cycle_start: Instant,
}

impl DispatchSink {
    /// Mark the start of a new audio cycle. Call before draining.
    pub fn begin_cycle(&mut self, start: Instant) {
        self.cycle_start = start;
    }
}

impl MidiSink for DispatchSink {
    fn write_event(&mut self, offset: u32, bytes: &[u8]) -> std::result::Result<(), SinkError> {
        self.producer
            .try_push(TimedMessage::new(self.cycle_start, offset, bytes))
            .map_err(|_| SinkError::Full)
    }
}

/// Consumer half, owned by the dispatcher thread
pub struct DispatchReceiver {
    consumer: HeapCons<TimedMessage>,
}

impl DispatchReceiver {
    pub fn try_recv(&mut self) -> Option<TimedMessage> {
        self.consumer.try_pop()
    }

    pub fn len(&self) -> usize {
        self.consumer.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

/// Thread sending dispatched messages on time.
pub struct Dispatcher {
    handle: Option<JoinHandle<Box<dyn MessageOutput>>>,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Start the dispatcher thread. It owns `output` until [`shutdown`](Self::shutdown).
    pub fn spawn(
        mut receiver: DispatchReceiver,
        mut output: Box<dyn MessageOutput>,
        sample_rate: u32,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);

        let handle = std::thread::Builder::new()
            .name("mtc-dispatch".to_string())
            .spawn(move || {
                debug!("MTC dispatcher started");
                while !stop.load(Ordering::Relaxed) {
                    let Some(message) = receiver.try_recv() else {
                        std::thread::sleep(IDLE_POLL);
                        continue;
                    };

                    let due = message.due(sample_rate);
                    let now = Instant::now();
                    if due > now {
                        std::thread::sleep(due - now);
                    }

                    if let Err(e) = output.send(message.bytes()) {
                        diagnostics.record_dispatch_drop();
                        debug!("MTC send failed: {}", e);
                    }
                }

                let unsent = receiver.len();
                if unsent > 0 {
                    debug!("MTC dispatcher discarding {} unsent messages", unsent);
                }
                debug!("MTC dispatcher stopped");
                output
            })
            .map_err(|e| Error::MidiOutput(format!("Failed to start dispatcher thread: {}", e)))?;

        Ok(Self {
            handle: Some(handle),
            shutdown,
        })
    }

    /// Stop the thread and hand back the output. Returns `None` if the
    /// thread already stopped or panicked.
    pub fn shutdown(&mut self) -> Option<Box<dyn MessageOutput>> {
        self.shutdown.store(true, Ordering::Relaxed);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(output) => {
                info!("MTC dispatcher shut down");
                Some(output)
            }
            Err(_) => {
                warn!("MTC dispatcher thread panicked");
                None
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording(Arc<Mutex<Vec<(Instant, Vec<u8>)>>>);

    impl MessageOutput for Recording {
        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            self.0.lock().unwrap().push((Instant::now(), bytes.to_vec()));
            Ok(())
        }
    }

    struct Failing;

    impl MessageOutput for Failing {
        fn send(&mut self, _bytes: &[u8]) -> Result<()> {
            Err(Error::MidiOutput("unplugged".to_string()))
        }
    }

    #[test]
    fn test_due_time() {
        let start = Instant::now();
        let message = TimedMessage::new(start, 24_000, &[0xF1, 0x00]);
        assert_eq!(message.due(48_000), start + Duration::from_millis(500));
        assert_eq!(message.bytes(), &[0xF1, 0x00]);
    }

    #[test]
    fn test_sink_carries_cycle_start() {
        let (mut sink, mut receiver) = dispatch_channel(4);
        let start = Instant::now();
        sink.begin_cycle(start);

        sink.write_event(12, &[1, 2, 3]).unwrap();

        let message = receiver.try_recv().unwrap();
        assert_eq!(message.cycle_start, start);
        assert_eq!(message.offset, 12);
        assert_eq!(message.bytes(), &[1, 2, 3]);
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_full_ring_rejects() {
        let (mut sink, receiver) = dispatch_channel(2);
        sink.write_event(0, &[1]).unwrap();
        sink.write_event(0, &[2]).unwrap();
        assert_eq!(sink.write_event(0, &[3]), Err(SinkError::Full));
        assert_eq!(receiver.len(), 2);
    }

    #[test]
    fn test_dispatcher_sends_in_order_and_on_time() {
        let (mut sink, receiver) = dispatch_channel(8);
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::spawn(
            receiver,
            Box::new(Recording(Arc::clone(&sent))),
            48_000,
            Arc::new(Diagnostics::new()),
        )
        .unwrap();

        let start = Instant::now();
        sink.begin_cycle(start);
        sink.write_event(0, &[0xA]).unwrap();
        sink.write_event(960, &[0xB]).unwrap(); // 20ms

        std::thread::sleep(Duration::from_millis(100));
        assert!(dispatcher.shutdown().is_some());

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, vec![0xA]);
        assert_eq!(sent[1].1, vec![0xB]);
        assert!(sent[1].0 >= start + Duration::from_millis(20));
    }

    #[test]
    fn test_send_failures_counted() {
        let (mut sink, receiver) = dispatch_channel(8);
        let diagnostics = Arc::new(Diagnostics::new());
        let mut dispatcher =
            Dispatcher::spawn(receiver, Box::new(Failing), 48_000, Arc::clone(&diagnostics)).unwrap();

        sink.write_event(0, &[0xF1, 0x00]).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        dispatcher.shutdown();

        assert_eq!(diagnostics.snapshot().dispatch_drops, 1);
    }

    #[test]
    fn test_shutdown_twice() {
        let (_sink, receiver) = dispatch_channel(1);
        let mut dispatcher =
            Dispatcher::spawn(receiver, Box::new(Failing), 48_000, Arc::new(Diagnostics::new())).unwrap();
        assert!(dispatcher.shutdown().is_some());
        assert!(dispatcher.shutdown().is_none());
    }
}
