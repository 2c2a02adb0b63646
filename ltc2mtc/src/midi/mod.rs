//! MIDI output for MTC
//!
//! The scheduler runs inside the audio callback, but midir calls can block.
//! Scheduled messages are therefore handed to a dispatcher thread through a
//! lock-free ring and sent when their time comes.

pub mod dispatch;
pub mod output;

pub use dispatch::{dispatch_channel, DispatchReceiver, DispatchSink, Dispatcher, TimedMessage};
pub use output::{MessageOutput, MidiOutput};
