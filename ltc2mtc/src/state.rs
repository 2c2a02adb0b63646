//! Shared run state
//!
//! One atomic value seen by the audio callback, the error callback, the
//! signal handlers and the poll loop in `main`.
//!
//! Transitions: `Init → Run` once setup succeeded, `Init | Run → Exit` on
//! shutdown. `Exit` is terminal.

use std::sync::atomic::{AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Setting up devices and ports
    Init = 0,
    /// Translating
    Run = 1,
    /// Shutdown requested
    Exit = 2,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Run,
            _ => Self::Exit,
        }
    }
}

/// Lock-free holder for [`RunState`]
#[derive(Debug)]
pub struct SharedRunState(AtomicU8);

impl SharedRunState {
    pub fn new() -> Self {
        Self(AtomicU8::new(RunState::Init as u8))
    }

    pub fn get(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::Relaxed))
    }

    /// `Init → Run`. Returns false if the state was not `Init`.
    pub fn set_running(&self) -> bool {
        self.0
            .compare_exchange(
                RunState::Init as u8,
                RunState::Run as u8,
                Ordering::Relaxed,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Move to `Exit`. Returns true only for the call that made the
    /// transition.
    pub fn request_exit(&self) -> bool {
        self.0.swap(RunState::Exit as u8, Ordering::Relaxed) != RunState::Exit as u8
    }

    pub fn is_exit(&self) -> bool {
        self.get() == RunState::Exit
    }
}

impl Default for SharedRunState {
    fn default() -> Self {
        Self::new()
    }
}
