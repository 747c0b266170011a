//! POSIX signal routing.
//!
//! The handler only records the signal number; the main loop polls it
//! between iterations and decides what to do.

use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use tracing::debug;

use crate::error::CoreError;

/// Signals routed to the loop.
const HANDLED: [Signal; 4] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGQUIT, Signal::SIGHUP];

/// Last received signal number, 0 if none.
static PENDING: AtomicI32 = AtomicI32::new(0);

extern "C" fn record(sig: libc::c_int) {
    PENDING.store(sig, Ordering::SeqCst);
}

/// What the loop should do about a received signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Keep running (SIGHUP).
    Continue,
    /// Clean up and exit with this code.
    Exit(i32),
}

/// Handle to the installed handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signals {
    _private: (),
}

impl Signals {
    /// Install handlers for SIGINT, SIGTERM, SIGQUIT and SIGHUP.
    ///
    /// # Errors
    /// `CoreError::System` if `sigaction` fails.
    pub fn install() -> Result<Self, CoreError> {
        let action = SigAction::new(SigHandler::Handler(record), SaFlags::SA_RESTART, SigSet::empty());
        for sig in HANDLED {
            // SAFETY: the handler only performs an atomic store.
            unsafe { sigaction(sig, &action) }?;
        }
        debug!("signal handlers installed for {:?}", HANDLED);
        Ok(Self { _private: () })
    }

    /// Handle without touching process signal state.
    pub fn detached() -> Self {
        Self { _private: () }
    }

    /// Pending signal, left in place.
    pub fn pending(&self) -> Option<Signal> {
        Signal::try_from(PENDING.load(Ordering::SeqCst)).ok()
    }

    /// Pending signal, cleared.
    pub fn take(&self) -> Option<Signal> {
        Signal::try_from(PENDING.swap(0, Ordering::SeqCst)).ok()
    }

    /// Record `sig` as if it had been delivered.
    pub fn request(&self, sig: Signal) {
        PENDING.store(sig as i32, Ordering::SeqCst);
    }
}

/// Map a signal to the loop's reaction.
pub fn action_for(sig: Signal) -> SignalAction {
    match sig {
        Signal::SIGHUP => SignalAction::Continue,
        other => SignalAction::Exit(exit_code(other)),
    }
}

/// Process exit code for a signal-induced shutdown. SIGTERM is a clean exit.
pub fn exit_code(sig: Signal) -> i32 {
    match sig {
        Signal::SIGTERM => 0,
        other => other as i32,
    }
}
