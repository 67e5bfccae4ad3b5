//! Visibility of the widget's own UI while a capture is running.
//!
//! The controller is the only writer during a capture. It hides the chrome
//! through a `ChromeLease`; dropping the last `ChromeGuard` puts back the
//! value from before the first capture, on success, failure, cancellation
//! and unwinding alike.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Show/hide switch for the widget's overlay, toolbar and launcher.
pub trait ChromeVisibility: Send + Sync {
    fn is_visible(&self) -> bool;
    fn set_visible(&self, visible: bool);
}

/// In-process visibility flag.
#[derive(Debug)]
pub struct ChromeFlag(AtomicBool);

impl ChromeFlag {
    pub fn new(visible: bool) -> Self {
        Self(AtomicBool::new(visible))
    }
}

impl Default for ChromeFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ChromeVisibility for ChromeFlag {
    fn is_visible(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set_visible(&self, visible: bool) {
        self.0.store(visible, Ordering::SeqCst);
    }
}

/// Controller-owned hide lease, shared by every capture in flight.
///
/// The first holder records the pre-capture visibility and hides the chrome;
/// the last one to let go restores it. A capture that supersedes another
/// joins the existing lease instead of snapshotting the already-hidden state.
pub(crate) struct ChromeLease {
    chrome: Arc<dyn ChromeVisibility>,
    state: Mutex<LeaseState>,
}

#[derive(Default)]
struct LeaseState {
    holders: usize,
    restore_to: bool,
}

impl ChromeLease {
    pub(crate) fn new(chrome: Arc<dyn ChromeVisibility>) -> Arc<Self> {
        Arc::new(Self {
            chrome,
            state: Mutex::new(LeaseState::default()),
        })
    }

    /// Hide the chrome until the returned guard is dropped.
    pub(crate) fn hide(self: &Arc<Self>) -> ChromeGuard {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.holders == 0 {
            state.restore_to = self.chrome.is_visible();
            self.chrome.set_visible(false);
            log::debug!("[SESSION] Chrome hidden (was visible={})", state.restore_to);
        }
        state.holders += 1;
        ChromeGuard {
            lease: self.clone(),
        }
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.holders = state.holders.saturating_sub(1);
        if state.holders == 0 {
            self.chrome.set_visible(state.restore_to);
            log::debug!("[SESSION] Chrome restored (visible={})", state.restore_to);
        }
    }
}

/// One capture's hold on the lease.
pub(crate) struct ChromeGuard {
    lease: Arc<ChromeLease>,
}

impl Drop for ChromeGuard {
    fn drop(&mut self) {
        self.lease.release();
    }
}
