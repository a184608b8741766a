//! Bench lines for query execution.
//!
//! `dev6!` formats a line, hands it to the `solarcms::dev6` log target at trace
//! level and, when the current thread holds a [`BenchCapture`], records it there
//! as well. Tests read bench output through the capture instead of the global
//! logger, so parallel tests never see each other's lines.

use crate::logger::DEV6_TARGET;
use std::cell::RefCell;

thread_local! {
    static CAPTURED: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Records bench lines emitted on this thread until dropped.
#[must_use = "capture stops as soon as the guard is dropped"]
pub struct BenchCapture {
    _private: (),
}

impl BenchCapture {
    /// Starts capturing on the current thread, discarding anything left from an
    /// earlier capture.
    pub fn start() -> Self {
        CAPTURED.with(|c| *c.borrow_mut() = Some(Vec::new()));
        Self { _private: () }
    }

    /// Lines recorded so far; the buffer is left untouched.
    pub fn lines(&self) -> Vec<String> {
        CAPTURED.with(|c| c.borrow().clone().unwrap_or_default())
    }

    /// Removes and returns the recorded lines.
    pub fn take(&self) -> Vec<String> {
        CAPTURED.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
    }
}

impl Drop for BenchCapture {
    fn drop(&mut self) {
        CAPTURED.with(|c| c.borrow_mut().take());
    }
}

#[doc(hidden)]
pub fn emit(line: String) {
    log::trace!(target: DEV6_TARGET, "{line}");
    CAPTURED.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(line);
        }
    });
}

/// Emits a bench line, `format!` style.
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {
        $crate::utils::devlog::emit(format!($($arg)*))
    };
}
