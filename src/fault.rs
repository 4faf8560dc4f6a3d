//! Structured fault propagation.
//!
//! A [`FaultContext`] belongs to one document session. It keeps a bounded
//! stack of recovery frames and the warning-coalescing state.
//!
//! Faults travel as ordinary [`Result`] values: [`FaultContext::fail`]
//! records the message and hands back an [`Error::Fault`] which the caller
//! propagates with `?` until it reaches the function that opened the nearest
//! recovery scope. That function decides whether to degrade and continue or
//! to propagate further. Resources taken inside a scope are released by
//! ownership on every exit path; [`FaultContext::try_scope`] pops its frame
//! whether the body succeeded or not.
//!
//! # Example
//!
//! ```
//! use xps_structure::fault::FaultContext;
//!
//! let mut ctx = FaultContext::new();
//! let outcome: xps_structure::Result<u32> = ctx.try_scope("parse", |ctx| {
//!     Err(ctx.fail("cannot parse part '/a.xml'"))
//! });
//! assert!(outcome.is_err());
//! assert_eq!(ctx.last_message(), "cannot parse part '/a.xml'");
//! assert_eq!(ctx.depth(), 0);
//! ```

use crate::config::{DEFAULT_FAULT_STACK_CAPACITY, DEFAULT_WARNING_MESSAGE_LIMIT};
use crate::error::{Error, Result};

/// A saved recovery point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultFrame {
    /// Zero-based position of the frame on the stack
    pub depth: usize,
    /// What the scope protects, for diagnostics
    pub label: &'static str,
}

/// Coalescing state for consecutive identical warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningState {
    message: String,
    count: usize,
}

impl WarningState {
    /// Text of the last warning, empty after a flush.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// How many times the last warning has been seen in a row.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Record a warning and return the log lines it produces.
    ///
    /// A repeat of the current message only bumps the counter. Anything else
    /// flushes the pending summary first and then emits the new message.
    pub fn record(&mut self, message: String) -> Vec<String> {
        if self.count > 0 && message == self.message {
            self.count += 1;
            return Vec::new();
        }

        let mut lines = Vec::with_capacity(2);
        lines.extend(self.flush());
        lines.push(format!("warning: {}", message));
        self.message = message;
        self.count = 1;
        lines
    }

    /// Reset the state, returning the "repeated" summary if repeats were
    /// suppressed.
    pub fn flush(&mut self) -> Option<String> {
        let summary = if self.count > 1 {
            Some(format!("warning: ... repeated {} times ...", self.count - 1))
        } else {
            None
        };
        self.message.clear();
        self.count = 0;
        summary
    }
}

/// Per-session recovery stack and warning state.
#[derive(Debug, Clone)]
pub struct FaultContext {
    frames: Vec<FaultFrame>,
    capacity: usize,
    message_limit: usize,
    message: String,
    warnings: WarningState,
}

impl Default for FaultContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultContext {
    /// Create a context with the default capacity.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_FAULT_STACK_CAPACITY, DEFAULT_WARNING_MESSAGE_LIMIT)
    }

    /// Create a context with an explicit frame capacity and message limit.
    pub fn with_limits(capacity: usize, message_limit: usize) -> Self {
        Self {
            frames: Vec::new(),
            capacity,
            message_limit: message_limit.max(1),
            message: String::new(),
            warnings: WarningState::default(),
        }
    }

    /// Maximum number of frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of frames currently pushed.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame, if any.
    pub fn current_frame(&self) -> Option<&FaultFrame> {
        self.frames.last()
    }

    /// Current warning-coalescing state.
    pub fn warning_state(&self) -> &WarningState {
        &self.warnings
    }

    /// Push a new recovery frame.
    ///
    /// At capacity this is fatal: the stack is left untouched and
    /// [`Error::FaultStackOverflow`] is returned, which no scope may absorb.
    pub fn acquire_scope(&mut self, label: &'static str) -> Result<FaultFrame> {
        if self.frames.len() >= self.capacity {
            log::error!("exception stack overflow: {}!", self.frames.len());
            return Err(Error::FaultStackOverflow(self.frames.len()));
        }
        let frame = FaultFrame {
            depth: self.frames.len(),
            label,
        };
        self.frames.push(frame);
        log::trace!("acquired scope '{}' at depth {}", label, frame.depth);
        Ok(frame)
    }

    /// Pop `frame` and anything pushed above it.
    pub fn release_scope(&mut self, frame: FaultFrame) {
        if frame.depth < self.frames.len() {
            self.frames.truncate(frame.depth);
            log::trace!("released scope '{}' at depth {}", frame.label, frame.depth);
        }
    }

    /// Run `body` inside a fresh recovery scope.
    ///
    /// The frame is released on every exit path. Any error produced by the
    /// body is returned to the caller, which is the recovery point.
    pub fn try_scope<T, F>(&mut self, label: &'static str, body: F) -> Result<T>
    where
        F: FnOnce(&mut FaultContext) -> Result<T>,
    {
        let frame = self.acquire_scope(label)?;
        let result = body(self);
        self.release_scope(frame);
        result
    }

    /// Record `message` as the current fault and produce the error that
    /// carries it to the nearest recovery scope.
    ///
    /// Pending coalesced warnings are flushed first. With no scope on the
    /// stack the fault is uncaught and the returned error is fatal.
    pub fn fail(&mut self, message: impl Into<String>) -> Error {
        let message = truncate_message(message.into(), self.message_limit);
        self.flush_warnings();
        log::error!("error: {}", message);
        self.message = message;
        self.raise()
    }

    /// Re-raise the recorded fault without reformatting it.
    pub fn rethrow(&mut self) -> Error {
        self.raise()
    }

    /// Text of the most recently recorded fault.
    pub fn last_message(&self) -> &str {
        &self.message
    }

    /// Emit a warning, coalescing identical consecutive messages.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = truncate_message(message.into(), self.message_limit);
        for line in self.warnings.record(message) {
            log::warn!("{}", line);
        }
    }

    /// Emit the pending "repeated" summary, if any, and reset warning state.
    pub fn flush_warnings(&mut self) {
        if let Some(summary) = self.warnings.flush() {
            log::warn!("{}", summary);
        }
    }

    fn raise(&self) -> Error {
        match self.frames.last() {
            Some(frame) => Error::Fault {
                message: self.message.clone(),
                depth: frame.depth,
            },
            None => {
                log::error!("uncaught exception: {}", self.message);
                Error::Uncaught(self.message.clone())
            },
        }
    }
}

/// Cut a message to at most `limit` bytes on a character boundary.
fn truncate_message(mut message: String, limit: usize) -> String {
    if message.len() > limit {
        let mut cut = limit;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_coalescing_emits_summary_then_new_message() {
        let mut state = WarningState::default();

        assert_eq!(state.record("bad glyph".to_string()), vec!["warning: bad glyph"]);
        assert!(state.record("bad glyph".to_string()).is_empty());
        assert!(state.record("bad glyph".to_string()).is_empty());
        assert_eq!(state.count(), 3);

        let lines = state.record("missing font".to_string());
        assert_eq!(
            lines,
            vec!["warning: ... repeated 2 times ...", "warning: missing font"]
        );
        assert_eq!(state.count(), 1);
        assert_eq!(state.message(), "missing font");
    }

    #[test]
    fn test_flush_without_repeats_is_silent() {
        let mut state = WarningState::default();
        state.record("once".to_string());
        assert_eq!(state.flush(), None);
        assert_eq!(state.count(), 0);
        assert_eq!(state.message(), "");
    }

    #[test]
    fn test_same_message_after_flush_is_emitted_again() {
        let mut state = WarningState::default();
        state.record("again".to_string());
        state.flush();
        assert_eq!(state.record("again".to_string()), vec!["warning: again"]);
    }

    #[test]
    fn test_scope_capacity() {
        let mut ctx = FaultContext::with_limits(4, 64);
        for depth in 0..4 {
            let frame = ctx.acquire_scope("level").unwrap();
            assert_eq!(frame.depth, depth);
        }

        let err = ctx.acquire_scope("overflow").unwrap_err();
        assert!(matches!(err, Error::FaultStackOverflow(4)));
        assert!(err.is_fatal());
        assert_eq!(ctx.depth(), 4);
        assert_eq!(ctx.current_frame().map(|f| f.depth), Some(3));
    }

    #[test]
    fn test_huge_capacity_is_not_preallocated() {
        let mut ctx = FaultContext::with_limits(usize::MAX, 64);
        assert_eq!(ctx.capacity(), usize::MAX);
        let frame = ctx.acquire_scope("only").unwrap();
        ctx.release_scope(frame);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_fail_targets_innermost_frame() {
        let mut ctx = FaultContext::new();
        let outer = ctx.acquire_scope("outer").unwrap();
        ctx.acquire_scope("inner").unwrap();

        match ctx.fail("cannot read part '/x'") {
            Error::Fault { message, depth } => {
                assert_eq!(message, "cannot read part '/x'");
                assert_eq!(depth, 1);
            },
            other => panic!("unexpected error: {other:?}"),
        }

        ctx.release_scope(outer);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_fail_without_scope_is_uncaught() {
        let mut ctx = FaultContext::new();
        let err = ctx.fail("no handler");
        assert!(matches!(err, Error::Uncaught(ref m) if m == "no handler"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_rethrow_reuses_recorded_message() {
        let mut ctx = FaultContext::new();
        let result: Result<()> = ctx.try_scope("outer", |ctx| {
            let inner: Result<()> = ctx.try_scope("inner", |ctx| Err(ctx.fail("first")));
            match inner {
                Ok(()) => Ok(()),
                Err(_) => Err(ctx.rethrow()),
            }
        });

        match result {
            Err(Error::Fault { message, depth }) => {
                assert_eq!(message, "first");
                assert_eq!(depth, 0);
            },
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_try_scope_releases_on_success() {
        let mut ctx = FaultContext::new();
        let value = ctx
            .try_scope("ok", |ctx| {
                assert_eq!(ctx.depth(), 1);
                Ok(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_try_scope_at_capacity_does_not_run_body() {
        let mut ctx = FaultContext::with_limits(1, 64);
        ctx.acquire_scope("full").unwrap();
        let mut ran = false;
        let result = ctx.try_scope("nested", |_| {
            ran = true;
            Ok(())
        });
        assert!(matches!(result, Err(Error::FaultStackOverflow(1))));
        assert!(!ran);
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_fail_flushes_pending_warnings() {
        let mut ctx = FaultContext::new();
        ctx.warn("dup");
        ctx.warn("dup");
        assert_eq!(ctx.warning_state().count(), 2);
        ctx.try_scope("s", |ctx| -> Result<()> { Err(ctx.fail("boom")) })
            .unwrap_err();
        assert_eq!(ctx.warning_state().count(), 0);
    }

    #[test]
    fn test_messages_truncated_on_char_boundary() {
        let mut ctx = FaultContext::with_limits(4, 5);
        ctx.acquire_scope("s").unwrap();
        ctx.fail("ééé");
        assert_eq!(ctx.last_message(), "éé");
    }
}
