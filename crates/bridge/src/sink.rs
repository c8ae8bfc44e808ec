//! Output channels for a single engine run.
//!
//! A run reports through two append-only channels: `out` carries the result
//! of a successful match, `err` carries diagnostics. Both accumulate raw
//! bytes; writers may deliver a message in several pieces.

/// Receiver for a run's output. One sink per invocation; the caller makes a
/// fresh one for each run so channels never mix across runs.
pub trait OutputSink {
    /// Append bytes to the result channel
    fn write_out(&mut self, bytes: &[u8]);

    /// Append bytes to the diagnostic channel
    fn write_err(&mut self, bytes: &[u8]);
}

/// In-memory sink buffering both channels.
#[derive(Default)]
pub struct ChannelBuffers {
    out: Vec<u8>,
    err: Vec<u8>,
}

impl ChannelBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn out(&self) -> &[u8] {
        &self.out
    }

    pub fn err(&self) -> &[u8] {
        &self.err
    }
}

impl OutputSink for ChannelBuffers {
    fn write_out(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    fn write_err(&mut self, bytes: &[u8]) {
        self.err.extend_from_slice(bytes);
    }
}

/// What a run produced, decided from its channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The result channel's content. Wins whenever the result channel is
    /// non-empty, even if diagnostics were also written.
    Matched(String),
    /// The diagnostic channel's content (empty when the run wrote nothing)
    Failed(String),
}

/// Classify a finished run from its channel contents. Anything on the
/// result channel means success; only a silent result channel lets the
/// diagnostic channel speak.
pub fn classify(out: Vec<u8>, err: Vec<u8>) -> RunOutcome {
    if !out.is_empty() {
        RunOutcome::Matched(String::from_utf8_lossy(&out).into_owned())
    } else {
        RunOutcome::Failed(String::from_utf8_lossy(&err).into_owned())
    }
}
