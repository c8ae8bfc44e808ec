//! High-level driver: one call runs a grammar against an input.
//!
//! The driver owns a [`ParserModule`] and handles the full boundary dance
//! for each run: copy both strings into the heap, borrow an engine, run,
//! then release everything it allocated whatever happened.

use pegvm_common::debug::{create_logger, Logger};
use pegvm_common::log;

use crate::module::{BridgeError, ParserModule, RunStatus};
use crate::sink::{ChannelBuffers, RunOutcome};

pub struct Driver {
    module: ParserModule,
    log: Logger,
}

impl Driver {
    pub fn new() -> Self {
        Self {
            module: ParserModule::new(),
            log: create_logger("driver"),
        }
    }

    /// Run `grammar` over `input` and classify the result.
    ///
    /// `Err` means the run never happened (the heap refused an allocation);
    /// once the run happens, failures come back as [`RunOutcome::Failed`].
    pub fn run(&mut self, grammar: &str, input: &str) -> Result<RunOutcome, DriverError> {
        let grammar_region = self
            .module
            .allocate_bytes(grammar.as_bytes())
            .ok_or(DriverError::OutOfMemory)?;
        let input_region = match self.module.allocate_bytes(input.as_bytes()) {
            Some(r) => r,
            None => {
                self.module.release(grammar_region);
                return Err(DriverError::OutOfMemory);
            }
        };

        let engine = self.module.create_engine();
        let mut sink = ChannelBuffers::new();
        let result = self
            .module
            .interpret(&engine, grammar_region, input_region, &mut sink);

        // Release in reverse order of acquisition, on every path
        self.module.release(input_region);
        self.module.release(grammar_region);
        self.module.destroy_engine(engine);

        let status = result?;
        log!(
            self.log,
            "run complete, {} live regions remain",
            self.module.live_regions()
        );
        // The status tags the result, so an empty match still counts as a
        // match even though it leaves the result channel empty
        Ok(match status {
            RunStatus::Matched => {
                RunOutcome::Matched(String::from_utf8_lossy(sink.out()).into_owned())
            }
            RunStatus::Failed => {
                RunOutcome::Failed(String::from_utf8_lossy(sink.err()).into_owned())
            }
        })
    }

    /// Number of heap regions still live, for leak checks
    pub fn live_regions(&self) -> usize {
        self.module.live_regions()
    }

    pub fn live_engines(&self) -> usize {
        self.module.live_engines()
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    OutOfMemory,
    Bridge(BridgeError),
}

impl From<BridgeError> for DriverError {
    fn from(e: BridgeError) -> Self {
        DriverError::Bridge(e)
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::OutOfMemory => write!(f, "guest heap refused the allocation"),
            DriverError::Bridge(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DriverError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_returns_the_input() {
        let mut driver = Driver::new();
        let outcome = driver.run("num = \\d+", "12345").unwrap();
        assert_eq!(outcome, RunOutcome::Matched("12345".to_string()));
    }

    #[test]
    fn mismatch_reports_diagnostics() {
        let mut driver = Driver::new();
        let outcome = driver.run("num = \\d+", "abc").unwrap();
        match outcome {
            RunOutcome::Failed(msg) => assert!(msg.contains("expected digit"), "got: {}", msg),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn nothing_leaks_after_a_run() {
        let mut driver = Driver::new();
        driver.run("a = \"x\"", "x").unwrap();
        driver.run("a = \"x\"", "y").unwrap();
        assert_eq!(driver.live_regions(), 0);
        assert_eq!(driver.live_engines(), 0);
    }

    #[test]
    fn empty_input_is_a_valid_run() {
        let mut driver = Driver::new();
        let outcome = driver.run("a = \\d*", "").unwrap();
        assert_eq!(outcome, RunOutcome::Matched(String::new()));
    }
}
