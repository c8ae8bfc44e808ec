//! The boundary surface: heap, instance table, and the interpret operation.

use pegvm_common::debug::{create_logger, Logger};
use pegvm_common::StringInterner;
use pegvm_common::{log, log_fail, log_success};

use crate::instance::{InstanceHandle, InstanceTable};
use crate::memory::{GuestMemory, MemoryError, Region};
use crate::sink::OutputSink;

/// The full host-facing surface of the engine: a guest heap for passing
/// byte buffers, a table of engine instances, and [`interpret`] tying them
/// together.
///
/// Protocol errors (dead regions, unknown instances) surface as
/// [`BridgeError`]; grammar and input problems are not protocol errors and
/// are reported through the sink's diagnostic channel instead.
///
/// [`interpret`]: ParserModule::interpret
pub struct ParserModule {
    memory: GuestMemory,
    instances: InstanceTable,
    log: Logger,
}

impl ParserModule {
    pub fn new() -> Self {
        Self {
            memory: GuestMemory::new(),
            instances: InstanceTable::new(),
            log: create_logger("bridge"),
        }
    }

    // -------------------------------------------------------------------------
    // Heap
    // -------------------------------------------------------------------------

    /// Allocate a region and fill it with `data`. `None` when the heap
    /// cannot satisfy the request.
    pub fn allocate_bytes(&mut self, data: &[u8]) -> Option<Region> {
        let region = self.memory.allocate(data.len() as u32)?;
        // A region we just granted cannot fail the write
        self.memory
            .write(region, data)
            .expect("fresh region should accept its own length");
        log!(self.log, "allocated {} bytes at {}", region.len, region.addr);
        Some(region)
    }

    pub fn allocate(&mut self, len: u32) -> Option<Region> {
        self.memory.allocate(len)
    }

    pub fn release(&mut self, region: Region) {
        log!(self.log, "released {} bytes at {}", region.len, region.addr);
        self.memory.release(region);
    }

    pub fn read(&self, region: Region) -> Result<&[u8], MemoryError> {
        self.memory.read(region)
    }

    pub fn write(&mut self, region: Region, data: &[u8]) -> Result<(), MemoryError> {
        self.memory.write(region, data)
    }

    // -------------------------------------------------------------------------
    // Instances
    // -------------------------------------------------------------------------

    pub fn create_engine(&mut self) -> InstanceHandle {
        let handle = self.instances.create();
        log!(self.log, "created engine instance {}", handle.id());
        handle
    }

    /// Destroy an instance, consuming its handle.
    pub fn destroy_engine(&mut self, handle: InstanceHandle) {
        log!(self.log, "destroying engine instance {}", handle.id());
        self.instances.destroy(handle);
    }

    /// Recover a handle from a raw id received over the boundary.
    pub fn engine_from_raw(&self, id: u32) -> Result<InstanceHandle, BridgeError> {
        self.instances
            .handle_from_raw(id)
            .ok_or(BridgeError::UnknownInstance(id))
    }

    pub fn live_regions(&self) -> usize {
        self.memory.live_count()
    }

    pub fn live_engines(&self) -> usize {
        self.instances.live_count()
    }

    // -------------------------------------------------------------------------
    // Interpret
    // -------------------------------------------------------------------------

    /// Run a grammar over an input, both passed as heap regions, reporting
    /// through `sink`. Synchronous: when this returns, the run is finished
    /// and the sink holds everything it will ever hold.
    ///
    /// The returned [`RunStatus`] says how the run ended; it is
    /// authoritative even when the channels are ambiguous (an empty match
    /// writes nothing to the result channel). `Err` is reserved for
    /// protocol misuse. A grammar that fails to compile, input that is not
    /// UTF-8, or input the grammar rejects all return `Ok(Failed)` with the
    /// story on the sink's diagnostic channel.
    ///
    /// [`Failed`]: RunStatus::Failed
    pub fn interpret<S: OutputSink>(
        &mut self,
        handle: &InstanceHandle,
        grammar: Region,
        input: Region,
        sink: &mut S,
    ) -> Result<RunStatus, BridgeError> {
        let grammar_bytes = self.memory.read(grammar)?.to_vec();
        let input_bytes = self.memory.read(input)?.to_vec();
        let instance = self
            .instances
            .get_mut(handle)
            .ok_or(BridgeError::UnknownInstance(handle.id()))?;

        log!(
            self.log,
            "interpret on instance {}: {} grammar bytes, {} input bytes",
            handle.id(),
            grammar.len,
            input.len
        );

        let grammar_src = match std::str::from_utf8(&grammar_bytes) {
            Ok(s) => s,
            Err(e) => {
                sink.write_err(b"grammar is not valid UTF-8: ");
                sink.write_err(e.to_string().as_bytes());
                return Ok(RunStatus::Failed);
            }
        };
        let input_src = match std::str::from_utf8(&input_bytes) {
            Ok(s) => s,
            Err(e) => {
                sink.write_err(b"input is not valid UTF-8: ");
                sink.write_err(e.to_string().as_bytes());
                return Ok(RunStatus::Failed);
            }
        };

        let arena = instance.fresh_arena();
        let mut strings = StringInterner::new(arena);

        let compiled = match pegvm_parser::compile(arena, &mut strings, grammar_src) {
            Ok(g) => g,
            Err(e) => {
                log_fail!(self.log, "grammar rejected");
                sink.write_err(b"grammar error: ");
                sink.write_err(e.render().as_bytes());
                return Ok(RunStatus::Failed);
            }
        };

        match pegvm_parser::run(&compiled, input_src) {
            Ok(matched) => {
                log_success!(self.log, "matched {} bytes", matched.len());
                sink.write_out(matched.as_bytes());
                Ok(RunStatus::Matched)
            }
            Err(e) => {
                log_fail!(self.log, "no match");
                sink.write_err(b"parse error: ");
                sink.write_err(e.render().as_bytes());
                Ok(RunStatus::Failed)
            }
        }
    }
}

impl Default for ParserModule {
    fn default() -> Self {
        Self::new()
    }
}

/// How a run ended, as reported by the engine itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Matched,
    Failed,
}

/// Protocol misuse at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    UnknownInstance(u32),
    Memory(MemoryError),
}

impl From<MemoryError> for BridgeError {
    fn from(e: MemoryError) -> Self {
        BridgeError::Memory(e)
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::UnknownInstance(id) => write!(f, "no live engine instance with id {}", id),
            BridgeError::Memory(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for BridgeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelBuffers;

    #[test]
    fn grammar_error_goes_to_diagnostics() {
        let mut module = ParserModule::new();
        let grammar = module.allocate_bytes(b"a = \"unterminated").unwrap();
        let input = module.allocate_bytes(b"x").unwrap();
        let engine = module.create_engine();
        let mut sink = ChannelBuffers::new();

        let status = module.interpret(&engine, grammar, input, &mut sink).unwrap();

        assert_eq!(status, RunStatus::Failed);
        assert!(sink.out().is_empty());
        let err = String::from_utf8_lossy(sink.err()).into_owned();
        assert!(err.starts_with("grammar error: "), "got: {}", err);
        assert!(err.contains("unterminated"), "got: {}", err);

        module.release(input);
        module.release(grammar);
        module.destroy_engine(engine);
    }

    #[test]
    fn invalid_utf8_input_goes_to_diagnostics() {
        let mut module = ParserModule::new();
        let grammar = module.allocate_bytes(b"a = .*").unwrap();
        let input = module.allocate_bytes(&[0xFF, 0xFE]).unwrap();
        let engine = module.create_engine();
        let mut sink = ChannelBuffers::new();

        let status = module.interpret(&engine, grammar, input, &mut sink).unwrap();

        assert_eq!(status, RunStatus::Failed);
        assert!(sink.out().is_empty());
        let err = String::from_utf8_lossy(sink.err()).into_owned();
        assert!(err.contains("not valid UTF-8"), "got: {}", err);

        module.release(input);
        module.release(grammar);
        module.destroy_engine(engine);
    }

    #[test]
    fn dead_region_is_a_protocol_error() {
        let mut module = ParserModule::new();
        let grammar = module.allocate_bytes(b"a = \"x\"").unwrap();
        let input = module.allocate_bytes(b"x").unwrap();
        module.release(input);
        let engine = module.create_engine();
        let mut sink = ChannelBuffers::new();

        let result = module.interpret(&engine, grammar, input, &mut sink);
        assert!(matches!(result, Err(BridgeError::Memory(_))));

        module.release(grammar);
        module.destroy_engine(engine);
    }

    #[test]
    fn raw_id_of_destroyed_engine_is_unknown() {
        let mut module = ParserModule::new();
        let engine = module.create_engine();
        let id = engine.id();
        module.destroy_engine(engine);
        assert_eq!(
            module.engine_from_raw(id),
            Err(BridgeError::UnknownInstance(id))
        );
    }
}
