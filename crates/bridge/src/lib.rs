//! Host/engine boundary for the pegvm grammar engine.
//!
//! The engine proper ([`pegvm_parser`]) works on `&str` and arena-backed
//! structures. This crate wraps it in the surface a foreign host talks to:
//!
//! - [`GuestMemory`]: a linear heap addressed by 32-bit byte offsets, with
//!   explicit allocate/release and address 0 reserved as never-valid.
//! - [`InstanceTable`]: engine instances behind opaque, move-only handles
//!   with monotonic ids.
//! - [`OutputSink`] / [`ChannelBuffers`]: per-run append-only result and
//!   diagnostic channels.
//! - [`ParserModule::interpret`]: the synchronous run operation, tying a
//!   handle and two heap regions together and tagging how the run ended.
//! - [`Driver`]: one-call convenience that does the whole allocate / run /
//!   release dance and classifies the outcome.

mod driver;
mod instance;
mod memory;
mod module;
mod sink;

pub use driver::{Driver, DriverError};
pub use instance::{Instance, InstanceHandle, InstanceTable};
pub use memory::{GuestMemory, MemoryError, Region};
pub use module::{BridgeError, ParserModule, RunStatus};
pub use sink::{classify, ChannelBuffers, OutputSink, RunOutcome};
