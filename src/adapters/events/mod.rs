//! Event bus adapters.
//!
//! - `InMemoryEventBus` - Synchronous, in-process bus wiring command
//!   handlers to the realtime bridge; also the deterministic bus for tests

mod in_memory;

pub use in_memory::InMemoryEventBus;
