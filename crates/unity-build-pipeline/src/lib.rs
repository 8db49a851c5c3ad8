//! Test-then-build orchestration for Unity projects
//!
//! This crate owns the persisted build settings, the pending-state hand-off
//! that survives an asynchronous test run, and the sequencer that turns a
//! preset selection into build requests for the editor.

pub mod config;
pub mod handoff;
pub mod host;
pub mod process;
pub mod progress;
pub mod sequencer;
pub mod testing;

pub use config::*;
pub use handoff::*;
pub use host::*;
pub use process::*;
pub use progress::*;
pub use sequencer::*;
