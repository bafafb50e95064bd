//! Per-request decision state and the response it builds into.
//!
//! Handlers stage JSON Patch operations (or a denial) on a
//! [`PatchAccumulator`]; the server calls [`PatchAccumulator::build`] once the
//! handler returns.

pub mod accumulator;
mod builder;

pub use accumulator::PatchAccumulator;
