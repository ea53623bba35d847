//! The resumable-task discipline each per-connection handler obeys.
//!
//! The original engine encodes a task's resume point as an integer label
//! switched on at the top of a big function, with locals living in an
//! externally-owned state slab. Here each task instead carries its resume
//! point as a plain enum variant (see `HandlerTask::step` in `handler.rs`);
//! `Signal` is the return-code contract the two designs share.

/// What a task's resumption returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The task has nothing left to do; the connection should close.
    Done,
    /// The task would block; re-invoke on the next readiness event.
    Pending,
}
