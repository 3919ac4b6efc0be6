//! Sable IR: the mid-level SSA intermediate representation of the Sable
//! compiler, together with its function-inlining utilities.
//!
//! The crate provides the in-memory form of IR functions (`ir` module), a
//! one-call-site function inliner (`inline` module), and the per-instruction
//! inline cost model (`inline_cost` module) that inlining policies use to
//! estimate code growth. It is a library consumed by the surrounding
//! optimizer; it has no textual format, no CLI, and no persisted state.
#![deny(missing_docs)]

pub use cranelift_entity as entity;

pub mod inline;
pub mod inline_cost;
pub mod ir;

pub use crate::entity::packed_option;
pub use crate::inline::{InlineKind, Inliner};
pub use crate::inline_cost::{instruction_inline_cost, InlineCost};
