//! Sable IR entity references.
//!
//! Instructions in Sable IR need to reference other entities in the function:
//! basic blocks, SSA values, or entities declared at module scope. These
//! references are not implemented as Rust references, both because Rust's
//! ownership and mutability rules make it difficult, and because 64-bit
//! pointers take up a lot of space. Instead, entity references are structs
//! wrapping a `u32` index into a table. There is a separate index type for
//! each entity type, so we don't lose type safety.
//!
//! Compact data structures store optional references as
//! `PackedOption<EntityRef>`, while function arguments and return values
//! prefer the more Rust-like `Option<EntityRef>` variant.

use crate::entity::entity_impl;

/// An opaque reference to a basic block in a function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "bb");

/// An opaque reference to an instruction in a function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// An opaque reference to an SSA value.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);
entity_impl!(Value, "v");

/// A reference to a function known to the enclosing module.
///
/// The core never dereferences these; resolving a `FuncRef` to a function
/// body is the module's job.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FuncRef(u32);
entity_impl!(FuncRef, "fn");

/// A reference to a global variable known to the enclosing module.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct GlobalRef(u32);
entity_impl!(GlobalRef, "gv");

/// A reference to a debug scope in the module's scope arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScopeRef(u32);
entity_impl!(ScopeRef, "scope");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packed_option::PackedOption;
    use core::mem;

    #[test]
    fn display() {
        use crate::entity::EntityRef;
        assert_eq!(Block::new(0).to_string(), "bb0");
        assert_eq!(Value::new(12).to_string(), "v12");
        assert_eq!(Inst::new(3).to_string(), "inst3");
    }

    #[test]
    fn memory() {
        // This is the whole point of `PackedOption`.
        assert_eq!(
            mem::size_of::<Value>(),
            mem::size_of::<PackedOption<Value>>()
        );
    }
}
