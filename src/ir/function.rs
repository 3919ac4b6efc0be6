//! Intermediate representation of a function.
//!
//! The `Function` struct defined in this module owns all of its basic
//! blocks, instructions, and values.

use crate::entity::SecondaryMap;
use crate::ir::dfg::DataFlowGraph;
use crate::ir::entities::{Inst, ScopeRef};
use crate::ir::layout::Layout;
use crate::ir::sourceloc::Loc;
use crate::ir::types::{OwnershipKind, Type};
use crate::packed_option::PackedOption;
use core::fmt;

/// A function parameter or return slot in a signature.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AbiParam {
    /// Type of the value passed in this slot.
    pub value_type: Type,
    /// Ownership convention of the value passed in this slot.
    pub ownership: OwnershipKind,
}

impl AbiParam {
    /// Create a parameter slot.
    pub fn new(value_type: Type, ownership: OwnershipKind) -> Self {
        Self {
            value_type,
            ownership,
        }
    }
}

/// A function signature: parameters, an optional return slot, and an
/// optional error slot for throwing functions.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Signature {
    /// The parameters, in order. These must match the parameters of the
    /// function's entry block.
    pub params: Vec<AbiParam>,
    /// The returned value, if the function returns one.
    pub ret: Option<AbiParam>,
    /// The thrown value for throwing functions.
    pub error: Option<AbiParam>,
}

impl Signature {
    /// Create an empty signature.
    pub fn new() -> Self {
        Self::default()
    }
}

/// How a function's body is represented and called.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum FuncRepresentation {
    /// An ordinary function of this language.
    #[default]
    Native,
    /// A method dispatched through a foreign runtime.
    ForeignMethod,
    /// A C-convention function pointer.
    ForeignC,
}

/// A function.
pub struct Function {
    /// Name of this function, for display purposes only.
    pub name: String,

    /// The signature of this function.
    pub signature: Signature,

    /// How the function is represented and called. Mandatory inlining
    /// refuses foreign representations.
    pub representation: FuncRepresentation,

    /// The function's own debug scope. Used as the fallback scope for call
    /// sites that carry none.
    pub scope: PackedOption<ScopeRef>,

    /// Set once the function's body has been inlined into some caller, so
    /// that later pipeline stages keep its debug metadata alive until
    /// emission even if the function itself is dropped.
    pub inlined: bool,

    /// Data flow graph: values, instructions, and blocks.
    pub dfg: DataFlowGraph,

    /// Layout of blocks and instructions in program order.
    pub layout: Layout,

    /// Source locations.
    pub srclocs: SecondaryMap<Inst, Loc>,

    /// Per-instruction debug scopes, pointing into the module's scope arena.
    pub scopes: SecondaryMap<Inst, PackedOption<ScopeRef>>,
}

impl Function {
    /// Create a function with the given name and signature.
    pub fn with_name_signature(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            signature,
            representation: FuncRepresentation::Native,
            scope: None.into(),
            inlined: false,
            dfg: DataFlowGraph::new(),
            layout: Layout::new(),
            srclocs: SecondaryMap::new(),
            scopes: SecondaryMap::new(),
        }
    }

    /// Create a new empty, anonymous function.
    pub fn new() -> Self {
        Self::with_name_signature(String::new(), Signature::new())
    }

    /// Clear all data structures in this function.
    pub fn clear(&mut self) {
        self.signature = Signature::new();
        self.representation = FuncRepresentation::Native;
        self.scope = None.into();
        self.inlined = false;
        self.dfg.clear();
        self.layout.clear();
        self.srclocs.clear();
        self.scopes.clear();
    }
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "function {}({} blocks)", self.name, self.dfg.num_blocks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types;

    #[test]
    fn basic() {
        let mut sig = Signature::new();
        sig.params
            .push(AbiParam::new(types::I64, OwnershipKind::Trivial));
        sig.ret = Some(AbiParam::new(types::I64, OwnershipKind::Trivial));
        let func = Function::with_name_signature("double", sig);
        assert_eq!(func.name, "double");
        assert_eq!(func.representation, FuncRepresentation::Native);
        assert!(!func.inlined);
        assert_eq!(func.layout.entry_block(), None);
    }
}
