//! Representation of Sable IR functions.

pub mod debuginfo;
pub mod dfg;
pub mod entities;
pub mod function;
pub mod instructions;
pub mod layout;
pub mod sourceloc;
pub mod types;

pub use crate::ir::debuginfo::{ScopeArena, ScopeData, ScopeParent};
pub use crate::ir::dfg::{DataFlowGraph, ValueDef};
pub use crate::ir::entities::{Block, FuncRef, GlobalRef, Inst, ScopeRef, Value};
pub use crate::ir::function::{AbiParam, FuncRepresentation, Function, Signature};
pub use crate::ir::instructions::{
    AccessEnforcement, InstructionData, MetatypeRepr, Opcode, ValueList, ValueListPool,
};
pub use crate::ir::layout::Layout;
pub use crate::ir::sourceloc::{Loc, SourceLoc};
pub use crate::ir::types::{OwnershipKind, Type};
