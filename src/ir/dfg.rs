//! Data flow graph tracking instructions, values, and basic blocks.

use crate::entity::{self, PrimaryMap, SecondaryMap};
use crate::ir::entities::{Block, Inst, Value};
use crate::ir::instructions::{InstructionData, ValueList, ValueListPool};
use crate::ir::types::{OwnershipKind, Type};
use crate::packed_option::PackedOption;
use core::ops::{Index, IndexMut};
use smallvec::SmallVec;

/// A data flow graph defines all instructions and basic blocks in a function
/// as well as the data flow dependencies between them. The DFG also tracks
/// values, which can be instruction results, block parameters, or undefined
/// sentinels.
///
/// The layout of blocks in the function and of instructions in each block is
/// recorded by the `Layout` data structure which forms the other half of the
/// function representation.
#[derive(Clone)]
pub struct DataFlowGraph {
    /// Data about all of the instructions in the function, including opcodes
    /// and operands. The instructions in this map are not in program order.
    /// That is tracked by `Layout`, along with the block containing each
    /// instruction.
    insts: PrimaryMap<Inst, InstructionData>,

    /// The result value of each instruction, if it produces one. Every
    /// instruction produces at most one value.
    results: SecondaryMap<Inst, PackedOption<Value>>,

    /// Basic blocks in the function and their parameters.
    ///
    /// This map is not in program order. That is handled by `Layout`, and so
    /// is the sequence of instructions contained in each block.
    blocks: PrimaryMap<Block, BlockData>,

    /// Memory pool of value lists.
    ///
    /// The `ValueList` references into this pool appear in many places:
    ///
    /// - Instructions in `insts` that don't have room for their entire
    ///   argument list inline.
    /// - Block parameters in `blocks`.
    pub value_lists: ValueListPool,

    /// Primary value table with entries for all values.
    values: PrimaryMap<Value, ValueData>,
}

impl DataFlowGraph {
    /// Create a new empty `DataFlowGraph`.
    pub fn new() -> Self {
        Self {
            insts: PrimaryMap::new(),
            results: SecondaryMap::new(),
            blocks: PrimaryMap::new(),
            value_lists: ValueListPool::new(),
            values: PrimaryMap::new(),
        }
    }

    /// Clear everything.
    pub fn clear(&mut self) {
        self.insts.clear();
        self.results.clear();
        self.blocks.clear();
        self.value_lists.clear();
        self.values.clear();
    }

    /// Get the total number of instructions created in this function,
    /// whether they are currently inserted in the layout or not.
    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    /// Returns `true` if the given instruction reference is valid.
    pub fn inst_is_valid(&self, inst: Inst) -> bool {
        self.insts.is_valid(inst)
    }

    /// Get the total number of basic blocks created in this function,
    /// whether they are currently inserted in the layout or not.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the given block reference is valid.
    pub fn block_is_valid(&self, block: Block) -> bool {
        self.blocks.is_valid(block)
    }

    /// Get the total number of values.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Check if a value reference is valid.
    pub fn value_is_valid(&self, v: Value) -> bool {
        self.values.is_valid(v)
    }
}

/// Resolve value aliases.
///
/// Find the original SSA value that `value` aliases, or None if an alias
/// cycle is detected.
fn maybe_resolve_aliases(values: &PrimaryMap<Value, ValueData>, value: Value) -> Option<Value> {
    let mut v = value;

    for _ in 0..=values.len() {
        if let ValueData::Alias { original, .. } = values[v] {
            v = original;
        } else {
            return Some(v);
        }
    }

    None
}

/// Resolve value aliases.
///
/// Find the original SSA value that `value` aliases.
fn resolve_aliases(values: &PrimaryMap<Value, ValueData>, value: Value) -> Value {
    if let Some(v) = maybe_resolve_aliases(values, value) {
        v
    } else {
        panic!("Value alias loop detected for {}", value);
    }
}

/// Where did a value come from?
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueDef {
    /// Value is the result of an instruction.
    Result(Inst),
    /// Value is the n'th parameter to a block.
    Param(Block, usize),
    /// Value is an undefined sentinel.
    Undef,
}

impl ValueDef {
    /// Unwrap the instruction where the value was defined, or panic.
    pub fn unwrap_inst(&self) -> Inst {
        match *self {
            Self::Result(inst) => inst,
            _ => panic!("Value is not an instruction result"),
        }
    }

    /// Unwrap the block where the parameter is defined, or panic.
    pub fn unwrap_block(&self) -> Block {
        match *self {
            Self::Param(block, _) => block,
            _ => panic!("Value is not a block parameter"),
        }
    }
}

/// Internal table storage for values.
#[derive(Clone, Debug)]
enum ValueData {
    /// Value is defined by an instruction.
    Inst {
        ty: Type,
        ownership: OwnershipKind,
        inst: Inst,
    },

    /// Value is a block parameter.
    Param {
        ty: Type,
        ownership: OwnershipKind,
        num: u16,
        block: Block,
    },

    /// Value is an undefined sentinel of the given type.
    Undef { ty: Type, ownership: OwnershipKind },

    /// Value is an alias of another value.
    /// An alias value can't be linked as an instruction result or block
    /// parameter. It is used as a placeholder when the original instruction
    /// or block has been rewritten or modified.
    Alias {
        ty: Type,
        ownership: OwnershipKind,
        original: Value,
    },
}

/// Handling values.
impl DataFlowGraph {
    fn make_value(&mut self, data: ValueData) -> Value {
        self.values.push(data)
    }

    /// Get an iterator over all values.
    pub fn values(&self) -> entity::Keys<Value> {
        self.values.keys()
    }

    /// Get the type of a value.
    pub fn value_type(&self, v: Value) -> Type {
        match self.values[v] {
            ValueData::Inst { ty, .. }
            | ValueData::Param { ty, .. }
            | ValueData::Undef { ty, .. }
            | ValueData::Alias { ty, .. } => ty,
        }
    }

    /// Get the ownership kind of a value.
    pub fn value_ownership(&self, v: Value) -> OwnershipKind {
        match self.values[v] {
            ValueData::Inst { ownership, .. }
            | ValueData::Param { ownership, .. }
            | ValueData::Undef { ownership, .. }
            | ValueData::Alias { ownership, .. } => ownership,
        }
    }

    /// Get the definition of a value.
    ///
    /// This is either the instruction that defined it or the block that has
    /// the value as a parameter. Aliases are resolved first.
    pub fn value_def(&self, v: Value) -> ValueDef {
        match self.values[self.resolve_aliases(v)] {
            ValueData::Inst { inst, .. } => ValueDef::Result(inst),
            ValueData::Param { block, num, .. } => ValueDef::Param(block, num as usize),
            ValueData::Undef { .. } => ValueDef::Undef,
            ValueData::Alias { .. } => unreachable!("aliases were just resolved"),
        }
    }

    /// Is `v` an undefined sentinel?
    pub fn value_is_undef(&self, v: Value) -> bool {
        matches!(self.values[v], ValueData::Undef { .. })
    }

    /// Determine if `v` is an attached instruction result or block parameter.
    ///
    /// An attached value can't be attached to something else without first
    /// being detached.
    pub fn value_is_attached(&self, v: Value) -> bool {
        use self::ValueData::*;
        match self.values[v] {
            Inst { inst, .. } => self.results[inst].expand() == Some(v),
            Param { block, num, .. } => {
                self.block_params(block).get(num as usize) == Some(&v)
            }
            Undef { .. } | Alias { .. } => false,
        }
    }

    /// Resolve value aliases.
    ///
    /// Find the original SSA value that `value` aliases.
    pub fn resolve_aliases(&self, value: Value) -> Value {
        resolve_aliases(&self.values, value)
    }

    /// Resolve all aliases among `inst`'s operands.
    ///
    /// For each operand of `inst` which is defined by an alias, replace the
    /// alias with the aliased value.
    pub fn resolve_aliases_in_arguments(&mut self, inst: Inst) {
        let mut data = self.insts[inst].clone();
        data.map_values(&mut self.value_lists, &mut |v| {
            resolve_aliases(&self.values, v)
        });
        self.insts[inst] = data;
    }

    /// Turn a value into an alias of another.
    ///
    /// Change the `dest` value to behave as an alias of `src`. This means
    /// that all uses of `dest` will behave as if they used that value `src`.
    ///
    /// The `dest` value can't be attached to an instruction or block.
    pub fn change_to_alias(&mut self, dest: Value, src: Value) {
        debug_assert!(!self.value_is_attached(dest));
        // Try to create short alias chains by finding the original source
        // value. This also avoids the creation of loops.
        let original = self.resolve_aliases(src);
        debug_assert_ne!(
            dest, original,
            "Aliasing {} to {} would create a loop",
            dest, src
        );
        let ty = self.value_type(original);
        debug_assert_eq!(
            self.value_type(dest),
            ty,
            "Aliasing {} to {} would change its type {} to {}",
            dest,
            src,
            self.value_type(dest),
            ty
        );
        let ownership = self.value_ownership(original);

        self.values[dest] = ValueData::Alias {
            ty,
            ownership,
            original,
        };
    }

    /// Create an undefined sentinel value of the given type.
    pub fn make_undef(&mut self, ty: Type, ownership: OwnershipKind) -> Value {
        self.make_value(ValueData::Undef { ty, ownership })
    }
}

/// Instructions.
impl DataFlowGraph {
    /// Create a new instruction.
    ///
    /// If the instruction produces a value, also call `make_inst_result`.
    pub fn make_inst(&mut self, data: InstructionData) -> Inst {
        let n = self.num_insts() + 1;
        self.results.resize(n);
        self.insts.push(data)
    }

    /// Create the result value for `inst`.
    ///
    /// Panics if the instruction already has a result.
    pub fn make_inst_result(
        &mut self,
        inst: Inst,
        ty: Type,
        ownership: OwnershipKind,
    ) -> Value {
        debug_assert!(
            self.results[inst].is_none(),
            "{} already has a result",
            inst
        );
        let res = self.make_value(ValueData::Inst {
            ty,
            ownership,
            inst,
        });
        self.results[inst] = res.into();
        res
    }

    /// Get the result of an instruction, if it produces one.
    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.results[inst].expand()
    }

    /// Detach the result value from `inst` and return it.
    ///
    /// This leaves `inst` without a result. The detached value is typically
    /// changed into an alias next.
    pub fn detach_result(&mut self, inst: Inst) -> Option<Value> {
        self.results[inst].take()
    }

    /// Collect every value operand of `inst`, including the block arguments
    /// of terminators.
    pub fn inst_values(&self, inst: Inst) -> impl Iterator<Item = Value> {
        let mut args = SmallVec::<[Value; 8]>::new();
        self.insts[inst].for_each_value(&self.value_lists, &mut |v| args.push(v));
        args.into_iter()
    }
}

/// Allow immutable access to instructions via indexing.
impl Index<Inst> for DataFlowGraph {
    type Output = InstructionData;

    fn index(&self, inst: Inst) -> &InstructionData {
        &self.insts[inst]
    }
}

/// Allow mutable access to instructions via indexing.
impl IndexMut<Inst> for DataFlowGraph {
    fn index_mut(&mut self, inst: Inst) -> &mut InstructionData {
        &mut self.insts[inst]
    }
}

/// Basic blocks.
impl DataFlowGraph {
    /// Create a new basic block.
    pub fn make_block(&mut self) -> Block {
        self.blocks.push(BlockData::new())
    }

    /// Get the number of parameters on `block`.
    pub fn num_block_params(&self, block: Block) -> usize {
        self.blocks[block].params.len(&self.value_lists)
    }

    /// Get the parameters on `block`.
    pub fn block_params(&self, block: Block) -> &[Value] {
        self.blocks[block].params.as_slice(&self.value_lists)
    }

    /// Append a parameter with type `ty` to `block`.
    pub fn append_block_param(
        &mut self,
        block: Block,
        ty: Type,
        ownership: OwnershipKind,
    ) -> Value {
        let param = self.values.next_key();
        let num = self.blocks[block].params.push(param, &mut self.value_lists);
        debug_assert!(num <= u16::MAX as usize, "Too many parameters on block");
        self.make_value(ValueData::Param {
            ty,
            ownership,
            num: num as u16,
            block,
        })
    }
}

/// Contents of a basic block.
///
/// Parameters on a basic block are values that dominate everything in the
/// block. All branches to this block must provide matching arguments, and
/// the arguments to the entry block must match the function arguments.
#[derive(Clone)]
struct BlockData {
    /// List of parameters to this block.
    params: ValueList,
}

impl BlockData {
    fn new() -> Self {
        Self {
            params: ValueList::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instructions::Opcode;
    use crate::ir::types;

    #[test]
    fn make_inst() {
        let mut dfg = DataFlowGraph::new();

        let idata = InstructionData::UnaryImm {
            opcode: Opcode::IntegerLiteral,
            imm: 0,
        };
        let inst = dfg.make_inst(idata);
        assert_eq!(inst.to_string(), "inst0");
        assert_eq!(dfg.inst_result(inst), None);

        let val = dfg.make_inst_result(inst, types::I32, OwnershipKind::Trivial);
        assert_eq!(val.to_string(), "v0");
        assert_eq!(dfg.inst_result(inst), Some(val));
        assert_eq!(dfg.value_def(val), ValueDef::Result(inst));
        assert_eq!(dfg.value_type(val), types::I32);
        assert_eq!(dfg.value_ownership(val), OwnershipKind::Trivial);
        assert!(dfg.value_is_attached(val));

        // Detaching leaves the value dangling but valid.
        assert_eq!(dfg.detach_result(inst), Some(val));
        assert!(!dfg.value_is_attached(val));
        assert_eq!(dfg.inst_result(inst), None);
    }

    #[test]
    fn block() {
        let mut dfg = DataFlowGraph::new();

        let block = dfg.make_block();
        assert_eq!(block.to_string(), "bb0");
        assert_eq!(dfg.num_block_params(block), 0);
        assert_eq!(dfg.block_params(block), &[]);

        let arg1 = dfg.append_block_param(block, types::F32, OwnershipKind::Trivial);
        assert_eq!(arg1.to_string(), "v0");
        assert_eq!(dfg.num_block_params(block), 1);
        assert_eq!(dfg.block_params(block), &[arg1]);

        let arg2 = dfg.append_block_param(block, types::REF, OwnershipKind::Owned);
        assert_eq!(arg2.to_string(), "v1");
        assert_eq!(dfg.num_block_params(block), 2);
        assert_eq!(dfg.block_params(block), &[arg1, arg2]);

        assert_eq!(dfg.value_def(arg1), ValueDef::Param(block, 0));
        assert_eq!(dfg.value_def(arg2), ValueDef::Param(block, 1));
        assert_eq!(dfg.value_type(arg1), types::F32);
        assert_eq!(dfg.value_ownership(arg2), OwnershipKind::Owned);
    }

    #[test]
    fn aliases() {
        let mut dfg = DataFlowGraph::new();

        let block = dfg.make_block();
        let arg = dfg.append_block_param(block, types::I64, OwnershipKind::Trivial);

        let inst = dfg.make_inst(InstructionData::UnaryImm {
            opcode: Opcode::IntegerLiteral,
            imm: 7,
        });
        let res = dfg.make_inst_result(inst, types::I64, OwnershipKind::Trivial);

        // Make sure we can resolve value aliases even when none exist.
        assert_eq!(dfg.resolve_aliases(res), res);

        let detached = dfg.detach_result(inst).unwrap();
        dfg.change_to_alias(detached, arg);
        assert_eq!(dfg.resolve_aliases(detached), arg);
        assert_eq!(dfg.value_def(detached), ValueDef::Param(block, 0));
    }

    #[test]
    fn undef() {
        let mut dfg = DataFlowGraph::new();
        let u = dfg.make_undef(types::ADDR, OwnershipKind::Trivial);
        assert!(dfg.value_is_undef(u));
        assert_eq!(dfg.value_def(u), ValueDef::Undef);
        assert!(!dfg.value_is_attached(u));
    }
}
