//! Instruction formats and opcodes.
//!
//! The `instructions` module contains definitions for instruction formats,
//! opcodes, and the in-memory representation of IR instructions.
//!
//! Every instruction has an `Opcode` naming what it does and an
//! `InstructionData` format carrying its operands. Formats are shared
//! between opcodes with the same operand shape, so the data enum stays much
//! smaller than the opcode enum.

use crate::entity::{EntityList, ListPool};
use crate::ir::entities::{Block, FuncRef, GlobalRef, Value};
use crate::packed_option::PackedOption;
use core::fmt::{self, Display, Formatter};

/// Some instructions use an external list of argument values because there
/// is not enough space in the `InstructionData` struct. These value lists
/// are stored in a memory pool in `dfg.value_lists`.
pub type ValueList = EntityList<Value>;

/// Memory pool for holding value lists. See `ValueList`.
pub type ValueListPool = ListPool<Value>;

/// Enforcement policy attached to a memory-access region.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AccessEnforcement {
    /// Not yet inferred. Must not survive into canonical IR.
    Unknown,
    /// Verified at compile time; no runtime bookkeeping.
    Static,
    /// Checked at run time.
    Dynamic,
    /// Unchecked.
    Unsafe,
}

/// Run-time representation of a metatype value.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum MetatypeRepr {
    /// A compile-time constant; carries no runtime data.
    Thin,
    /// A runtime type descriptor pointer.
    Thick,
    /// A foreign-runtime class object.
    Foreign,
}

/// An instruction opcode.
///
/// The taxonomy is exhaustive over canonical mid-level IR, plus the two
/// non-canonical markers that earlier pipeline stages may still carry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[allow(missing_docs)]
pub enum Opcode {
    // Literals.
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    UntypedStringLiteral,

    // Debug annotations. No runtime effect.
    DebugValue,
    DebugValueAddr,

    // Lifetime and borrow markers.
    FixLifetime,
    BeginBorrow,
    EndBorrow,
    EndBorrowArgument,
    EndLifetime,
    MarkDependence,
    UncheckedOwnershipConversion,

    // Function and global references.
    FunctionRef,
    GlobalAddr,
    AllocGlobal,
    GlobalValue,

    // Typed address projections.
    TupleElementAddr,
    StructElementAddr,
    ProjectBlockStorage,

    // Aggregate construction and extraction.
    Tuple,
    Struct,
    TupleExtract,
    StructExtract,

    // Unchecked bit-pattern casts.
    AddressToPointer,
    PointerToAddress,
    UncheckedRefCast,
    UncheckedRefCastAddr,
    UncheckedAddrCast,
    UncheckedTrivialBitCast,
    UncheckedBitwiseCast,
    RawPointerToRef,
    RefToRawPointer,
    Upcast,
    ThinToThickFunction,
    ThinFunctionToPointer,
    PointerToThinFunction,
    ConvertFunction,
    BridgeObjectToWord,

    // Foreign-runtime interop.
    ForeignProtocol,
    ForeignExistentialMetatypeToObject,
    ForeignMetatypeToObject,
    ThickToForeignMetatype,
    ForeignToThickMetatype,
    BridgeObjectToRef,
    RefToBridgeObject,

    // Metatypes.
    Metatype,
    ValueMetatype,
    ExistentialMetatype,

    // Memory-access markers.
    BeginAccess,
    EndAccess,
    BeginUnpairedAccess,
    EndUnpairedAccess,

    // Builtin calls.
    Builtin,

    // Calls.
    Apply,
    TryApply,
    PartialApply,

    // Allocation.
    AllocStack,
    AllocBox,
    AllocRef,
    AllocRefDynamic,
    AllocExistentialBox,
    AllocValueBuffer,

    // Deallocation.
    DeallocStack,
    DeallocBox,
    DeallocRef,
    DeallocPartialRef,
    DeallocExistentialBox,
    DeallocValueBuffer,

    // Reference counting.
    StrongRetain,
    StrongRelease,
    StrongRetainUnowned,
    UnownedRetain,
    UnownedRelease,
    RetainValue,
    ReleaseValue,
    CopyValue,
    DestroyValue,
    IsUnique,

    // Memory.
    Load,
    Store,
    LoadBorrow,
    StoreBorrow,
    LoadWeak,
    StoreWeak,
    LoadUnowned,
    StoreUnowned,
    CopyAddr,
    DestroyAddr,
    IndexAddr,
    CondFail,

    // Enums.
    Enum,
    UncheckedEnumData,
    InitEnumDataAddr,
    UncheckedTakeEnumDataAddr,
    InjectEnumAddr,
    SelectEnum,
    SelectEnumAddr,
    SelectValue,

    // Existentials.
    InitExistentialAddr,
    InitExistentialRef,
    InitExistentialMetatype,
    DeinitExistentialAddr,
    OpenExistentialAddr,
    OpenExistentialRef,
    OpenExistentialBox,
    OpenExistentialMetatype,
    ProjectBox,
    ProjectExistentialBox,
    ProjectValueBuffer,

    // Class storage and method dispatch.
    RefElementAddr,
    RefTailAddr,
    ClassMethod,
    SuperMethod,
    WitnessMethod,
    DynamicMethod,

    // Key paths.
    KeyPath,

    // Dynamic casts.
    UnconditionalCheckedCast,
    UnconditionalCheckedCastAddr,
    CheckedCastBranch,
    CheckedCastAddrBranch,

    // Control flow.
    Branch,
    CondBranch,
    Return,
    Throw,
    Unreachable,
    SwitchEnum,
    SwitchEnumAddr,
    SwitchValue,

    // Only valid in non-canonical IR.
    MarkUninitialized,
    MarkFunctionEscape,
}

impl Opcode {
    /// The textual mnemonic of this opcode.
    pub fn name(self) -> &'static str {
        match self {
            Self::IntegerLiteral => "integer_literal",
            Self::FloatLiteral => "float_literal",
            Self::StringLiteral => "string_literal",
            Self::UntypedStringLiteral => "untyped_string_literal",
            Self::DebugValue => "debug_value",
            Self::DebugValueAddr => "debug_value_addr",
            Self::FixLifetime => "fix_lifetime",
            Self::BeginBorrow => "begin_borrow",
            Self::EndBorrow => "end_borrow",
            Self::EndBorrowArgument => "end_borrow_argument",
            Self::EndLifetime => "end_lifetime",
            Self::MarkDependence => "mark_dependence",
            Self::UncheckedOwnershipConversion => "unchecked_ownership_conversion",
            Self::FunctionRef => "function_ref",
            Self::GlobalAddr => "global_addr",
            Self::AllocGlobal => "alloc_global",
            Self::GlobalValue => "global_value",
            Self::TupleElementAddr => "tuple_element_addr",
            Self::StructElementAddr => "struct_element_addr",
            Self::ProjectBlockStorage => "project_block_storage",
            Self::Tuple => "tuple",
            Self::Struct => "struct",
            Self::TupleExtract => "tuple_extract",
            Self::StructExtract => "struct_extract",
            Self::AddressToPointer => "address_to_pointer",
            Self::PointerToAddress => "pointer_to_address",
            Self::UncheckedRefCast => "unchecked_ref_cast",
            Self::UncheckedRefCastAddr => "unchecked_ref_cast_addr",
            Self::UncheckedAddrCast => "unchecked_addr_cast",
            Self::UncheckedTrivialBitCast => "unchecked_trivial_bit_cast",
            Self::UncheckedBitwiseCast => "unchecked_bitwise_cast",
            Self::RawPointerToRef => "raw_pointer_to_ref",
            Self::RefToRawPointer => "ref_to_raw_pointer",
            Self::Upcast => "upcast",
            Self::ThinToThickFunction => "thin_to_thick_function",
            Self::ThinFunctionToPointer => "thin_function_to_pointer",
            Self::PointerToThinFunction => "pointer_to_thin_function",
            Self::ConvertFunction => "convert_function",
            Self::BridgeObjectToWord => "bridge_object_to_word",
            Self::ForeignProtocol => "foreign_protocol",
            Self::ForeignExistentialMetatypeToObject => "foreign_existential_metatype_to_object",
            Self::ForeignMetatypeToObject => "foreign_metatype_to_object",
            Self::ThickToForeignMetatype => "thick_to_foreign_metatype",
            Self::ForeignToThickMetatype => "foreign_to_thick_metatype",
            Self::BridgeObjectToRef => "bridge_object_to_ref",
            Self::RefToBridgeObject => "ref_to_bridge_object",
            Self::Metatype => "metatype",
            Self::ValueMetatype => "value_metatype",
            Self::ExistentialMetatype => "existential_metatype",
            Self::BeginAccess => "begin_access",
            Self::EndAccess => "end_access",
            Self::BeginUnpairedAccess => "begin_unpaired_access",
            Self::EndUnpairedAccess => "end_unpaired_access",
            Self::Builtin => "builtin",
            Self::Apply => "apply",
            Self::TryApply => "try_apply",
            Self::PartialApply => "partial_apply",
            Self::AllocStack => "alloc_stack",
            Self::AllocBox => "alloc_box",
            Self::AllocRef => "alloc_ref",
            Self::AllocRefDynamic => "alloc_ref_dynamic",
            Self::AllocExistentialBox => "alloc_existential_box",
            Self::AllocValueBuffer => "alloc_value_buffer",
            Self::DeallocStack => "dealloc_stack",
            Self::DeallocBox => "dealloc_box",
            Self::DeallocRef => "dealloc_ref",
            Self::DeallocPartialRef => "dealloc_partial_ref",
            Self::DeallocExistentialBox => "dealloc_existential_box",
            Self::DeallocValueBuffer => "dealloc_value_buffer",
            Self::StrongRetain => "strong_retain",
            Self::StrongRelease => "strong_release",
            Self::StrongRetainUnowned => "strong_retain_unowned",
            Self::UnownedRetain => "unowned_retain",
            Self::UnownedRelease => "unowned_release",
            Self::RetainValue => "retain_value",
            Self::ReleaseValue => "release_value",
            Self::CopyValue => "copy_value",
            Self::DestroyValue => "destroy_value",
            Self::IsUnique => "is_unique",
            Self::Load => "load",
            Self::Store => "store",
            Self::LoadBorrow => "load_borrow",
            Self::StoreBorrow => "store_borrow",
            Self::LoadWeak => "load_weak",
            Self::StoreWeak => "store_weak",
            Self::LoadUnowned => "load_unowned",
            Self::StoreUnowned => "store_unowned",
            Self::CopyAddr => "copy_addr",
            Self::DestroyAddr => "destroy_addr",
            Self::IndexAddr => "index_addr",
            Self::CondFail => "cond_fail",
            Self::Enum => "enum",
            Self::UncheckedEnumData => "unchecked_enum_data",
            Self::InitEnumDataAddr => "init_enum_data_addr",
            Self::UncheckedTakeEnumDataAddr => "unchecked_take_enum_data_addr",
            Self::InjectEnumAddr => "inject_enum_addr",
            Self::SelectEnum => "select_enum",
            Self::SelectEnumAddr => "select_enum_addr",
            Self::SelectValue => "select_value",
            Self::InitExistentialAddr => "init_existential_addr",
            Self::InitExistentialRef => "init_existential_ref",
            Self::InitExistentialMetatype => "init_existential_metatype",
            Self::DeinitExistentialAddr => "deinit_existential_addr",
            Self::OpenExistentialAddr => "open_existential_addr",
            Self::OpenExistentialRef => "open_existential_ref",
            Self::OpenExistentialBox => "open_existential_box",
            Self::OpenExistentialMetatype => "open_existential_metatype",
            Self::ProjectBox => "project_box",
            Self::ProjectExistentialBox => "project_existential_box",
            Self::ProjectValueBuffer => "project_value_buffer",
            Self::RefElementAddr => "ref_element_addr",
            Self::RefTailAddr => "ref_tail_addr",
            Self::ClassMethod => "class_method",
            Self::SuperMethod => "super_method",
            Self::WitnessMethod => "witness_method",
            Self::DynamicMethod => "dynamic_method",
            Self::KeyPath => "key_path",
            Self::UnconditionalCheckedCast => "unconditional_checked_cast",
            Self::UnconditionalCheckedCastAddr => "unconditional_checked_cast_addr",
            Self::CheckedCastBranch => "checked_cast_br",
            Self::CheckedCastAddrBranch => "checked_cast_addr_br",
            Self::Branch => "br",
            Self::CondBranch => "cond_br",
            Self::Return => "return",
            Self::Throw => "throw",
            Self::Unreachable => "unreachable",
            Self::SwitchEnum => "switch_enum",
            Self::SwitchEnumAddr => "switch_enum_addr",
            Self::SwitchValue => "switch_value",
            Self::MarkUninitialized => "mark_uninitialized",
            Self::MarkFunctionEscape => "mark_function_escape",
        }
    }

    /// True iff this opcode transfers control. Terminators appear last in a
    /// block and nowhere else.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Self::Branch
                | Self::CondBranch
                | Self::Return
                | Self::Throw
                | Self::Unreachable
                | Self::TryApply
                | Self::SwitchEnum
                | Self::SwitchEnumAddr
                | Self::SwitchValue
                | Self::CheckedCastBranch
                | Self::CheckedCastAddrBranch
        )
    }

    /// True iff this opcode is a full call site, throwing or not, whose
    /// callee body can be spliced in by the inliner. Partial applications
    /// are not full call sites.
    pub fn is_full_apply(self) -> bool {
        matches!(self, Self::Apply | Self::TryApply)
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The operand payload of an instruction.
///
/// Formats group opcodes with the same operand shape. Variable-length value
/// lists live out-of-line in the function's `ValueListPool`; successor
/// blocks of terminators are stored inline.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum InstructionData {
    /// No operands.
    Nullary { opcode: Opcode },
    /// One value operand.
    Unary { opcode: Opcode, arg: Value },
    /// One integer immediate.
    UnaryImm { opcode: Opcode, imm: i64 },
    /// One float immediate, as its bit pattern.
    UnaryIeee64 { opcode: Opcode, imm: u64 },
    /// One string immediate.
    UnaryString { opcode: Opcode, literal: Box<str> },
    /// Two value operands.
    Binary { opcode: Opcode, args: [Value; 2] },
    /// One value operand and a field or case index.
    FieldAddr { opcode: Opcode, arg: Value, field: u32 },
    /// One value operand and a method table index.
    Method { opcode: Opcode, arg: Value, method: u32 },
    /// A variable number of value operands.
    MultiAry { opcode: Opcode, args: ValueList },
    /// Enum construction with an optional payload.
    Enum {
        opcode: Opcode,
        case: u32,
        arg: PackedOption<Value>,
    },
    /// A per-case value selection.
    Select {
        opcode: Opcode,
        arg: Value,
        cases: Box<[(u32, Value)]>,
        default: PackedOption<Value>,
    },
    /// A reference to a function in the enclosing module.
    FuncAddr { opcode: Opcode, func: FuncRef },
    /// A reference to a global in the enclosing module.
    GlobalAccess { opcode: Opcode, global: GlobalRef },
    /// A builtin call, identified by the builtin's name.
    Builtin {
        opcode: Opcode,
        name: Box<str>,
        args: ValueList,
    },
    /// A metatype instantiation. `arg` is present for the value and
    /// existential forms.
    Metatype {
        opcode: Opcode,
        repr: MetatypeRepr,
        arg: PackedOption<Value>,
    },
    /// A memory-access marker carrying its own enforcement mode.
    Access {
        opcode: Opcode,
        arg: Value,
        enforcement: AccessEnforcement,
    },
    /// A non-throwing full or partial call. The callee is `args[0]`.
    Apply { opcode: Opcode, args: ValueList },
    /// A throwing call with explicit normal and error successors. The callee
    /// is `args[0]`. Each successor takes exactly one block parameter, bound
    /// to the returned or thrown value; the terminator itself passes no
    /// block arguments.
    TryApply {
        opcode: Opcode,
        args: ValueList,
        normal: Block,
        error: Block,
    },
    /// An unconditional branch with block arguments.
    Jump {
        opcode: Opcode,
        destination: Block,
        args: ValueList,
    },
    /// A two-way conditional branch, each edge with its own arguments.
    CondBranch {
        opcode: Opcode,
        arg: Value,
        then_dest: Block,
        then_args: ValueList,
        else_dest: Block,
        else_args: ValueList,
    },
    /// A multi-way switch. Case destinations take no explicit arguments;
    /// payload destinations bind the payload as a block parameter.
    Switch {
        opcode: Opcode,
        arg: Value,
        cases: Box<[(u32, Block)]>,
        default: PackedOption<Block>,
    },
    /// A conditional dynamic cast with success and failure successors.
    CheckedCastBranch {
        opcode: Opcode,
        arg: Value,
        success: Block,
        failure: Block,
    },
}

impl InstructionData {
    /// The opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Nullary { opcode }
            | Self::Unary { opcode, .. }
            | Self::UnaryImm { opcode, .. }
            | Self::UnaryIeee64 { opcode, .. }
            | Self::UnaryString { opcode, .. }
            | Self::Binary { opcode, .. }
            | Self::FieldAddr { opcode, .. }
            | Self::Method { opcode, .. }
            | Self::MultiAry { opcode, .. }
            | Self::Enum { opcode, .. }
            | Self::Select { opcode, .. }
            | Self::FuncAddr { opcode, .. }
            | Self::GlobalAccess { opcode, .. }
            | Self::Builtin { opcode, .. }
            | Self::Metatype { opcode, .. }
            | Self::Access { opcode, .. }
            | Self::Apply { opcode, .. }
            | Self::TryApply { opcode, .. }
            | Self::Jump { opcode, .. }
            | Self::CondBranch { opcode, .. }
            | Self::Switch { opcode, .. }
            | Self::CheckedCastBranch { opcode, .. } => *opcode,
        }
    }

    /// Visit every value operand, including block arguments of terminators.
    pub fn for_each_value<F: FnMut(Value)>(&self, pool: &ValueListPool, f: &mut F) {
        match self {
            Self::Nullary { .. }
            | Self::UnaryImm { .. }
            | Self::UnaryIeee64 { .. }
            | Self::UnaryString { .. }
            | Self::FuncAddr { .. }
            | Self::GlobalAccess { .. } => {}
            Self::Unary { arg, .. }
            | Self::FieldAddr { arg, .. }
            | Self::Method { arg, .. }
            | Self::Access { arg, .. }
            | Self::Switch { arg, .. }
            | Self::CheckedCastBranch { arg, .. } => f(*arg),
            Self::Binary { args, .. } => {
                f(args[0]);
                f(args[1]);
            }
            Self::MultiAry { args, .. }
            | Self::Builtin { args, .. }
            | Self::Apply { args, .. }
            | Self::TryApply { args, .. }
            | Self::Jump { args, .. } => {
                for &v in args.as_slice(pool) {
                    f(v);
                }
            }
            Self::Enum { arg, .. } | Self::Metatype { arg, .. } => {
                if let Some(v) = arg.expand() {
                    f(v);
                }
            }
            Self::Select {
                arg,
                cases,
                default,
                ..
            } => {
                f(*arg);
                for &(_, v) in cases.iter() {
                    f(v);
                }
                if let Some(v) = default.expand() {
                    f(v);
                }
            }
            Self::CondBranch {
                arg,
                then_args,
                else_args,
                ..
            } => {
                f(*arg);
                for &v in then_args.as_slice(pool) {
                    f(v);
                }
                for &v in else_args.as_slice(pool) {
                    f(v);
                }
            }
        }
    }

    /// Rewrite every value operand in place.
    pub fn map_values<F: FnMut(Value) -> Value>(&mut self, pool: &mut ValueListPool, f: &mut F) {
        match self {
            Self::Nullary { .. }
            | Self::UnaryImm { .. }
            | Self::UnaryIeee64 { .. }
            | Self::UnaryString { .. }
            | Self::FuncAddr { .. }
            | Self::GlobalAccess { .. } => {}
            Self::Unary { arg, .. }
            | Self::FieldAddr { arg, .. }
            | Self::Method { arg, .. }
            | Self::Access { arg, .. }
            | Self::Switch { arg, .. }
            | Self::CheckedCastBranch { arg, .. } => *arg = f(*arg),
            Self::Binary { args, .. } => {
                args[0] = f(args[0]);
                args[1] = f(args[1]);
            }
            Self::MultiAry { args, .. }
            | Self::Builtin { args, .. }
            | Self::Apply { args, .. }
            | Self::TryApply { args, .. }
            | Self::Jump { args, .. } => {
                for v in args.as_mut_slice(pool) {
                    *v = f(*v);
                }
            }
            Self::Enum { arg, .. } | Self::Metatype { arg, .. } => {
                if let Some(v) = arg.expand() {
                    *arg = f(v).into();
                }
            }
            Self::Select {
                arg,
                cases,
                default,
                ..
            } => {
                *arg = f(*arg);
                for (_, v) in cases.iter_mut() {
                    *v = f(*v);
                }
                if let Some(v) = default.expand() {
                    *default = f(v).into();
                }
            }
            Self::CondBranch {
                arg,
                then_args,
                else_args,
                ..
            } => {
                *arg = f(*arg);
                for v in then_args.as_mut_slice(pool) {
                    *v = f(*v);
                }
                for v in else_args.as_mut_slice(pool) {
                    *v = f(*v);
                }
            }
        }
    }

    /// Visit every successor block of a terminator, in operand order.
    /// Non-terminators have none.
    pub fn for_each_successor<F: FnMut(Block)>(&self, f: &mut F) {
        match self {
            Self::Jump { destination, .. } => f(*destination),
            Self::CondBranch {
                then_dest,
                else_dest,
                ..
            } => {
                f(*then_dest);
                f(*else_dest);
            }
            Self::TryApply { normal, error, .. } => {
                f(*normal);
                f(*error);
            }
            Self::Switch { cases, default, .. } => {
                for &(_, block) in cases.iter() {
                    f(block);
                }
                if let Some(block) = default.expand() {
                    f(block);
                }
            }
            Self::CheckedCastBranch {
                success, failure, ..
            } => {
                f(*success);
                f(*failure);
            }
            _ => {}
        }
    }

    /// Produce a remapped copy of this instruction's data: every value
    /// operand is substituted through `value` and every successor block
    /// through `block`, with value lists copied from `src_pool` into
    /// `dst_pool`. This is the data half of cloning an instruction into
    /// another function.
    pub fn remapped<VM, BM>(
        &self,
        src_pool: &ValueListPool,
        dst_pool: &mut ValueListPool,
        value: &mut VM,
        block: &mut BM,
    ) -> Self
    where
        VM: FnMut(Value) -> Value,
        BM: FnMut(Block) -> Block,
    {
        fn map_list<VM: FnMut(Value) -> Value>(
            list: &ValueList,
            src_pool: &ValueListPool,
            dst_pool: &mut ValueListPool,
            value: &mut VM,
        ) -> ValueList {
            let mut mapped = ValueList::new();
            for &v in list.as_slice(src_pool) {
                mapped.push(value(v), dst_pool);
            }
            mapped
        }

        match self {
            Self::Nullary { opcode } => Self::Nullary { opcode: *opcode },
            Self::Unary { opcode, arg } => Self::Unary {
                opcode: *opcode,
                arg: value(*arg),
            },
            Self::UnaryImm { opcode, imm } => Self::UnaryImm {
                opcode: *opcode,
                imm: *imm,
            },
            Self::UnaryIeee64 { opcode, imm } => Self::UnaryIeee64 {
                opcode: *opcode,
                imm: *imm,
            },
            Self::UnaryString { opcode, literal } => Self::UnaryString {
                opcode: *opcode,
                literal: literal.clone(),
            },
            Self::Binary { opcode, args } => Self::Binary {
                opcode: *opcode,
                args: [value(args[0]), value(args[1])],
            },
            Self::FieldAddr { opcode, arg, field } => Self::FieldAddr {
                opcode: *opcode,
                arg: value(*arg),
                field: *field,
            },
            Self::Method {
                opcode,
                arg,
                method,
            } => Self::Method {
                opcode: *opcode,
                arg: value(*arg),
                method: *method,
            },
            Self::MultiAry { opcode, args } => Self::MultiAry {
                opcode: *opcode,
                args: map_list(args, src_pool, dst_pool, value),
            },
            Self::Enum { opcode, case, arg } => Self::Enum {
                opcode: *opcode,
                case: *case,
                arg: arg.expand().map(|v| value(v)).into(),
            },
            Self::Select {
                opcode,
                arg,
                cases,
                default,
            } => Self::Select {
                opcode: *opcode,
                arg: value(*arg),
                cases: cases.iter().map(|&(c, v)| (c, value(v))).collect(),
                default: default.expand().map(|v| value(v)).into(),
            },
            Self::FuncAddr { opcode, func } => Self::FuncAddr {
                opcode: *opcode,
                func: *func,
            },
            Self::GlobalAccess { opcode, global } => Self::GlobalAccess {
                opcode: *opcode,
                global: *global,
            },
            Self::Builtin { opcode, name, args } => Self::Builtin {
                opcode: *opcode,
                name: name.clone(),
                args: map_list(args, src_pool, dst_pool, value),
            },
            Self::Metatype { opcode, repr, arg } => Self::Metatype {
                opcode: *opcode,
                repr: *repr,
                arg: arg.expand().map(|v| value(v)).into(),
            },
            Self::Access {
                opcode,
                arg,
                enforcement,
            } => Self::Access {
                opcode: *opcode,
                arg: value(*arg),
                enforcement: *enforcement,
            },
            Self::Apply { opcode, args } => Self::Apply {
                opcode: *opcode,
                args: map_list(args, src_pool, dst_pool, value),
            },
            Self::TryApply {
                opcode,
                args,
                normal,
                error,
            } => Self::TryApply {
                opcode: *opcode,
                args: map_list(args, src_pool, dst_pool, value),
                normal: block(*normal),
                error: block(*error),
            },
            Self::Jump {
                opcode,
                destination,
                args,
            } => Self::Jump {
                opcode: *opcode,
                destination: block(*destination),
                args: map_list(args, src_pool, dst_pool, value),
            },
            Self::CondBranch {
                opcode,
                arg,
                then_dest,
                then_args,
                else_dest,
                else_args,
            } => Self::CondBranch {
                opcode: *opcode,
                arg: value(*arg),
                then_dest: block(*then_dest),
                then_args: map_list(then_args, src_pool, dst_pool, value),
                else_dest: block(*else_dest),
                else_args: map_list(else_args, src_pool, dst_pool, value),
            },
            Self::Switch {
                opcode,
                arg,
                cases,
                default,
            } => Self::Switch {
                opcode: *opcode,
                arg: value(*arg),
                cases: cases.iter().map(|&(c, b)| (c, block(b))).collect(),
                default: default.expand().map(|b| block(b)).into(),
            },
            Self::CheckedCastBranch {
                opcode,
                arg,
                success,
                failure,
            } => Self::CheckedCastBranch {
                opcode: *opcode,
                arg: value(*arg),
                success: block(*success),
                failure: block(*failure),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    #[test]
    fn opcode_names() {
        assert_eq!(Opcode::IntegerLiteral.to_string(), "integer_literal");
        assert_eq!(Opcode::Branch.to_string(), "br");
        assert_eq!(Opcode::TryApply.to_string(), "try_apply");
    }

    #[test]
    fn terminators() {
        assert!(Opcode::Return.is_terminator());
        assert!(Opcode::TryApply.is_terminator());
        assert!(Opcode::SwitchEnum.is_terminator());
        assert!(!Opcode::Apply.is_terminator());
        assert!(!Opcode::Load.is_terminator());
        assert!(Opcode::Apply.is_full_apply());
        assert!(!Opcode::PartialApply.is_full_apply());
    }

    #[test]
    fn remap_jump() {
        let mut src_pool = ValueListPool::new();
        let mut dst_pool = ValueListPool::new();
        let mut args = ValueList::new();
        args.push(Value::new(1), &mut src_pool);
        args.push(Value::new(2), &mut src_pool);
        let data = InstructionData::Jump {
            opcode: Opcode::Branch,
            destination: Block::new(0),
            args,
        };

        let mapped = data.remapped(
            &src_pool,
            &mut dst_pool,
            &mut |v| Value::new(v.index() + 10),
            &mut |b| Block::new(b.index() + 1),
        );
        match mapped {
            InstructionData::Jump {
                destination, args, ..
            } => {
                assert_eq!(destination, Block::new(1));
                assert_eq!(args.as_slice(&dst_pool), &[Value::new(11), Value::new(12)]);
            }
            _ => panic!("wrong format"),
        }
    }

    #[test]
    fn visit_values() {
        let pool = ValueListPool::new();
        let data = InstructionData::Binary {
            opcode: Opcode::Store,
            args: [Value::new(4), Value::new(9)],
        };
        let mut seen = Vec::new();
        data.for_each_value(&pool, &mut |v| seen.push(v));
        assert_eq!(seen, vec![Value::new(4), Value::new(9)]);
    }
}
