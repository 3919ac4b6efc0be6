//! Inline cost model.
//!
//! For now just assume that every instruction lowers one to one to a machine
//! instruction, and classify each as either free or expensive. Inlining
//! policies sum the cost over a callee body to estimate code growth.

use crate::ir::{AccessEnforcement, Function, Inst, InstructionData, MetatypeRepr, Opcode, ValueDef};

/// The inlining cost class of a single instruction.
///
/// "Free" approximates instructions that lower to zero or one trivial
/// machine operation; "Expensive" approximates everything with non-trivial
/// code size or runtime cost.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InlineCost {
    /// Lowers to nothing, or close to it.
    Free,
    /// Carries real code size or runtime cost.
    Expensive,
}

fn enforcement_cost(enforcement: AccessEnforcement) -> InlineCost {
    match enforcement {
        AccessEnforcement::Unknown => {
            panic!("evaluating cost of access with unknown enforcement")
        }
        AccessEnforcement::Dynamic => InlineCost::Expensive,
        AccessEnforcement::Static | AccessEnforcement::Unsafe => InlineCost::Free,
    }
}

/// The enforcement mode of an `end_access`, read off its paired
/// `begin_access`.
fn begin_access_enforcement(func: &Function, end_access: Inst) -> AccessEnforcement {
    let begin = match &func.dfg[end_access] {
        InstructionData::Unary { arg, .. } => func.dfg.resolve_aliases(*arg),
        _ => panic!("end_access must have a unary operand"),
    };
    let begin_inst = match func.dfg.value_def(begin) {
        ValueDef::Result(inst) => inst,
        _ => panic!("end_access operand must be a begin_access result"),
    };
    match &func.dfg[begin_inst] {
        InstructionData::Access { enforcement, .. } => *enforcement,
        _ => panic!("end_access operand must be a begin_access result"),
    }
}

/// Classify the inlining cost of `inst`.
///
/// Total over canonical instructions and pure: repeated calls return the
/// same classification. Calling it on an instruction that is only valid in
/// non-canonical IR is a programmer error.
pub fn instruction_inline_cost(func: &Function, inst: Inst) -> InlineCost {
    match func.dfg[inst].opcode() {
        Opcode::IntegerLiteral
        | Opcode::FloatLiteral
        | Opcode::StringLiteral
        | Opcode::UntypedStringLiteral
        | Opcode::DebugValue
        | Opcode::DebugValueAddr
        | Opcode::FixLifetime
        | Opcode::BeginBorrow
        | Opcode::EndBorrow
        | Opcode::EndBorrowArgument
        | Opcode::EndLifetime
        | Opcode::MarkDependence
        | Opcode::UncheckedOwnershipConversion
        | Opcode::FunctionRef
        | Opcode::GlobalAddr
        | Opcode::AllocGlobal => InlineCost::Free,

        // Typed address projections are free.
        Opcode::TupleElementAddr | Opcode::StructElementAddr | Opcode::ProjectBlockStorage => {
            InlineCost::Free
        }

        // Aggregates are exploded during lowering; these are effectively
        // no-ops.
        Opcode::Tuple | Opcode::Struct | Opcode::TupleExtract | Opcode::StructExtract => {
            InlineCost::Free
        }

        // Unchecked casts are free.
        Opcode::AddressToPointer
        | Opcode::PointerToAddress
        | Opcode::UncheckedRefCast
        | Opcode::UncheckedRefCastAddr
        | Opcode::UncheckedAddrCast
        | Opcode::UncheckedTrivialBitCast
        | Opcode::UncheckedBitwiseCast
        | Opcode::RawPointerToRef
        | Opcode::RefToRawPointer
        | Opcode::Upcast
        | Opcode::ThinToThickFunction
        | Opcode::ThinFunctionToPointer
        | Opcode::PointerToThinFunction
        | Opcode::ConvertFunction
        | Opcode::BridgeObjectToWord => InlineCost::Free,

        // Access instructions are free unless we're dynamically enforcing
        // them.
        Opcode::BeginAccess | Opcode::BeginUnpairedAccess | Opcode::EndUnpairedAccess => {
            match &func.dfg[inst] {
                InstructionData::Access { enforcement, .. } => enforcement_cost(*enforcement),
                _ => panic!("access marker must use the access format"),
            }
        }
        Opcode::EndAccess => enforcement_cost(begin_access_enforcement(func, inst)),

        // Protocol descriptor references are free.
        Opcode::ForeignProtocol => InlineCost::Free,

        // Metatype-to-object conversions are free.
        Opcode::ForeignExistentialMetatypeToObject | Opcode::ForeignMetatypeToObject => {
            InlineCost::Free
        }

        // Thick-to-foreign conversions and bridge object conversions imply
        // runtime work.
        Opcode::ThickToForeignMetatype
        | Opcode::ForeignToThickMetatype
        | Opcode::BridgeObjectToRef
        | Opcode::RefToBridgeObject => InlineCost::Expensive,

        Opcode::Metatype => match &func.dfg[inst] {
            // Thin metatypes are always free. Thick metatypes may require
            // generic or lazy instantiation; treating them all as expensive
            // is a known over-approximation, kept as is.
            InstructionData::Metatype {
                repr: MetatypeRepr::Thin,
                ..
            } => InlineCost::Free,
            _ => InlineCost::Expensive,
        },

        // Return, throw, and unreachable are free.
        Opcode::Return | Opcode::Throw | Opcode::Unreachable => InlineCost::Free,

        Opcode::Builtin => match &func.dfg[inst] {
            // Branch-hint and fast-path-hint builtins vanish during
            // lowering.
            InstructionData::Builtin { name, .. } => {
                if name.starts_with("int_expect") || &**name == "onFastPath" {
                    InlineCost::Free
                } else {
                    InlineCost::Expensive
                }
            }
            _ => panic!("builtin must use the builtin format"),
        },

        Opcode::Apply
        | Opcode::TryApply
        | Opcode::PartialApply
        | Opcode::GlobalValue
        | Opcode::ValueMetatype
        | Opcode::ExistentialMetatype
        | Opcode::AllocStack
        | Opcode::AllocBox
        | Opcode::AllocRef
        | Opcode::AllocRefDynamic
        | Opcode::AllocExistentialBox
        | Opcode::AllocValueBuffer
        | Opcode::DeallocStack
        | Opcode::DeallocBox
        | Opcode::DeallocRef
        | Opcode::DeallocPartialRef
        | Opcode::DeallocExistentialBox
        | Opcode::DeallocValueBuffer
        | Opcode::StrongRetain
        | Opcode::StrongRelease
        | Opcode::StrongRetainUnowned
        | Opcode::UnownedRetain
        | Opcode::UnownedRelease
        | Opcode::RetainValue
        | Opcode::ReleaseValue
        | Opcode::CopyValue
        | Opcode::DestroyValue
        | Opcode::IsUnique
        | Opcode::Load
        | Opcode::Store
        | Opcode::LoadBorrow
        | Opcode::StoreBorrow
        | Opcode::LoadWeak
        | Opcode::StoreWeak
        | Opcode::LoadUnowned
        | Opcode::StoreUnowned
        | Opcode::CopyAddr
        | Opcode::DestroyAddr
        | Opcode::IndexAddr
        | Opcode::CondFail
        | Opcode::Enum
        | Opcode::UncheckedEnumData
        | Opcode::InitEnumDataAddr
        | Opcode::UncheckedTakeEnumDataAddr
        | Opcode::InjectEnumAddr
        | Opcode::SelectEnum
        | Opcode::SelectEnumAddr
        | Opcode::SelectValue
        | Opcode::InitExistentialAddr
        | Opcode::InitExistentialRef
        | Opcode::InitExistentialMetatype
        | Opcode::DeinitExistentialAddr
        | Opcode::OpenExistentialAddr
        | Opcode::OpenExistentialRef
        | Opcode::OpenExistentialBox
        | Opcode::OpenExistentialMetatype
        | Opcode::ProjectBox
        | Opcode::ProjectExistentialBox
        | Opcode::ProjectValueBuffer
        | Opcode::RefElementAddr
        | Opcode::RefTailAddr
        | Opcode::ClassMethod
        | Opcode::SuperMethod
        | Opcode::WitnessMethod
        | Opcode::DynamicMethod
        | Opcode::KeyPath
        | Opcode::UnconditionalCheckedCast
        | Opcode::UnconditionalCheckedCastAddr
        | Opcode::CheckedCastBranch
        | Opcode::CheckedCastAddrBranch
        | Opcode::Branch
        | Opcode::CondBranch
        | Opcode::SwitchEnum
        | Opcode::SwitchEnumAddr
        | Opcode::SwitchValue => InlineCost::Expensive,

        Opcode::MarkUninitialized | Opcode::MarkFunctionEscape => {
            panic!(
                "{} is not valid in canonical IR",
                func.dfg[inst].opcode()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instructions::ValueList;
    use crate::ir::{types, Function, OwnershipKind};

    /// A function with a single block to hang test instructions off.
    struct Fixture {
        func: Function,
    }

    impl Fixture {
        fn new() -> Self {
            let mut func = Function::new();
            let block = func.dfg.make_block();
            func.layout.append_block(block);
            Self { func }
        }

        fn inst(&mut self, data: InstructionData) -> Inst {
            let block = self.func.layout.entry_block().unwrap();
            let inst = self.func.dfg.make_inst(data);
            self.func.layout.append_inst(inst, block);
            inst
        }

        fn cost(&self, inst: Inst) -> InlineCost {
            instruction_inline_cost(&self.func, inst)
        }
    }

    #[test]
    fn spot_checks() {
        let mut fx = Fixture::new();

        let lit = fx.inst(InstructionData::UnaryImm {
            opcode: Opcode::IntegerLiteral,
            imm: 3,
        });
        assert_eq!(fx.cost(lit), InlineCost::Free);

        let alloc = fx.inst(InstructionData::Nullary {
            opcode: Opcode::AllocStack,
        });
        assert_eq!(fx.cost(alloc), InlineCost::Expensive);

        let block = fx.func.layout.entry_block().unwrap();
        let param = fx
            .func
            .dfg
            .append_block_param(block, types::I64, OwnershipKind::Trivial);
        let ret = fx.inst(InstructionData::Unary {
            opcode: Opcode::Return,
            arg: param,
        });
        assert_eq!(fx.cost(ret), InlineCost::Free);

        let branch = fx.inst(InstructionData::Jump {
            opcode: Opcode::Branch,
            destination: block,
            args: ValueList::new(),
        });
        assert_eq!(fx.cost(branch), InlineCost::Expensive);
    }

    #[test]
    fn access_enforcement() {
        let mut fx = Fixture::new();
        let addr = fx.inst(InstructionData::Nullary {
            opcode: Opcode::AllocStack,
        });
        let addr_val = fx
            .func
            .dfg
            .make_inst_result(addr, types::ADDR, OwnershipKind::Trivial);

        let static_access = fx.inst(InstructionData::Access {
            opcode: Opcode::BeginAccess,
            arg: addr_val,
            enforcement: AccessEnforcement::Static,
        });
        let static_val =
            fx.func
                .dfg
                .make_inst_result(static_access, types::ADDR, OwnershipKind::Trivial);
        assert_eq!(fx.cost(static_access), InlineCost::Free);

        let dynamic_access = fx.inst(InstructionData::Access {
            opcode: Opcode::BeginAccess,
            arg: addr_val,
            enforcement: AccessEnforcement::Dynamic,
        });
        assert_eq!(fx.cost(dynamic_access), InlineCost::Expensive);

        // end_access inherits the enforcement of its begin_access.
        let end = fx.inst(InstructionData::Unary {
            opcode: Opcode::EndAccess,
            arg: static_val,
        });
        assert_eq!(fx.cost(end), InlineCost::Free);

        let unsafe_access = fx.inst(InstructionData::Access {
            opcode: Opcode::BeginUnpairedAccess,
            arg: addr_val,
            enforcement: AccessEnforcement::Unsafe,
        });
        assert_eq!(fx.cost(unsafe_access), InlineCost::Free);
    }

    #[test]
    #[should_panic(expected = "unknown enforcement")]
    fn unknown_enforcement_is_an_error() {
        let mut fx = Fixture::new();
        let addr = fx.inst(InstructionData::Nullary {
            opcode: Opcode::AllocStack,
        });
        let addr_val = fx
            .func
            .dfg
            .make_inst_result(addr, types::ADDR, OwnershipKind::Trivial);
        let access = fx.inst(InstructionData::Access {
            opcode: Opcode::BeginAccess,
            arg: addr_val,
            enforcement: AccessEnforcement::Unknown,
        });
        let _ = fx.cost(access);
    }

    #[test]
    fn metatypes() {
        let mut fx = Fixture::new();
        let thin = fx.inst(InstructionData::Metatype {
            opcode: Opcode::Metatype,
            repr: MetatypeRepr::Thin,
            arg: None.into(),
        });
        assert_eq!(fx.cost(thin), InlineCost::Free);

        let thick = fx.inst(InstructionData::Metatype {
            opcode: Opcode::Metatype,
            repr: MetatypeRepr::Thick,
            arg: None.into(),
        });
        assert_eq!(fx.cost(thick), InlineCost::Expensive);
    }

    #[test]
    fn builtins() {
        let mut fx = Fixture::new();
        let expect = fx.inst(InstructionData::Builtin {
            opcode: Opcode::Builtin,
            name: "int_expect_Int1".into(),
            args: ValueList::new(),
        });
        assert_eq!(fx.cost(expect), InlineCost::Free);

        let fast_path = fx.inst(InstructionData::Builtin {
            opcode: Opcode::Builtin,
            name: "onFastPath".into(),
            args: ValueList::new(),
        });
        assert_eq!(fx.cost(fast_path), InlineCost::Free);

        let add = fx.inst(InstructionData::Builtin {
            opcode: Opcode::Builtin,
            name: "add_Int32".into(),
            args: ValueList::new(),
        });
        assert_eq!(fx.cost(add), InlineCost::Expensive);
    }

    #[test]
    fn stable() {
        let mut fx = Fixture::new();
        let lit = fx.inst(InstructionData::UnaryImm {
            opcode: Opcode::IntegerLiteral,
            imm: 1,
        });
        assert_eq!(fx.cost(lit), fx.cost(lit));
    }

    #[test]
    #[should_panic(expected = "not valid in canonical IR")]
    fn non_canonical_is_an_error() {
        let mut fx = Fixture::new();
        let block = fx.func.layout.entry_block().unwrap();
        let param = fx
            .func
            .dfg
            .append_block_param(block, types::ADDR, OwnershipKind::Trivial);
        let marker = fx.inst(InstructionData::Unary {
            opcode: Opcode::MarkUninitialized,
            arg: param,
        });
        let _ = fx.cost(marker);
    }
}
