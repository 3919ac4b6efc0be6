//! Function inlining.
//!
//! The `Inliner` splices a clone of a callee's body into a caller at one
//! full call site. It performs a single step of inlining only: callees of
//! the callee are not inlined recursively, and the call instruction itself
//! is left in place for the calling pass to delete once it has finished
//! with it.
//!
//! Splicing preserves execution semantics: call arguments are bound to the
//! callee's entry-block parameters, returns become branches to a return-to
//! block that threads the returned value to the call's uses, and throws
//! become branches to the call's error successor. Debug scopes are rebuilt
//! so that every cloned instruction remains attributable to its source
//! inside the callee, as called from the caller.
//!
//! An inliner instance may be reused for several call sites of the same
//! callee; its remap tables are scratch state that is reset on every call.

use crate::entity::SecondaryMap;
use crate::ir::debuginfo::{ScopeArena, ScopeData, ScopeParent};
use crate::ir::instructions::{InstructionData, Opcode, ValueList};
use crate::ir::{
    Block, FuncRepresentation, Function, Inst, Loc, OwnershipKind, ScopeRef, Value,
};
use crate::packed_option::PackedOption;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Which flavor of inlining is being performed.
///
/// The flavors differ in debug-info treatment and in which callees they
/// accept. Mandatory inlining is required by language semantics and runs
/// before most optimizations; it refuses foreign callees and drops debug
/// annotations, absorbing the callee into the call site. Performance
/// inlining is optimizer-driven; it accepts any callee, preserves debug
/// annotations, and records a proper inline scope chain.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InlineKind {
    /// Inlining the language requires; the call must disappear.
    Mandatory,
    /// Optimizer-driven inlining.
    Performance,
}

/// A one-call-site function inliner.
///
/// Borrowing the caller and callee separately means a function can never be
/// inlined into itself; the higher-level guards (visibility, recursion
/// detection, body availability) remain the calling pass's responsibility.
pub struct Inliner<'f> {
    caller: &'f mut Function,
    callee: &'f mut Function,
    scopes: &'f mut ScopeArena,
    kind: InlineKind,

    /// Callee value to caller value. Seeded with the argument bindings,
    /// extended as instructions and block parameters are cloned.
    value_map: SecondaryMap<Value, PackedOption<Value>>,

    /// Callee block to caller block.
    block_map: SecondaryMap<Block, PackedOption<Block>>,

    /// The `block_map` pairs in clone order, entry first. Terminator
    /// patching walks this so its output is deterministic.
    cloned_blocks: Vec<(Block, Block)>,

    /// Memoized caller-side mirrors of callee scopes. Each callee scope is
    /// copied at most once per inline operation, which keeps the inlined-at
    /// chains of nested inlines well formed.
    scope_cache: FxHashMap<ScopeRef, ScopeRef>,

    /// The scope rooting the inlined-call-site chain of all cloned
    /// instructions.
    call_site_scope: PackedOption<ScopeRef>,

    /// The wrapped call-site location assigned to synthesized branches and
    /// unreachables.
    loc: Loc,

    /// Caller block before which newly created blocks are placed, purely
    /// for readable block order. `None` when the call block is last.
    insert_before: Option<Block>,
}

impl<'f> Inliner<'f> {
    /// Create an inliner that splices `callee` into `caller`.
    pub fn new(
        caller: &'f mut Function,
        callee: &'f mut Function,
        scopes: &'f mut ScopeArena,
        kind: InlineKind,
    ) -> Self {
        Self {
            caller,
            callee,
            scopes,
            kind,
            value_map: SecondaryMap::new(),
            block_map: SecondaryMap::new(),
            cloned_blocks: Vec::new(),
            scope_cache: FxHashMap::default(),
            call_site_scope: None.into(),
            loc: Loc::default(),
            insert_before: None,
        }
    }

    /// Can `call` be inlined?
    ///
    /// The site must be a full apply, throwing or not, inserted in the
    /// caller's layout. Partial applications have no body to splice.
    pub fn can_inline(&self, call: Inst) -> bool {
        self.caller.dfg.inst_is_valid(call)
            && self.caller.dfg[call].opcode().is_full_apply()
            && self.caller.layout.inst_block(call).is_some()
    }

    /// Inline the callee at `call`, binding `args` to the callee's
    /// entry-block parameters.
    ///
    /// On return, the callee's body has been spliced into the caller and
    /// every use of the call's result refers to the threaded return value.
    /// The call instruction itself is still present; deleting it is the
    /// caller's job.
    pub fn inline(&mut self, call: Inst, args: &[Value]) {
        assert!(self.can_inline(call), "call site cannot be inlined");
        assert!(
            self.kind == InlineKind::Performance
                || self.callee.representation == FuncRepresentation::Native,
            "cannot inline foreign-method or foreign-C callees under mandatory inlining"
        );
        let call_block = self.caller.layout.inst_block(call).unwrap();
        let callee_entry = self
            .callee
            .layout
            .entry_block()
            .expect("callee has no body");

        log::trace!(
            "inlining {} into {} at {}",
            self.callee.name,
            self.caller.name,
            call
        );

        // The location used by all synthesized control flow, wrapped so it
        // reads as reached-through-inlining.
        let call_loc = self.caller.srclocs[call];
        self.loc = match self.kind {
            InlineKind::Performance => call_loc.inlined(),
            InlineKind::Mandatory => call_loc.mandatory_inlined(),
        };

        // The call's debug scope, falling back to the caller function's
        // scope when the call carries none.
        let call_scope = self
            .caller
            .scopes[call]
            .expand()
            .or_else(|| self.caller.scope.expand())
            .expect("call site has no debug scope");

        self.call_site_scope = match self.kind {
            // Mandatory inlining: every cloned instruction inherits scope
            // and location from the call site.
            InlineKind::Mandatory => call_scope,
            // Performance inlining: construct a proper inline scope pointing
            // back to the call site, preserving the call's own inlined-at
            // chain.
            InlineKind::Performance => self.scopes.make_scope(ScopeData {
                loc: call_loc,
                parent: Some(ScopeParent::Scope(call_scope)),
                inlined_at: self.scopes[call_scope].inlined_at,
            }),
        }
        .into();

        // Keep the callee's debug metadata alive until emission.
        self.callee.inlined = true;

        // If the call block is not the last block, new blocks are inserted
        // before its successor so the cloned body reads contiguously.
        self.insert_before = self.caller.layout.next_block(call_block);

        self.value_map.clear();
        self.block_map.clear();
        self.cloned_blocks.clear();
        self.scope_cache.clear();

        // Bind the call arguments to the callee entry parameters.
        let entry_params: SmallVec<[Value; 8]> =
            self.callee.dfg.block_params(callee_entry).iter().copied().collect();
        assert_eq!(
            entry_params.len(),
            args.len(),
            "wrong number of arguments for the callee entry block"
        );
        for (&param, &arg) in entry_params.iter().zip(args) {
            self.value_map[param] = arg.into();
        }

        // The entry block is not cloned: its instructions are emitted
        // directly into the call block, ahead of the call instruction.
        self.block_map[callee_entry] = call_block.into();
        self.cloned_blocks.push((callee_entry, call_block));

        self.discover_from(callee_entry);
        self.clone_instructions(call);

        // A non-throwing apply of a callee whose entry block returns:
        // thread the returned value directly and skip the split.
        let entry_term = self.callee.layout.last_inst(callee_entry).unwrap();
        if self.caller.dfg[call].opcode() == Opcode::Apply
            && self.callee.dfg[entry_term].opcode() == Opcode::Return
        {
            let returned = self.remap_unary_operand(entry_term);
            let result = self
                .caller
                .dfg
                .detach_result(call)
                .expect("apply must produce a result");
            self.caller.dfg.change_to_alias(result, returned);
            log::debug!(
                "inlined single-block {} into {} without a split",
                self.callee.name,
                self.caller.name
            );
            return;
        }

        // Establish the return-to block. A try_apply already has one: its
        // normal successor. For a plain apply, split the call block so the
        // call and everything after it form the tail, and thread the
        // returned value through a fresh block parameter.
        let try_dests = match &self.caller.dfg[call] {
            InstructionData::TryApply { normal, error, .. } => Some((*normal, *error)),
            _ => None,
        };
        let (return_to, error_dest) = match try_dests {
            Some((normal, error)) => (normal, Some(error)),
            None => {
                let return_to = self.caller.dfg.make_block();
                self.caller.layout.split_block(return_to, call);
                // Place the return-to block after the cloned blocks.
                match self.insert_before {
                    Some(before) => self.caller.layout.move_block_before(return_to, before),
                    None => self.caller.layout.move_block_to_end(return_to),
                }
                let result = self
                    .caller
                    .dfg
                    .inst_result(call)
                    .expect("apply must produce a result");
                let ty = self.caller.dfg.value_type(result);
                let ret_param =
                    self.caller
                        .dfg
                        .append_block_param(return_to, ty, OwnershipKind::Owned);
                let result = self.caller.dfg.detach_result(call).unwrap();
                self.caller.dfg.change_to_alias(result, ret_param);
                (return_to, None)
            }
        };

        self.patch_terminators(return_to, error_dest);

        log::debug!(
            "inlined {} blocks of {} into {}",
            self.cloned_blocks.len(),
            self.callee.name,
            self.caller.name
        );
    }

    /// Walk the callee's reachable blocks in depth-first preorder, giving
    /// each block other than the entry a fresh caller block with matching
    /// parameters.
    fn discover_from(&mut self, block: Block) {
        let term = self
            .callee
            .layout
            .last_inst(block)
            .expect("callee block has no terminator");
        debug_assert!(self.callee.dfg[term].opcode().is_terminator());

        let mut succs: SmallVec<[Block; 4]> = SmallVec::new();
        self.callee.dfg[term].for_each_successor(&mut |b| succs.push(b));

        for succ in succs {
            if self.block_map[succ].is_some() {
                continue;
            }
            let new_block = self.caller.dfg.make_block();
            match self.insert_before {
                Some(before) => self.caller.layout.insert_block(new_block, before),
                None => self.caller.layout.append_block(new_block),
            }
            let params: SmallVec<[Value; 8]> =
                self.callee.dfg.block_params(succ).iter().copied().collect();
            for param in params {
                let ty = self.callee.dfg.value_type(param);
                let ownership = self.callee.dfg.value_ownership(param);
                let new_param = self.caller.dfg.append_block_param(new_block, ty, ownership);
                self.value_map[param] = new_param.into();
            }
            self.block_map[succ] = new_block.into();
            self.cloned_blocks.push((succ, new_block));
            self.discover_from(succ);
        }
    }

    /// Clone the non-terminator instructions of every discovered block, in
    /// callee order. Terminators are patched afterwards, once every value
    /// and block mapping exists.
    fn clone_instructions(&mut self, call: Inst) {
        for i in 0..self.cloned_blocks.len() {
            let (src, dst) = self.cloned_blocks[i];
            let insts: SmallVec<[Inst; 32]> = self.callee.layout.block_insts(src).collect();
            debug_assert!(!insts.is_empty(), "callee block {} is empty", src);
            let is_entry = i == 0;
            for &inst in &insts[..insts.len() - 1] {
                debug_assert!(!self.callee.dfg[inst].opcode().is_terminator());
                self.clone_inst(inst, dst, if is_entry { Some(call) } else { None });
            }
        }
    }

    /// Clone one callee instruction into the caller, remapping its operands.
    /// Inserts before `before` when given, else at the end of `dst`.
    /// Returns `None` when the instruction is dropped instead of cloned.
    fn clone_inst(&mut self, inst: Inst, dst: Block, before: Option<Inst>) -> Option<Inst> {
        let opcode = self.callee.dfg[inst].opcode();
        if self.kind == InlineKind::Mandatory
            && matches!(opcode, Opcode::DebugValue | Opcode::DebugValueAddr)
        {
            // A mandatorily inlined callee behaves like a function compiled
            // without debug annotations.
            return None;
        }

        self.ensure_operands_mapped(inst);
        let data = {
            let value_map = &self.value_map;
            let block_map = &self.block_map;
            self.callee.dfg[inst].remapped(
                &self.callee.dfg.value_lists,
                &mut self.caller.dfg.value_lists,
                &mut |v| value_map[v].expect("operand of cloned instruction not remapped"),
                &mut |b| block_map[b].expect("successor of cloned terminator not remapped"),
            )
        };

        let new_inst = self.caller.dfg.make_inst(data);
        if let Some(result) = self.callee.dfg.inst_result(inst) {
            let ty = self.callee.dfg.value_type(result);
            let ownership = self.callee.dfg.value_ownership(result);
            let new_result = self.caller.dfg.make_inst_result(new_inst, ty, ownership);
            self.value_map[result] = new_result.into();
        }
        self.caller.srclocs[new_inst] = self.remap_location(self.callee.srclocs[inst]);
        let scope = self.remap_scope(self.callee.scopes[inst].expand());
        self.caller.scopes[new_inst] = scope.into();
        match before {
            Some(point) => self.caller.layout.insert_inst(new_inst, point),
            None => self.caller.layout.append_inst(new_inst, dst),
        }
        Some(new_inst)
    }

    /// Make sure every operand of `inst` has a caller-side mapping.
    ///
    /// Values defined in the callee are mapped when their definitions are
    /// cloned, and definitions dominate uses, so the only legitimately
    /// unmapped operands are undefined sentinels; they map to matching
    /// sentinels in the caller.
    fn ensure_operands_mapped(&mut self, inst: Inst) {
        let mut unmapped: SmallVec<[Value; 4]> = SmallVec::new();
        {
            let value_map = &self.value_map;
            self.callee.dfg[inst].for_each_value(&self.callee.dfg.value_lists, &mut |v| {
                if value_map[v].is_none() && !unmapped.contains(&v) {
                    unmapped.push(v);
                }
            });
        }
        for v in unmapped {
            assert!(
                self.callee.dfg.value_is_undef(v),
                "use of callee value {} before its definition was cloned",
                v
            );
            let ty = self.callee.dfg.value_type(v);
            let ownership = self.callee.dfg.value_ownership(v);
            let undef = self.caller.dfg.make_undef(ty, ownership);
            self.value_map[v] = undef.into();
        }
    }

    /// Rewrite the terminator of every cloned block.
    ///
    /// Returns become branches to the return-to block carrying the remapped
    /// returned value. Throws become branches to the call's error successor,
    /// or an unreachable when the call site cannot throw. Anything else is
    /// cloned with its values and successors remapped.
    fn patch_terminators(&mut self, return_to: Block, error_dest: Option<Block>) {
        for i in 0..self.cloned_blocks.len() {
            let (src, dst) = self.cloned_blocks[i];
            let term = self
                .callee
                .layout
                .last_inst(src)
                .expect("callee block has no terminator");
            match self.callee.dfg[term].opcode() {
                Opcode::Return => {
                    let returned = self.remap_unary_operand(term);
                    self.emit_branch(dst, return_to, returned, term);
                }
                Opcode::Throw => match error_dest {
                    Some(error) => {
                        let thrown = self.remap_unary_operand(term);
                        self.emit_branch(dst, error, thrown, term);
                    }
                    None => {
                        // A throw reached from a non-throwing apply. The
                        // front end guarantees this path is dead.
                        let inst = self.caller.dfg.make_inst(InstructionData::Nullary {
                            opcode: Opcode::Unreachable,
                        });
                        self.caller.srclocs[inst] = self.loc;
                        let scope = self.remap_scope(self.callee.scopes[term].expand());
                        self.caller.scopes[inst] = scope.into();
                        self.caller.layout.append_inst(inst, dst);
                    }
                },
                _ => {
                    self.clone_inst(term, dst, None);
                }
            }
        }
    }

    /// The remapped operand of a unary terminator.
    fn remap_unary_operand(&mut self, inst: Inst) -> Value {
        self.ensure_operands_mapped(inst);
        let arg = match &self.callee.dfg[inst] {
            InstructionData::Unary { arg, .. } => *arg,
            _ => panic!("expected a unary terminator"),
        };
        self.value_map[arg].expect("terminator operand not remapped")
    }

    /// Append a synthesized branch to `dest` passing `arg`, attributed to
    /// the wrapped call-site location.
    fn emit_branch(&mut self, from: Block, dest: Block, arg: Value, original: Inst) {
        let mut args = ValueList::new();
        args.push(arg, &mut self.caller.dfg.value_lists);
        let inst = self.caller.dfg.make_inst(InstructionData::Jump {
            opcode: Opcode::Branch,
            destination: dest,
            args,
        });
        self.caller.srclocs[inst] = self.loc;
        let scope = self.remap_scope(self.callee.scopes[original].expand());
        self.caller.scopes[inst] = scope.into();
        self.caller.layout.append_inst(inst, from);
    }

    /// The location a cloned instruction keeps. Under mandatory inlining
    /// everything collapses onto the wrapped call-site location.
    fn remap_location(&self, loc: Loc) -> Loc {
        match self.kind {
            InlineKind::Mandatory => self.loc,
            InlineKind::Performance => loc,
        }
    }

    /// The scope a cloned instruction adopts.
    fn remap_scope(&mut self, scope: Option<ScopeRef>) -> ScopeRef {
        match self.kind {
            InlineKind::Mandatory => self.call_site_scope.unwrap(),
            InlineKind::Performance => match scope {
                None => self.call_site_scope.unwrap(),
                Some(scope) => self.inline_scope(scope),
            },
        }
    }

    /// Mirror a callee scope into the caller, rewriting its inlined-at
    /// chain to root at the call site while keeping the lexical chain
    /// intact. Memoized so each callee scope is copied at most once per
    /// inline operation.
    fn inline_scope(&mut self, scope: ScopeRef) -> ScopeRef {
        if let Some(&mirrored) = self.scope_cache.get(&scope) {
            return mirrored;
        }
        let inlined_at = match self.scopes[scope].inlined_at.expand() {
            Some(site) => self.inline_scope(site),
            None => self.call_site_scope.unwrap(),
        };
        let loc = self.scopes[scope].loc;
        let parent = self.scopes[scope].parent;
        let mirrored = self.scopes.make_scope(ScopeData {
            loc,
            parent,
            inlined_at: inlined_at.into(),
        });
        self.scope_cache.insert(scope, mirrored);
        mirrored
    }
}
