//! Debug scopes.
//!
//! A debug scope associates instructions with a lexical source region. Scopes
//! form a tree: each scope has a lexical parent (either an enclosing scope or
//! the function itself) and, when the scope was produced by inlining, an
//! `inlined_at` link pointing at the scope of the call site it was inlined
//! through. Walking `inlined_at` links recovers the whole call-site chain of
//! a cloned instruction.
//!
//! Scopes live in a `ScopeArena` owned by the enclosing module and are never
//! freed before the module itself is dropped, so `ScopeRef`s stay valid for
//! the remainder of compilation.

use crate::entity::PrimaryMap;
use crate::ir::entities::{FuncRef, ScopeRef};
use crate::ir::sourceloc::Loc;
use crate::packed_option::PackedOption;
use core::ops::Index;

/// The lexical parent of a debug scope.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ScopeParent {
    /// The scope is the root scope of a function.
    Function(FuncRef),
    /// The scope is nested in another scope.
    Scope(ScopeRef),
}

/// The contents of a debug scope.
#[derive(Clone, Debug)]
pub struct ScopeData {
    /// The source region this scope covers.
    pub loc: Loc,
    /// The lexical parent, if any.
    pub parent: Option<ScopeParent>,
    /// The scope of the call site this scope was inlined through, if any.
    pub inlined_at: PackedOption<ScopeRef>,
}

impl ScopeData {
    /// Create a scope covering `loc` with no parent and no inline chain.
    pub fn new(loc: Loc) -> Self {
        Self {
            loc,
            parent: None,
            inlined_at: None.into(),
        }
    }

    /// The lexical parent if it is a scope.
    pub fn parent_scope(&self) -> Option<ScopeRef> {
        match self.parent {
            Some(ScopeParent::Scope(scope)) => Some(scope),
            _ => None,
        }
    }

    /// The lexical parent if it is a function.
    pub fn parent_function(&self) -> Option<FuncRef> {
        match self.parent {
            Some(ScopeParent::Function(func)) => Some(func),
            _ => None,
        }
    }
}

/// The module-owned arena of debug scopes.
///
/// Allocation only; scopes are dropped with the arena.
#[derive(Clone, Default)]
pub struct ScopeArena {
    scopes: PrimaryMap<ScopeRef, ScopeData>,
}

impl ScopeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new scope.
    pub fn make_scope(&mut self, data: ScopeData) -> ScopeRef {
        self.scopes.push(data)
    }

    /// The number of scopes allocated so far.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Is the arena empty?
    pub fn is_empty(&self) -> bool {
        self.scopes.len() == 0
    }
}

impl Index<ScopeRef> for ScopeArena {
    type Output = ScopeData;

    fn index(&self, scope: ScopeRef) -> &ScopeData {
        &self.scopes[scope]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::sourceloc::SourceLoc;

    #[test]
    fn tree_links() {
        let mut arena = ScopeArena::new();
        let root = arena.make_scope(ScopeData::new(Loc::new(SourceLoc::new(1))));
        let inner = arena.make_scope(ScopeData {
            loc: Loc::new(SourceLoc::new(2)),
            parent: Some(ScopeParent::Scope(root)),
            inlined_at: None.into(),
        });

        assert_eq!(arena.len(), 2);
        assert_eq!(arena[inner].parent_scope(), Some(root));
        assert_eq!(arena[inner].parent_function(), None);
        assert!(arena[root].inlined_at.is_none());
    }
}
