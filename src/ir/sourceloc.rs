//! Source locations.
//!
//! A `SourceLoc` is an opaque source-range datum attached to every
//! instruction and debug scope. A `Loc` pairs a `SourceLoc` with an inline
//! mark: when the inliner splices a callee into a caller, locations it
//! synthesizes (or, under mandatory inlining, rewrites) are wrapped so that
//! later consumers can tell they were reached through inlining, and through
//! which flavor.

use core::fmt::{self, Display, Formatter};

/// An opaque source-range datum.
///
/// The default location is the "unknown" position. The actual encoding of
/// the offset is up to the front end that produced the IR.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct SourceLoc(u32);

impl SourceLoc {
    /// Create a new source location with the given encoded offset.
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Is this the default "unknown" location?
    pub fn is_default(self) -> bool {
        self == Default::default()
    }

    /// The encoded offset.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl Display for SourceLoc {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.is_default() {
            write!(f, "@-")
        } else {
            write!(f, "@{:04x}", self.0)
        }
    }
}

/// How a location was reached, if through inlining.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum InlineMark {
    /// The location comes straight from the front end.
    #[default]
    None,
    /// The location was reached by performance inlining.
    Performance,
    /// The location was reached by mandatory inlining.
    Mandatory,
}

/// A source location as attached to instructions and debug scopes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Loc {
    source: SourceLoc,
    mark: InlineMark,
}

impl Loc {
    /// A plain, un-inlined location.
    pub fn new(source: SourceLoc) -> Self {
        Self {
            source,
            mark: InlineMark::None,
        }
    }

    /// The derived form marking this location as reached by performance
    /// inlining.
    pub fn inlined(self) -> Self {
        Self {
            source: self.source,
            mark: InlineMark::Performance,
        }
    }

    /// The derived form marking this location as reached by mandatory
    /// inlining.
    pub fn mandatory_inlined(self) -> Self {
        Self {
            source: self.source,
            mark: InlineMark::Mandatory,
        }
    }

    /// The underlying source range.
    pub fn source(self) -> SourceLoc {
        self.source
    }

    /// The inline mark.
    pub fn mark(self) -> InlineMark {
        self.mark
    }
}
