//! String interning for object-type and field names.
//!
//! Names are interned so that pattern and constraint equivalence checks
//! during sharing detection compare integers, not strings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interned name identifier.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Symbol(pub(crate) u32);

impl Symbol {
    /// Returns the raw index of this symbol.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Reserved symbol for the synthetic initial fact type.
    pub const INITIAL_FACT: Symbol = Symbol(0);

    /// Reserved symbol for the `this` pseudo-field.
    pub const THIS: Symbol = Symbol(1);
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Interner for object-type and field names.
///
/// It is not thread-safe; use external synchronization if needed.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interner {
    /// String storage indexed by symbol.
    strings: Vec<Arc<str>>,
    /// Map from string to symbol.
    index: HashMap<Arc<str>, Symbol>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    /// Reserved names that are pre-interned at startup.
    const RESERVED: &'static [&'static str] = &[
        "InitialFact", // Symbol(0) = INITIAL_FACT
        "this",        // Symbol(1) = THIS
    ];

    /// Creates a new interner with reserved names pre-interned.
    #[must_use]
    pub fn new() -> Self {
        let mut interner = Self {
            strings: Vec::new(),
            index: HashMap::new(),
        };
        for name in Self::RESERVED {
            interner.intern(name);
        }
        interner
    }

    /// Interns a name, returning its symbol.
    ///
    /// Interning the same name twice returns the same symbol.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&symbol) = self.index.get(name) {
            return symbol;
        }

        // u32 symbols cap the interner well beyond any realistic rule base
        #[allow(clippy::cast_possible_truncation)]
        let symbol = Symbol(self.strings.len() as u32);
        let arc: Arc<str> = name.into();
        self.strings.push(arc.clone());
        self.index.insert(arc, symbol);
        symbol
    }

    /// Looks up a symbol without interning.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.index.get(name).copied()
    }

    /// Resolves a symbol back to its name.
    #[must_use]
    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        self.strings.get(symbol.0 as usize).map(AsRef::as_ref)
    }

    /// Returns the number of interned names, reserved names included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if only reserved names are interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.len() == Self::RESERVED.len()
    }
}
