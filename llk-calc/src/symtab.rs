//! # symtab
//!
//! Calculator variables, built on [`indexmap::IndexMap`].
//!
//! A name enters the table on its first assignment and keeps its index for
//! the lifetime of the table. Reading a name that was never assigned is an
//! error at the call site, not a default value.
//!
//! ## Example
//! ```rust
//! # use llk_calc::SymTab;
//! let mut st = SymTab::new();
//! let i = st.set("foo", 42); // inserts "foo" at index 0
//! assert_eq!(st.get("foo"), Some(42));
//! assert_eq!(st.set("foo", 7), i); // same index, value replaced
//! assert_eq!(st.get("bar"), None);
//! ```

use indexmap::IndexMap;
use smartstring::alias::String;

/// Maps variable names to their current integer values.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymTab {
    tab: IndexMap<String, i64>,
}

impl SymTab {
    /// Creates a new, empty symbol table.
    pub fn new() -> Self {
        Self {
            tab: IndexMap::new(),
        }
    }

    /// Returns the number of assigned variables.
    pub fn len(&self) -> usize {
        self.tab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab.is_empty()
    }

    /// Assigns `value` to `name` and returns the variable's index.
    pub fn set(&mut self, name: &str, value: i64) -> usize {
        match self.tab.get_full_mut(name) {
            Some((index, _, slot)) => {
                *slot = value;
                index
            }
            None => self.tab.insert_full(String::from(name), value).0,
        }
    }

    /// Returns the value of `name`, if it was ever assigned.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.tab.get(name).copied()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tab.get_index_of(name)
    }

    /// Variables in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.tab.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
