use std::{cell::RefCell, collections::HashMap, fmt::Display};

use super::{CompilerDisplay, CompilerDisplayError, SourceMap};

#[derive(Debug)]
pub enum StringTableError {
    NotFound,
}

impl Display for StringTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StringTableError::NotFound => f.write_str("StringId Not Found"),
        }
    }
}

/**
Stores a table of all distinct strings read from source code.  The IR
structures in the compiler use IDs which map back to the distinct string in
the string table.

Adding a string which is already in the table returns the ID that was
assigned to it the first time.
 */
#[derive(Debug, Default)]
pub struct StringTable {
    /// Strings indexed by their [`StringId`].
    strings: RefCell<Vec<String>>,

    /// Table mapping raw strings to their [`StringId`]s.
    table: RefCell<HashMap<String, StringId>>,
}

impl StringTable {
    pub fn new() -> StringTable {
        StringTable::default()
    }

    /// Inserts a string into the table and returns the assigned ID for that
    /// string value.
    pub fn insert(&self, s: String) -> StringId {
        let mut table = self.table.borrow_mut();
        if let Some(id) = table.get(&s) {
            return *id;
        }

        let mut strings = self.strings.borrow_mut();
        let id = StringId(strings.len() as u32);
        strings.push(s.clone());
        table.insert(s, id);
        id
    }

    /// Search the string table for the given string and, if found, return the
    /// associated [`StringId`].
    pub fn find(&self, s: &str) -> Option<StringId> {
        self.table.borrow().get(s).copied()
    }

    /// Given an ID, if it is assigned to a string, then return the associated
    /// string.
    pub fn get(&self, id: StringId) -> Result<String, StringTableError> {
        self.strings
            .borrow()
            .get(id.0 as usize)
            .cloned()
            .ok_or(StringTableError::NotFound)
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default, Hash, Eq, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    pub fn new() -> StringId {
        Self::default()
    }
}

impl Display for StringId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("#{}", self.0))
    }
}

impl CompilerDisplay for StringId {
    fn fmt(&self, _: &SourceMap, st: &StringTable) -> Result<String, CompilerDisplayError> {
        st.get(*self).map_err(|e| e.into())
    }
}
