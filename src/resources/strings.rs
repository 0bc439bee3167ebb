//! String interner for shader sources and variable names

use std::collections::HashMap;

/// Interned string id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringId(u32);

/// Two-way map between strings and dense ids
#[derive(Debug, Default)]
pub struct StringInterner {
    ids: HashMap<String, StringId>,
    strings: Vec<String>,
}

impl StringInterner {
    pub fn new() -> StringInterner {
        StringInterner::default()
    }

    /// Intern `s`, returning the existing id when already known.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = StringId(self.strings.len() as u32);
        self.strings.push(s.to_owned());
        self.ids.insert(s.to_owned(), id);
        id
    }

    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut interner = StringInterner::new();
        let a = interner.intern("position");
        let b = interner.intern("color");
        let a2 = interner.intern("position");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "position");
        assert_eq!(interner.resolve(b), "color");
        assert_eq!(interner.len(), 2);
    }
}
