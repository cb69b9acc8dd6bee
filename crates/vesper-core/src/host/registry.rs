//! Host Function Registry
//!
//! Maps names to native callbacks and their fixed argument counts. The
//! control-flow keywords are pre-registered and cannot be replaced.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::context::HostContext;
use super::id::HostId;
use crate::error::{Fault, RegistryError};
use crate::vm::builtins;

/// Native callback. Receives the calling VM and the instruction operands.
pub type HostCallback = Rc<dyn Fn(&mut HostContext<'_>) -> Result<(), Fault>>;

/// A registered host function
#[derive(Clone)]
pub struct HostFunction {
    name: String,
    arity: usize,
    callback: HostCallback,
}

impl HostFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn callback(&self) -> &HostCallback {
        &self.callback
    }
}

/// Name-keyed registry of host functions.
pub struct HostRegistry {
    functions: Vec<HostFunction>,
    by_name: HashMap<String, HostId>,
    builtin_count: usize,
}

impl HostRegistry {
    /// New registry holding only the built-in keywords
    pub fn new() -> Self {
        let mut registry = HostRegistry {
            functions: Vec::new(),
            by_name: HashMap::new(),
            builtin_count: 0,
        };
        builtins::install(&mut registry);
        registry.builtin_count = registry.functions.len();
        registry
    }

    /// Register a host function. The name must be a plain identifier that is
    /// not already taken by a keyword or another host function.
    pub fn register<F>(&mut self, name: &str, callback: F, arity: usize) -> Result<HostId, RegistryError>
    where
        F: Fn(&mut HostContext<'_>) -> Result<(), Fault> + 'static,
    {
        if !is_valid_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.by_name.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        let id = self.insert(name, Rc::new(callback), arity);
        log::debug!("registered host function '{}' ({} args) as {}", name, arity, id.0);
        Ok(id)
    }

    /// Unchecked insertion, used for the keyword table.
    pub(crate) fn insert(&mut self, name: &str, callback: HostCallback, arity: usize) -> HostId {
        let id = HostId(self.functions.len() as u32);
        self.functions.push(HostFunction {
            name: name.to_string(),
            arity,
            callback,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<HostId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: HostId) -> Option<&HostFunction> {
        self.functions.get(id.0 as usize)
    }

    pub fn name(&self, id: HostId) -> Option<&str> {
        self.get(id).map(HostFunction::name)
    }

    pub fn arity(&self, id: HostId) -> Option<usize> {
        self.get(id).map(HostFunction::arity)
    }

    /// Whether the id belongs to a pre-registered keyword
    pub fn is_builtin(&self, id: HostId) -> bool {
        (id.0 as usize) < self.builtin_count
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.functions.iter().map(|h| (&h.name, h.arity)))
            .finish()
    }
}

/// Identifier rules shared with the tokenizer: letters, digits and `_`,
/// not starting with a digit. `def` is reserved.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && name != "def"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut HostContext<'_>) -> Result<(), Fault> {
        Ok(())
    }

    #[test]
    fn keywords_are_preregistered() {
        let registry = HostRegistry::new();
        for (name, arity) in [
            ("if", 1),
            ("elif", 1),
            ("else", 0),
            ("while", 1),
            ("return", 1),
            ("print", 1),
            ("debug", 1),
            ("break", 0),
        ] {
            let id = registry.lookup(name).expect(name);
            assert_eq!(registry.arity(id), Some(arity), "{}", name);
            assert!(registry.is_builtin(id));
        }
    }

    #[test]
    fn keywords_cannot_be_overridden() {
        let mut registry = HostRegistry::new();
        assert_eq!(
            registry.register("print", noop, 1),
            Err(RegistryError::Duplicate("print".to_string()))
        );
    }

    #[test]
    fn host_ids_follow_registration_order() {
        let mut registry = HostRegistry::new();
        let before = registry.len() as u32;
        let a = registry.register("spawn", noop, 2).unwrap();
        let b = registry.register("tile_at", noop, 2).unwrap();
        assert_eq!(a, HostId(before));
        assert_eq!(b, HostId(before + 1));
        assert!(!registry.is_builtin(a));
        assert_eq!(registry.register("spawn", noop, 0), Err(RegistryError::Duplicate("spawn".into())));
    }

    #[test]
    fn rejects_non_identifier_names() {
        let mut registry = HostRegistry::new();
        for bad in ["", "1up", "a-b", "def", "@0"] {
            assert_eq!(
                registry.register(bad, noop, 0),
                Err(RegistryError::InvalidName(bad.to_string()))
            );
        }
    }
}
