use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::parsers::{CommandParser, HitParser, NamedParser, PressParser, StartParser, WaitParser};

/// Keywords of the built-in commands. Extensions may not use them.
pub const RESERVED: [&str; 4] = ["Press", "Wait", "Start", "Hit"];

/// Keyword → parser table consulted by the compiler.
#[derive(Clone)]
pub struct Registry {
    parsers: BTreeMap<String, Arc<dyn CommandParser>>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut parsers: BTreeMap<String, Arc<dyn CommandParser>> = BTreeMap::new();
        parsers.insert("Press".into(), Arc::new(PressParser));
        parsers.insert("Wait".into(), Arc::new(WaitParser));
        parsers.insert("Start".into(), Arc::new(StartParser));
        parsers.insert("Hit".into(), Arc::new(HitParser));
        Self { parsers }
    }
}

impl Registry {
    /// Registry holding only the built-in commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension parser under its declared name.
    pub fn register<P: NamedParser>(&mut self) -> Result<(), RegistryError> {
        self.register_parser(P::NAME, Box::new(P::default()))
    }

    /// Register a parser built by a host-side loader.
    pub fn register_parser(
        &mut self,
        name: impl Into<String>,
        parser: Box<dyn CommandParser>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() || name.starts_with('#') || name.chars().any(char::is_whitespace) {
            return Err(RegistryError::InvalidName(name));
        }
        if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(&name)) {
            return Err(RegistryError::Reserved(name));
        }
        if self.parsers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.parsers.insert(name, Arc::from(parser));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn CommandParser> {
        self.parsers.get(name).map(|p| p.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }

    /// Registered keywords, extensions included, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }

    /// Keywords added on top of the built-ins.
    pub fn extension_names(&self) -> impl Iterator<Item = &str> {
        self.names().filter(|n| !RESERVED.contains(n))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.parsers.keys()).finish()
    }
}
