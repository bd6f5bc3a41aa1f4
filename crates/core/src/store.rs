use std::any::Any;
use std::collections::HashMap;

/// String-keyed scratch space shared by every command of one compile or one
/// run. Integers, strings and opaque handles live in separate namespaces, so
/// the same key may hold one of each.
#[derive(Default)]
pub struct ContextStore {
    ints: HashMap<String, i64>,
    strings: HashMap<String, String>,
    handles: HashMap<String, Box<dyn Any + Send>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.ints.get(key).copied()
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.ints.insert(key.into(), value);
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    /// Typed view of a handle; `None` if absent or stored under another type.
    pub fn handle<T: Any>(&self, key: &str) -> Option<&T> {
        self.handles.get(key)?.downcast_ref()
    }

    pub fn handle_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.handles.get_mut(key)?.downcast_mut()
    }

    pub fn set_handle<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.handles.insert(key.into(), Box::new(value));
    }

    pub fn is_empty(&self) -> bool {
        self.ints.is_empty() && self.strings.is_empty() && self.handles.is_empty()
    }
}

impl std::fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextStore")
            .field("ints", &self.ints)
            .field("strings", &self.strings)
            .field("handles", &self.handles.keys().collect::<Vec<_>>())
            .finish()
    }
}
