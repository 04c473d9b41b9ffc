//! Modifier and formatter registries.
//!
//! A *modifier* turns a raw captured string into its routed value while
//! parsing (`"a/b"` → `["a", "b"]`, `"blog_posts"` → `"BlogPosts"`). A
//! *formatter* is its inverse and runs while generating URLs. Both are keyed
//! by parameter name; registering a function under an existing name replaces
//! the built-in one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use heck::{ToSnakeCase, ToUpperCamelCase};

use crate::params::Value;

/// A named value conversion.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Modifiers (parse direction) and formatters (generate direction).
#[derive(Clone)]
pub struct Transforms {
    modifiers: HashMap<String, Transform>,
    formatters: HashMap<String, Transform>,
}

impl Transforms {
    /// A registry with no entries, not even the built-ins.
    pub fn empty() -> Self {
        Self {
            modifiers: HashMap::new(),
            formatters: HashMap::new(),
        }
    }

    pub fn set_modifier<F>(&mut self, name: impl Into<String>, modifier: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.modifiers.insert(name.into(), Arc::new(modifier));
    }

    pub fn set_formatter<F>(&mut self, name: impl Into<String>, formatter: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.formatters.insert(name.into(), Arc::new(formatter));
    }

    pub fn remove_modifier(&mut self, name: &str) -> Option<Transform> {
        self.modifiers.remove(name)
    }

    pub fn remove_formatter(&mut self, name: &str) -> Option<Transform> {
        self.formatters.remove(name)
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }

    pub fn has_formatter(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    /// Applies the modifier registered for `name`, or returns the value unchanged.
    pub fn modify(&self, name: &str, value: Value) -> Value {
        match self.modifiers.get(name) {
            Some(modifier) => modifier(value),
            None => value,
        }
    }

    /// Applies the formatter registered for `name`, or returns the value unchanged.
    pub fn format(&self, name: &str, value: Value) -> Value {
        match self.formatters.get(name) {
            Some(formatter) => formatter(value),
            None => value,
        }
    }
}

impl Default for Transforms {
    /// Built-ins: `args` splits/joins on `/`, `controller` converts between
    /// `snake_case` in URLs and `UpperCamelCase` in params.
    fn default() -> Self {
        let mut transforms = Self::empty();
        transforms.set_modifier("args", split_args);
        transforms.set_formatter("args", join_args);
        transforms.set_modifier("controller", camelize);
        transforms.set_formatter("controller", underscore);
        transforms
    }
}

impl fmt::Debug for Transforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modifiers: Vec<&String> = self.modifiers.keys().collect();
        let mut formatters: Vec<&String> = self.formatters.keys().collect();
        modifiers.sort();
        formatters.sort();

        f.debug_struct("Transforms")
            .field("modifiers", &modifiers)
            .field("formatters", &formatters)
            .finish()
    }
}

fn split_args(value: Value) -> Value {
    match value {
        Value::Text(text) if text.is_empty() => Value::List(Vec::new()),
        Value::Text(text) => Value::List(text.split('/').map(String::from).collect()),
        other => other,
    }
}

fn join_args(value: Value) -> Value {
    match value {
        Value::List(items) => Value::Text(items.join("/")),
        other => other,
    }
}

fn camelize(value: Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.to_upper_camel_case()),
        other => other,
    }
}

fn underscore(value: Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.to_snake_case()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_builtins() {
        let transforms = Transforms::default();
        assert_eq!(
            transforms.modify("args", Value::from("a/b/c")),
            Value::from(vec!["a", "b", "c"])
        );
        assert_eq!(transforms.modify("args", Value::from("")), Value::List(vec![]));
        assert_eq!(
            transforms.format("args", Value::from(vec!["a", "b"])),
            Value::from("a/b")
        );
    }

    #[test]
    fn test_controller_builtins() {
        let transforms = Transforms::default();
        assert_eq!(
            transforms.modify("controller", Value::from("blog_posts")),
            Value::from("BlogPosts")
        );
        assert_eq!(
            transforms.format("controller", Value::from("BlogPosts")),
            Value::from("blog_posts")
        );
    }

    #[test]
    fn test_unregistered_name_passes_through() {
        let transforms = Transforms::default();
        assert_eq!(transforms.modify("id", Value::from("5")), Value::from("5"));
        assert_eq!(transforms.format("id", Value::Null), Value::Null);
    }

    #[test]
    fn test_override_by_name() {
        let mut transforms = Transforms::default();
        transforms.set_modifier("controller", |value| value);
        assert_eq!(
            transforms.modify("controller", Value::from("blog_posts")),
            Value::from("blog_posts")
        );
        assert!(transforms.has_formatter("controller"));
    }

    #[test]
    fn test_remove_builtins() {
        let mut transforms = Transforms::default();
        assert!(transforms.remove_modifier("controller").is_some());
        assert!(transforms.remove_formatter("controller").is_some());
        assert!(transforms.remove_formatter("controller").is_none());

        assert_eq!(
            transforms.format("controller", Value::from("BlogPosts")),
            Value::from("BlogPosts")
        );
        assert!(transforms.has_modifier("args"));
    }

    #[test]
    fn test_empty_registry() {
        let transforms = Transforms::empty();
        assert!(!transforms.has_modifier("args"));
        assert_eq!(transforms.modify("args", Value::from("a/b")), Value::from("a/b"));
    }
}
