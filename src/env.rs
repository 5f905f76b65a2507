//! The shell's own environment store.
//!
//! Unlike a typical program, the shell does not inherit the host process's
//! environment: it starts empty and only ever holds what `setenv`/`unsetenv`
//! (or a loaded `.ishrc`) put there. What's in the store at the moment a
//! command is launched becomes exactly that command's environment block.

/// One `name -> value` entry, in insertion order.
struct EnvEntry {
    name: String,
    value: Option<String>,
}

/// An insertion-ordered `name -> value` map with no duplicate names.
///
/// Mirrors the original shell's singly-linked `var_t` list: lookups are
/// linear, which is fine for the handful of variables an interactive shell
/// session ever holds.
#[derive(Default)]
pub struct EnvStore {
    entries: Vec<EnvEntry>,
}

impl EnvStore {
    /// Creates an empty store. The shell never seeds this from the host
    /// process's real environment.
    pub fn new() -> EnvStore {
        EnvStore { entries: Vec::new() }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Sets `name` to `value`, replacing any existing value. A `None` value
    /// still creates/keeps the entry, just with nothing printed after `=`.
    pub fn set(&mut self, name: &str, value: Option<&str>) {
        let value = value.map(|v| v.to_owned());
        match self.find(name) {
            Some(i) => self.entries[i].value = value,
            None => self.entries.push(EnvEntry {
                name: name.to_owned(),
                value,
            }),
        }
    }

    /// Returns the current value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name)
            .and_then(|i| self.entries[i].value.as_deref())
    }

    /// Removes `name`. A no-op if `name` isn't set.
    pub fn unset(&mut self, name: &str) {
        if let Some(i) = self.find(name) {
            self.entries.remove(i);
        }
    }

    /// Prints `name=value` for every entry, in insertion order, to stdout.
    /// A missing value renders as an empty string.
    pub fn display(&self) {
        for e in &self.entries {
            println!("{}={}", e.name, e.value.as_deref().unwrap_or(""));
        }
    }

    /// Flattens the store into `"name=value"` strings, in insertion order,
    /// suitable for building an `exec` environment block.
    pub fn export(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{}={}", e.name, e.value.as_deref().unwrap_or("")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let env = EnvStore::new();
        assert_eq!(env.export(), Vec::<String>::new());
    }

    #[test]
    fn set_get_replace() {
        let mut env = EnvStore::new();
        env.set("FOO", Some("bar"));
        assert_eq!(env.get("FOO"), Some("bar"));
        env.set("FOO", Some("baz"));
        assert_eq!(env.get("FOO"), Some("baz"));
    }

    #[test]
    fn set_with_no_value() {
        let mut env = EnvStore::new();
        env.set("FOO", None);
        assert_eq!(env.get("FOO"), None);
        assert_eq!(env.export(), vec!["FOO=".to_string()]);
    }

    #[test]
    fn unset_unknown_is_noop() {
        let mut env = EnvStore::new();
        env.unset("NOPE");
        assert_eq!(env.export().len(), 0);
    }

    #[test]
    fn insertion_order_preserved() {
        let mut env = EnvStore::new();
        env.set("B", Some("2"));
        env.set("A", Some("1"));
        env.set("B", Some("2-again"));
        assert_eq!(env.export(), vec!["B=2-again".to_string(), "A=1".to_string()]);
    }

    #[test]
    fn no_duplicate_names() {
        let mut env = EnvStore::new();
        env.set("X", Some("1"));
        env.set("X", Some("2"));
        assert_eq!(env.entries.len(), 1);
    }
}
