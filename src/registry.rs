//! Sub-test naming registry.
//!
//! Every assertion call takes the next counter for its callable's display
//! name, producing `name#1`, `name#2`, ... in call order. The registry belongs
//! to a single [`Suite`](crate::Suite), so counters never leak between
//! independent test runs, and is shared by every wrapped callable of that
//! suite.

use std::{collections::HashMap, sync::Mutex};

#[derive(Debug, Default)]
pub struct CallRegistry {
    counters: Mutex<HashMap<String, u64>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments and returns the counter for `name`, starting at 1.
    pub fn next(&self, name: &str) -> u64 {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let counter = counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// The next name for `name`, formatted as `name#n`.
    pub fn next_name(&self, name: &str) -> String {
        format!("{}#{}", name, self.next(name))
    }

    /// How many names have been handed out for `name` so far.
    pub fn count(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counters_are_per_name() {
        let registry = CallRegistry::new();
        assert_eq!(registry.next_name("remainder"), "remainder#1");
        assert_eq!(registry.next_name("remainder"), "remainder#2");
        assert_eq!(registry.next_name("add"), "add#1");
        assert_eq!(registry.count("remainder"), 2);
        assert_eq!(registry.count("missing"), 0);
    }

    #[test]
    fn concurrent_callers_never_collide() {
        let registry = Arc::new(CallRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || (0..50).map(|_| registry.next("f")).collect::<Vec<_>>())
            })
            .collect();
        let mut seen: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=400).collect::<Vec<_>>());
    }
}
