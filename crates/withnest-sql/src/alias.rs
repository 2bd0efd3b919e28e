//! Fresh alias synthesis for nested subqueries

use std::collections::HashSet;
use crate::analyze::AliasMap;

/// Hands out `t1`, `t2`, ... skipping every alias already in use
#[derive(Debug, Clone)]
pub struct AliasAllocator {
    next_index: usize,
    used: HashSet<String>,
}

impl AliasAllocator {
    /// Create an allocator that avoids the given aliases
    pub fn new(used: HashSet<String>) -> Self {
        Self { next_index: 1, used }
    }

    /// Alias suffix to append after the nested subquery for `dependency` in `owner`
    ///
    /// Returns `None` when the source already names an alias for that
    /// reference (it stays in the text after the substituted name). Otherwise
    /// returns a fresh alias with a leading space, e.g. `" t3"`.
    pub fn allocate(&mut self, aliases: &AliasMap, owner: &str, dependency: &str) -> Option<String> {
        let has_alias = aliases
            .get(owner)
            .is_some_and(|recorded| recorded.contains_key(dependency));

        if has_alias {
            None
        } else {
            Some(format!(" {}", self.next_alias()))
        }
    }

    /// Next unused `t<k>` alias; it is reserved before returning
    pub fn next_alias(&mut self) -> String {
        loop {
            let candidate = format!("t{}", self.next_index);
            self.next_index += 1;

            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
