//! Nested query construction
//!
//! Walks the build order and replaces each dependency reference with the
//! dependency's already rewritten body.

use std::collections::HashMap;
use crate::alias::AliasAllocator;
use crate::analyze::DependencyAnalysis;

/// Wrap a body as an indented subquery followed by its alias suffix
pub fn nest_block(body: &str, alias_suffix: &str) -> String {
    format!("(\n{body}\n){alias_suffix}").replace('\n', "\n  ")
}

/// Substitute every dependency into its owner, in build order
///
/// Each dependency-list entry consumes the first remaining occurrence of the
/// dependency name, so a component referenced twice is nested twice. The
/// build order is trusted to list dependencies before their dependents.
pub fn build_nested(
    build_order: &[String],
    bodies: &mut HashMap<String, String>,
    analysis: &DependencyAnalysis,
    allocator: &mut AliasAllocator,
) {
    for owner in build_order {
        let Some(mut updated) = bodies.get(owner).cloned() else {
            continue;
        };

        for dependency in analysis.dependencies_of(owner) {
            let Some(dependency_body) = bodies.get(dependency) else {
                continue;
            };

            let alias_suffix = allocator
                .allocate(&analysis.aliases, owner, dependency)
                .unwrap_or_default();
            let nested = nest_block(dependency_body, &alias_suffix);

            tracing::trace!(owner = %owner, dependency = %dependency, alias = %alias_suffix.trim(), "nesting dependency");
            updated = updated.replacen(dependency.as_str(), &nested, 1);
        }

        bodies.insert(owner.clone(), updated);
    }
}
