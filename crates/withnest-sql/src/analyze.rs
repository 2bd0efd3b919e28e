//! Dependency and alias inference
//!
//! Finds which components each body reads from and which alias it gives
//! them, using plain pattern matching on `from`/`join` clauses.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Token after `from`/`join` up to the next whitespace
static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:from|join)(?:\s+)(.*?)(?:\s+|$)").unwrap());

/// Table after `from`/`join`, then the token following it (optionally after `as`)
static ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:from|join)(?:\s+)(.*?)(?:\s+)(?:as\s+)?(.*?)(?:\s+|$)").unwrap()
});

/// Clause keywords captured in place of an alias when a table has none
pub const CLAUSE_KEYWORDS: [&str; 7] = ["where", "on", "group", "order", "limit", "cross", "join"];

/// Component name -> referenced component names, in text order
pub type DependencyMap = HashMap<String, Vec<String>>;

/// Component name -> (referenced component -> alias used in the source)
pub type AliasMap = HashMap<String, HashMap<String, String>>;

/// Dependencies and aliases inferred from component bodies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyAnalysis {
    pub dependencies: DependencyMap,
    pub aliases: AliasMap,

    /// Every alias token seen anywhere in the query
    pub used_aliases: HashSet<String>,
}

impl DependencyAnalysis {
    /// Analyze every body against the set of known component names
    pub fn analyze(bodies: &HashMap<String, String>) -> Self {
        let known: HashSet<&str> = bodies.keys().map(String::as_str).collect();
        let mut analysis = Self::default();

        for (name, body) in bodies {
            let dependencies = referenced_components(body, &known);
            let aliases = table_aliases(body)
                .into_iter()
                .filter_map(|(table, alias)| {
                    analysis.used_aliases.insert(alias.clone());
                    known.contains(table.as_str()).then_some((table, alias))
                })
                .collect();

            tracing::trace!(component = %name, ?dependencies, "analyzed component");
            analysis.dependencies.insert(name.clone(), dependencies);
            analysis.aliases.insert(name.clone(), aliases);
        }

        analysis
    }

    /// Dependencies of one component (empty when unknown)
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.dependencies
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Alias recorded for `dependency` inside `owner`, if any
    pub fn alias_of(&self, owner: &str, dependency: &str) -> Option<&str> {
        self.aliases
            .get(owner)
            .and_then(|aliases| aliases.get(dependency))
            .map(String::as_str)
    }
}

/// Known component names following `from`/`join`, duplicates kept
pub fn referenced_components(body: &str, known: &HashSet<&str>) -> Vec<String> {
    TABLE_RE
        .captures_iter(body)
        .map(|caps| caps[1].to_string())
        .filter(|table| !table.is_empty() && known.contains(table.as_str()))
        .collect()
}

/// Whether a token captured after a table counts as its alias
///
/// A table without an alias makes the pattern pick up the next clause
/// keyword instead. Any other token, punctuation included, is taken as is.
pub fn is_alias_token(token: &str) -> bool {
    !CLAUSE_KEYWORDS.contains(&token)
}

/// `(table, alias)` pairs for every `from`/`join` occurrence that has an alias
///
/// Each occurrence is matched on its own, so a keyword captured in place of a
/// missing alias does not swallow the clause that follows it. Captured clause
/// keywords are not aliases and are skipped.
pub fn table_aliases(body: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut start = 0;

    while let Some(caps) = ALIAS_RE.captures_at(body, start) {
        let (Some(table), Some(alias)) = (caps.get(1), caps.get(2)) else {
            break;
        };
        start = table.end();

        let alias = alias.as_str();
        if is_alias_token(alias) {
            pairs.push((table.as_str().to_string(), alias.to_string()));
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bodies() -> HashMap<String, String> {
        HashMap::from([
            ("my_table_1".to_string(), "select *\nfrom table_1".to_string()),
            ("my_table_2".to_string(), "select *\nfrom my_table_1 as m".to_string()),
            (
                "my_table_1_my_table_2".to_string(),
                "\nselect *\nfrom my_table_1 t1\njoin my_table_2 t2\non t1.id = t2.id\n;".to_string(),
            ),
        ])
    }

    #[test]
    fn dependencies_follow_text_order() {
        let analysis = DependencyAnalysis::analyze(&bodies());

        assert!(analysis.dependencies_of("my_table_1").is_empty());
        assert_eq!(analysis.dependencies_of("my_table_2"), ["my_table_1"]);
        assert_eq!(
            analysis.dependencies_of("my_table_1_my_table_2"),
            ["my_table_1", "my_table_2"]
        );
    }

    #[test]
    fn aliases_per_component() {
        let analysis = DependencyAnalysis::analyze(&bodies());

        let mut used: Vec<_> = analysis.used_aliases.iter().cloned().collect();
        used.sort();
        assert_eq!(used, ["m", "t1", "t2"]);

        assert!(analysis.aliases["my_table_1"].is_empty());
        assert_eq!(analysis.alias_of("my_table_2", "my_table_1"), Some("m"));
        assert_eq!(analysis.alias_of("my_table_1_my_table_2", "my_table_1"), Some("t1"));
        assert_eq!(analysis.alias_of("my_table_1_my_table_2", "my_table_2"), Some("t2"));
    }

    #[test]
    fn keyword_is_not_an_alias() {
        assert!(table_aliases("from a\nwhere x = 1").is_empty());
        assert_eq!(table_aliases("from a\ncross join b bb"), vec![("b".to_string(), "bb".to_string())]);
    }

    #[test]
    fn trailing_semicolon_is_taken_as_alias() {
        assert_eq!(
            table_aliases("from my_table_1\n;"),
            vec![("my_table_1".to_string(), ";".to_string())]
        );
        assert!(is_alias_token(";"));
        assert!(is_alias_token("t1"));
        assert!(!is_alias_token("where"));
    }

    #[test]
    fn semicolon_alias_is_recorded_for_component() {
        let bodies = HashMap::from([
            ("b".to_string(), "select 1".to_string()),
            ("b_".to_string(), " select * from b ;".to_string()),
        ]);
        let analysis = DependencyAnalysis::analyze(&bodies);

        assert_eq!(analysis.alias_of("b_", "b"), Some(";"));
        assert!(analysis.used_aliases.contains(";"));
    }

    #[test]
    fn missing_alias_does_not_hide_next_join() {
        let pairs = table_aliases("from my_table_1\njoin my_table_2 t2\non t2.id = 1");
        assert_eq!(pairs, vec![("my_table_2".to_string(), "t2".to_string())]);
    }

    #[test]
    fn duplicate_references_are_kept() {
        let known = HashSet::from(["a"]);
        assert_eq!(
            referenced_components("select * from a x join a y on x.id = y.id", &known),
            ["a", "a"]
        );
    }

    #[test]
    fn no_from_clause_degrades_to_empty() {
        let body = HashMap::from([("".to_string(), "select 1".to_string())]);
        let analysis = DependencyAnalysis::analyze(&body);
        assert!(analysis.dependencies_of("").is_empty());
        assert!(analysis.aliases[""].is_empty());
        assert!(analysis.used_aliases.is_empty());
    }

    #[test]
    fn aliases_of_plain_tables_are_reserved() {
        let body = HashMap::from([("a".to_string(), "select * from src t1\nwhere 1 = 1".to_string())]);
        let analysis = DependencyAnalysis::analyze(&body);
        assert!(analysis.used_aliases.contains("t1"));
        assert!(analysis.aliases["a"].is_empty());
    }
}
