//! WITH query to nested query rewriting
//!
//! Runs normalization, component extraction, dependency analysis, cycle
//! detection and nesting for one query at a time.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use withnest_core::{Config, NestError, DEFAULT_OUTPUT_SUFFIX};

use crate::alias::AliasAllocator;
use crate::analyze::DependencyAnalysis;
use crate::builder::build_nested;
use crate::dag::DependencyGraph;
use crate::extract::{extract_components, Extraction};
use crate::normalize::Normalizer;

/// Rewrites queries with WITH components into nested subqueries
#[derive(Debug, Clone, Default)]
pub struct NestedQueryRewriter {
    normalizer: Normalizer,
}

impl NestedQueryRewriter {
    /// Create a rewriter with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rewriter from a loaded config
    pub fn from_config(config: &Config) -> Self {
        Self {
            normalizer: Normalizer::with_max_cross_join_passes(config.max_cross_join_passes),
        }
    }

    /// Rewrite query text into its nested form
    ///
    /// Fails with [`NestError::CyclicDependency`] before any body is
    /// rewritten when components depend on each other in a loop.
    pub fn rewrite(&self, sql: &str) -> Result<NestedQuery, NestError> {
        let normalized = self.normalizer.normalize(sql);
        tracing::debug!(chars = normalized.len(), "normalized query");

        let context = RewriteContext::new(extract_components(&normalized));
        tracing::debug!(components = context.extraction.build_order.len() - 1, "extracted components");

        let graph = DependencyGraph::from_dependencies(&context.analysis.dependencies);
        tracing::debug!(nodes = graph.all_nodes().len(), "built dependency graph");

        if let Some(cycle) = graph.find_cycle() {
            tracing::debug!(cycle = %cycle.join(" -> "), "dependency cycle found");
            return Err(NestError::CyclicDependency { cycle });
        }

        Ok(context.build())
    }

    /// Read a query file and rewrite it
    pub fn rewrite_file(&self, path: &Path) -> Result<NestedQuery, NestError> {
        let sql = std::fs::read_to_string(path).map_err(|source| NestError::Read {
            path: path.display().to_string(),
            source,
        })?;

        self.rewrite(&sql)
    }
}

/// State owned by a single rewrite
struct RewriteContext {
    extraction: Extraction,
    analysis: DependencyAnalysis,
    allocator: AliasAllocator,
}

impl RewriteContext {
    fn new(extraction: Extraction) -> Self {
        let analysis = DependencyAnalysis::analyze(&extraction.bodies);
        let allocator = AliasAllocator::new(analysis.used_aliases.clone());

        Self {
            extraction,
            analysis,
            allocator,
        }
    }

    fn build(mut self) -> NestedQuery {
        let summary = QuerySummary::new(&self.extraction, &self.analysis);

        build_nested(
            &self.extraction.build_order,
            &mut self.extraction.bodies,
            &self.analysis,
            &mut self.allocator,
        );

        let sql = self
            .extraction
            .bodies
            .remove(&self.extraction.final_name)
            .unwrap_or_default()
            .trim()
            .to_string();

        NestedQuery { sql, summary }
    }
}

/// Components, dependencies and aliases discovered in a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    /// Component names in discovery order, final query name last
    pub build_order: Vec<String>,

    /// Component -> referenced components
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// Component -> (referenced component -> alias in the source)
    pub aliases: BTreeMap<String, BTreeMap<String, String>>,
}

impl QuerySummary {
    fn new(extraction: &Extraction, analysis: &DependencyAnalysis) -> Self {
        Self {
            build_order: extraction.build_order.clone(),
            dependencies: sorted(&analysis.dependencies),
            aliases: analysis
                .aliases
                .iter()
                .map(|(owner, aliases)| (owner.clone(), sorted(aliases)))
                .collect(),
        }
    }
}

fn sorted<V: Clone>(map: &HashMap<String, V>) -> BTreeMap<String, V> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Result of a rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedQuery {
    /// The nested query text
    pub sql: String,

    /// What the rewrite discovered along the way
    pub summary: QuerySummary,
}

impl NestedQuery {
    /// Save the nested query text to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), NestError> {
        std::fs::write(path, &self.sql).map_err(|source| NestError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Output path for a rewritten query: `my_query.sql` -> `my_query_nested.sql`
///
/// Inputs without a `.sql` extension get `<suffix>.sql` appended to their
/// file name, so the input itself is never the output.
pub fn nested_output_path(input: &Path, suffix: &str) -> PathBuf {
    let suffix = if suffix.is_empty() { DEFAULT_OUTPUT_SUFFIX } else { suffix };
    let is_sql = input.extension().is_some_and(|ext| ext == "sql");

    let file_name = match (is_sql, input.file_stem(), input.file_name()) {
        (true, Some(stem), _) => format!("{}{}.sql", stem.to_string_lossy(), suffix),
        (_, _, Some(name)) => format!("{}{}.sql", name.to_string_lossy(), suffix),
        _ => format!("query{}.sql", suffix),
    };

    input.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_path_inserts_suffix() {
        assert_eq!(
            nested_output_path(Path::new("queries/my_query.sql"), "_nested"),
            PathBuf::from("queries/my_query_nested.sql")
        );
    }

    #[test]
    fn output_path_without_sql_extension() {
        assert_eq!(
            nested_output_path(Path::new("my_query.txt"), "_nested"),
            PathBuf::from("my_query.txt_nested.sql")
        );
        assert_eq!(
            nested_output_path(Path::new("query"), "_flat"),
            PathBuf::from("query_flat.sql")
        );
    }

    #[test]
    fn empty_suffix_falls_back_to_default() {
        assert_eq!(
            nested_output_path(Path::new("q.sql"), ""),
            PathBuf::from("q_nested.sql")
        );
    }

    #[test]
    fn query_without_with_is_unchanged() {
        let nested = NestedQueryRewriter::new().rewrite("SELECT *\nFROM t\n").unwrap();
        assert_eq!(nested.sql, "select *\nfrom t");
        assert_eq!(nested.summary.build_order, vec![""]);
    }

    #[test]
    fn summary_is_sorted_and_complete() {
        let sql = "with b as (\nselect * from src\n),\na as (\nselect * from b bb\n)\nselect * from a aa";
        let nested = NestedQueryRewriter::new().rewrite(sql).unwrap();

        assert_eq!(nested.summary.build_order, vec!["b", "a", "b_a"]);
        assert_eq!(nested.summary.dependencies["a"], vec!["b"]);
        assert_eq!(nested.summary.dependencies["b_a"], vec!["a"]);
        assert_eq!(nested.summary.aliases["a"]["b"], "bb");
        assert_eq!(
            nested.summary.dependencies.keys().collect::<Vec<_>>(),
            vec!["a", "b", "b_a"]
        );
    }

    #[test]
    fn self_reference_is_cyclic() {
        let sql = "with a as (\nselect * from a x\n)\nselect * from a y";
        let err = NestedQueryRewriter::new().rewrite(sql).unwrap_err();
        assert!(matches!(err, NestError::CyclicDependency { ref cycle } if cycle == &["a", "a"]));
    }

    #[test]
    fn token_after_reference_suppresses_generated_alias() {
        let sql = "with a as (select 1), b as (select * from a x) select * from b ;";
        let nested = NestedQueryRewriter::new().rewrite(sql).unwrap();

        assert_eq!(nested.summary.aliases["a_b"]["b"], ";");
        assert_eq!(
            nested.sql,
            "select * from (\n  select * from (\n    select 1\n    ) x\n  ) ;"
        );
    }

    #[test]
    fn config_caps_cross_join_passes() {
        let config = Config {
            max_cross_join_passes: 0,
            ..Config::default()
        };
        let nested = NestedQueryRewriter::from_config(&config)
            .rewrite("select * from t1, t2")
            .unwrap();
        assert_eq!(nested.sql, "select * from t1, t2");
    }
}
