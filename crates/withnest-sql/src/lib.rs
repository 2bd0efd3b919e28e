//! WITH-clause flattening
//!
//! This crate handles:
//! - Normalizing raw query text (case, whitespace, `--` comments, shorthand cross joins)
//! - Splitting a query into its WITH components with a parenthesis-tracking scanner
//! - Inferring component dependencies and aliases from FROM/JOIN clauses
//! - Rejecting circular component dependencies
//! - Inlining every component as an aliased nested subquery
//!
//! Matching is pattern based, not a SQL parser: string literals and block
//! comments are not understood.

pub mod normalize;
pub mod extract;
pub mod analyze;
pub mod dag;
pub mod alias;
pub mod builder;
pub mod rewriter;

pub use normalize::Normalizer;
pub use extract::{extract_components, Component, Extraction, ScanState, Scanner};
pub use analyze::{AliasMap, DependencyAnalysis, DependencyMap, CLAUSE_KEYWORDS};
pub use dag::{DependencyGraph, NodeId};
pub use alias::AliasAllocator;
pub use builder::{build_nested, nest_block};
pub use rewriter::{nested_output_path, NestedQuery, NestedQueryRewriter, QuerySummary};
