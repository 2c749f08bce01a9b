//! bindpath-core: binding-path type inference over JSON data shapes.
//!
//! A data shape describes a JSON-like value. Slash-delimited binding paths
//! walk it, and the resolver computes what a read yields and what a write
//! accepts. The same resolver backs two surfaces:
//!
//! - [`check_source()`] statically checks `.bind` samples and reports
//!   numbered diagnostics for every ill-typed model call;
//! - [`TypedJsonModel`] guards reads and writes on real `serde_json` data.
//!
//! # Public API
//!
//! - [`Shape`], [`AbsolutePath`], [`RelativePath`] -- the data model
//! - [`resolve()`], [`Resolution`], [`Limits`] -- path resolution
//! - [`is_assignable()`] -- the write-side check
//! - [`DiagnosticOracle`], [`ShapeCheckOracle`], [`TscOracle`] -- diagnostic sources
//! - [`collect_annotations()`], [`evaluate()`], [`Digest`] -- the expectation runner

pub mod assign;
pub mod ast;
pub mod check;
pub mod error;
pub mod expect;
pub mod lexer;
pub mod model;
pub mod oracle;
pub mod parser;
pub mod path;
pub mod resolve;
pub mod shape;
pub mod source;
pub mod types;

// ── Convenience re-exports: key types ────────────────────────────────

pub use error::{codes, Diagnostic};
pub use path::{AbsolutePath, BindingPath, PathError, RelativePath};
pub use resolve::{Limits, Resolution, ResolveError};
pub use shape::{Member, RecordShape, Shape, TemplatePart};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use assign::is_assignable;
pub use check::check_source;
pub use expect::{
    collect_annotations, evaluate, Annotation, AnnotationError, Digest, Expectation, Status,
    TestResult,
};
pub use model::{ListBinding, ModelError, TypedContext, TypedJsonModel};
pub use oracle::{DiagnosticOracle, DiagnosticSet, OracleError, ShapeCheckOracle, TscOracle};
pub use resolve::{resolve, resolve_absolute, resolve_relative};
pub use source::{FileSystemProvider, InMemoryProvider, SourceProvider};
