//! Query sanitizer and executor.
//!
//! Translator output goes through [`sanitize`] (fence stripping, ILIKE
//! rewrite, relation binding, validation) and is then run by
//! [`QueryExecutor`] against a private in-memory copy of the snapshot.

pub mod engine;
pub mod sanitize;

pub use engine::{DEFAULT_QUERY_TIMEOUT, QueryExecutor, QueryOutput, Row};
pub use sanitize::{
    BOUND_RELATION, SanitizedQuery, bind_relation, rewrite_ilike, sanitize, strip_fences, substring_predicate,
    validate,
};
