//! viperc-util - Foundation types for the Viper compiler.
//!
//! This crate holds the pieces every phase of the front-end leans on:
//!
//! - [`Span`]: byte ranges with line/column info, stamped on tokens and
//!   AST nodes.
//! - [`Diagnostics`]: the error/warning collector and caret renderer.
//! - [`IndexVec`] / [`Idx`] / [`define_idx!`]: typed-index storage for
//!   the compiler's id spaces.
//!
//! Nothing here knows about Viper syntax or semantics; the crate sits
//! at the bottom of the dependency graph.

mod diagnostic;
mod index_vec;
mod span;

pub use diagnostic::{Diagnostic, DiagnosticCode, Diagnostics, Level};
pub use diagnostic::{
    E_DUPLICATE_STRUCT, E_EXPECTED_TOKEN, E_INCOMPLETE_TYPE, E_INT_OVERFLOW, E_REDECLARATION,
    E_TYPE_MISMATCH, E_UNDECLARED, E_UNEXPECTED_CHAR, E_UNEXPECTED_TOKEN, E_UNKNOWN_ESCAPE,
    E_UNKNOWN_TYPE, E_UNTERMINATED_STRING, W_UNUSED_VARIABLE,
};
pub use index_vec::{Idx, IndexVec};
pub use span::Span;

// Re-export the hash maps used across the compiler so downstream
// crates agree on the hasher.
pub use rustc_hash::{FxHashMap, FxHashSet};

// Spans ride on every token and AST node; keep them small.
static_assertions::const_assert!(std::mem::size_of::<Span>() <= 24);
