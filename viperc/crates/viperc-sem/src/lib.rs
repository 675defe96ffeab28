//! viperc-sem - Types, scopes and symbol tables.
//!
//! The parser performs light semantic resolution while it parses: it
//! declares locals as it recognizes declarations, resolves variable
//! references to attach types, and registers struct types. All of that
//! state lives here, bundled in a [`Context`] that the driver creates
//! and threads through the pipeline — there are no process-wide
//! singletons, so compiling several units side by side stays possible.

mod scope;
mod symbols;
mod types;

pub use scope::{LocalId, LocalSymbol, ScopeError, ScopeId, ScopeTree};
pub use symbols::{FunctionSymbol, FunctionTable, GlobalSymbol, GlobalTable, ValueId};
pub use types::{MethodSig, TypeError, TypeId, TypeKind, TypeRegistry};

/// Shared semantic state for one compilation.
///
/// # Examples
///
/// ```
/// use viperc_sem::Context;
///
/// let mut ctx = Context::new();
/// assert!(ctx.types.exists("i32"));
/// let root = ctx.scopes.root();
/// assert_eq!(ctx.scopes.parent(root), None);
/// ```
#[derive(Debug)]
pub struct Context {
    /// Canonical type registry, seeded with the built-ins.
    pub types: TypeRegistry,
    /// Scope arena rooted at the global scope.
    pub scopes: ScopeTree,
    /// Flat global function table.
    pub functions: FunctionTable,
    /// Flat global variable table.
    pub globals: GlobalTable,
}

impl Context {
    pub fn new() -> Self {
        Self {
            types: TypeRegistry::new(),
            scopes: ScopeTree::new(),
            functions: FunctionTable::new(),
            globals: GlobalTable::new(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_seeds_builtins() {
        let ctx = Context::new();
        assert!(ctx.types.exists("void"));
        assert!(ctx.functions.is_empty());
    }

    #[test]
    fn test_context_default_matches_new() {
        let a = Context::default();
        assert!(a.types.exists("i64"));
    }
}
