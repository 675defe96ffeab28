//! Lexical scopes and local symbols.
//!
//! Scopes form a tree rooted at the global scope. The parser pushes a
//! child scope when it enters a function body, method body or compound
//! statement and pops it on the way out; AST nodes that introduce a
//! scope keep its [`ScopeId`]. All scope records live in one
//! [`ScopeTree`] arena, so the ids stay valid for the life of the
//! compilation and nothing needs shared ownership.
//!
//! A parent link is set at creation and never changes, which keeps the
//! chain acyclic; [`ScopeTree::find_variable`] walks it upward and the
//! first hit wins, so locals shadow anything further out.

use thiserror::Error;
use viperc_util::{define_idx, FxHashMap, IndexVec, Span};

use crate::symbols::ValueId;
use crate::types::TypeId;

define_idx!(
    /// Handle to a scope in the [`ScopeTree`].
    ScopeId
);

define_idx!(
    /// Handle to a local symbol in the [`ScopeTree`].
    LocalId
);

/// A named local binding.
#[derive(Clone, Debug)]
pub struct LocalSymbol {
    pub name: String,
    pub ty: TypeId,
    /// Where the binding was declared.
    pub span: Span,
    /// Set when an expression reads the binding.
    pub used: bool,
    /// Back-end storage handle; opaque to the front-end and `None`
    /// until the emitter assigns it.
    pub storage: Option<ValueId>,
}

#[derive(Debug)]
struct ScopeData {
    parent: Option<ScopeId>,
    bindings: FxHashMap<String, LocalId>,
}

/// Errors from scope operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("redeclaration of '{0}'")]
    Redeclared(String),
}

/// Arena of every scope and local symbol in a compilation.
///
/// # Examples
///
/// ```
/// use viperc_sem::{ScopeTree, TypeRegistry};
/// use viperc_util::Span;
///
/// let types = TypeRegistry::new();
/// let i32_ty = types.get("i32").unwrap();
///
/// let mut scopes = ScopeTree::new();
/// let inner = scopes.new_scope(scopes.root());
/// let x = scopes.declare_local(inner, "x", i32_ty, Span::DUMMY).unwrap();
/// assert_eq!(scopes.find_variable(inner, "x"), Some(x));
/// assert_eq!(scopes.find_variable(scopes.root(), "x"), None);
/// ```
#[derive(Debug)]
pub struct ScopeTree {
    scopes: IndexVec<ScopeId, ScopeData>,
    locals: IndexVec<LocalId, LocalSymbol>,
    root: ScopeId,
}

impl ScopeTree {
    /// Create a tree containing only the global scope.
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let root = scopes.push(ScopeData {
            parent: None,
            bindings: FxHashMap::default(),
        });
        Self {
            scopes,
            locals: IndexVec::new(),
            root,
        }
    }

    /// The global scope.
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Create a child of `parent`.
    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(ScopeData {
            parent: Some(parent),
            bindings: FxHashMap::default(),
        })
    }

    /// Parent of a scope, `None` for the global scope.
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope].parent
    }

    /// Bind `name` in `scope`. Fails if the name already exists at
    /// this level; shadowing an outer scope is allowed.
    pub fn declare_local(
        &mut self,
        scope: ScopeId,
        name: &str,
        ty: TypeId,
        span: Span,
    ) -> Result<LocalId, ScopeError> {
        if self.scopes[scope].bindings.contains_key(name) {
            return Err(ScopeError::Redeclared(name.to_string()));
        }
        let id = self.locals.push(LocalSymbol {
            name: name.to_string(),
            ty,
            span,
            used: false,
            storage: None,
        });
        self.scopes[scope].bindings.insert(name.to_string(), id);
        Ok(id)
    }

    /// Resolve `name` starting at `scope`, walking the parent chain.
    pub fn find_variable(&self, scope: ScopeId, name: &str) -> Option<LocalId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id];
            if let Some(&local) = data.bindings.get(name) {
                return Some(local);
            }
            current = data.parent;
        }
        None
    }

    pub fn local(&self, id: LocalId) -> &LocalSymbol {
        &self.locals[id]
    }

    /// Mark a local as read.
    pub fn mark_used(&mut self, id: LocalId) {
        self.locals[id].used = true;
    }

    /// Assign the opaque back-end storage handle for a local.
    pub fn set_storage(&mut self, id: LocalId, handle: ValueId) {
        self.locals[id].storage = Some(handle);
    }

    /// The back-end storage handle, if the emitter has assigned one.
    pub fn storage(&self, id: LocalId) -> Option<ValueId> {
        self.locals[id].storage
    }

    /// All locals in declaration order.
    pub fn iter_locals(&self) -> impl Iterator<Item = (LocalId, &LocalSymbol)> {
        self.locals.iter_enumerated()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
