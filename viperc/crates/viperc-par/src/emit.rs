//! The code-generation contract.
//!
//! The front-end stops at a typed AST; everything machine-specific
//! lives behind the [`Emitter`] trait. A back-end walks the AST,
//! returns an opaque [`ValueId`] per node, and records storage handles
//! for locals through the scope tree. A `None` result signals an emit
//! error, which the back-end reports through diagnostics.

use viperc_sem::{Context, LocalId, ScopeId, ValueId};

use crate::ast::AstNode;

/// Back-end interface consumed by the AST during code generation.
pub trait Emitter {
    /// Emit code for `node` in `scope`, returning the produced value
    /// handle, or `None` on an emit error.
    fn emit(&mut self, node: &AstNode, ctx: &mut Context, scope: ScopeId) -> Option<ValueId>;

    /// Record the storage handle backing a local symbol.
    fn set_storage(&mut self, ctx: &mut Context, local: LocalId, handle: ValueId) {
        ctx.scopes.set_storage(local, handle);
    }

    /// The storage handle backing a local, if assigned.
    fn get_storage(&self, ctx: &Context, local: LocalId) -> Option<ValueId> {
        ctx.scopes.storage(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viperc_util::Span;

    /// An emitter that hands out sequential handles and allocates
    /// storage for every variable declaration it sees.
    struct CountingEmitter {
        next: u32,
    }

    impl CountingEmitter {
        fn new() -> Self {
            // Zero is reserved.
            Self { next: 1 }
        }

        fn fresh(&mut self) -> ValueId {
            let id = ValueId(self.next);
            self.next += 1;
            id
        }
    }

    impl Emitter for CountingEmitter {
        fn emit(&mut self, node: &AstNode, ctx: &mut Context, _scope: ScopeId) -> Option<ValueId> {
            if let AstNode::VariableDecl {
                local: Some(local), ..
            } = node
            {
                let handle = self.fresh();
                self.set_storage(ctx, *local, handle);
                return Some(handle);
            }
            Some(self.fresh())
        }
    }

    #[test]
    fn test_emitter_assigns_storage() {
        let mut ctx = Context::new();
        let i32_ty = ctx.types.get("i32").unwrap();
        let root = ctx.scopes.root();
        let local = ctx
            .scopes
            .declare_local(root, "x", i32_ty, Span::DUMMY)
            .unwrap();

        let node = AstNode::VariableDecl {
            ty: i32_ty,
            name: "x".to_string(),
            local: Some(local),
            init: None,
            span: Span::DUMMY,
        };

        let mut emitter = CountingEmitter::new();
        assert_eq!(emitter.get_storage(&ctx, local), None);
        let handle = emitter.emit(&node, &mut ctx, root);
        assert!(handle.is_some());
        assert_eq!(emitter.get_storage(&ctx, local), handle);
    }
}
