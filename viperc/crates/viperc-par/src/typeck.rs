//! The type-check pass.
//!
//! A single walk over the AST after parsing. The parser already typed
//! literals and variable references; this pass refines operator and
//! member-access types, so on success every expression node carries
//! its final type:
//!
//! - arithmetic keeps the operand type, comparisons and logic produce
//!   `bool`;
//! - `object.field` resolves against the object's struct type, method
//!   callees against its method signatures;
//! - assignment targets must be assignable places;
//! - `if`/`while` conditions must be `bool`;
//! - `return` values are checked against the return type the parser
//!   captured;
//! - `new T` produces a pointer to `T`.
//!
//! Call-site argument counts and types are not validated.
//!
//! An operand that already failed to resolve carries `void`; checks
//! involving it are skipped so one bad name does not cascade into a
//! column of type errors. The pass ends by warning about locals that
//! were never read.

use viperc_sem::{Context, TypeId};
use viperc_util::{Diagnostics, Span, E_INCOMPLETE_TYPE, E_TYPE_MISMATCH, E_UNKNOWN_TYPE, W_UNUSED_VARIABLE};

use crate::ast::{AstNode, BinaryOp, UnaryOp};

/// AST type checker; owns no state beyond the borrowed context and
/// diagnostics handler.
pub struct TypeChecker<'a> {
    ctx: &'a mut Context,
    diag: &'a mut Diagnostics,
}

impl<'a> TypeChecker<'a> {
    pub fn new(ctx: &'a mut Context, diag: &'a mut Diagnostics) -> Self {
        Self { ctx, diag }
    }

    /// Check every top-level node, then report unused locals.
    pub fn check(&mut self, nodes: &mut [AstNode]) {
        for node in nodes.iter_mut() {
            self.check_node(node);
        }
        self.report_unused_locals();
    }

    fn error(&mut self, span: Span, message: String) {
        self.diag.report_error_with_code(E_TYPE_MISMATCH, span, message);
    }

    fn compatible(&self, a: TypeId, b: TypeId) -> bool {
        a == b || (self.ctx.types.is_integer(a) && self.ctx.types.is_integer(b))
    }

    /// The struct behind a value: the type itself, or the pointee for
    /// a pointer-to-struct.
    fn struct_of(&self, ty: TypeId) -> Option<TypeId> {
        if self.ctx.types.is_struct(ty) {
            return Some(ty);
        }
        let pointee = self.ctx.types.pointee(ty)?;
        self.ctx.types.is_struct(pointee).then_some(pointee)
    }

    /// Type of an assignment target. A bare variable on the left of
    /// `=` is written, not read, so it is not marked used; targets
    /// with a base expression (member, index, deref) still read that
    /// base for addressing and go through the normal path.
    fn check_assign_target(&mut self, node: &mut AstNode) -> TypeId {
        if let AstNode::Variable { ty, .. } = node {
            return *ty;
        }
        self.check_node(node)
    }

    /// Resolve one node, returning its type (`void` for statements).
    fn check_node(&mut self, node: &mut AstNode) -> TypeId {
        let void = self.ctx.types.void();

        match node {
            AstNode::IntegerLiteral { ty, .. }
            | AstNode::StringLiteral { ty, .. }
            | AstNode::NullptrLiteral { ty, .. }
            | AstNode::BoolLiteral { ty, .. } => *ty,

            AstNode::Variable { ty, local, .. } => {
                if let Some(local) = *local {
                    self.ctx.scopes.mark_used(local);
                }
                *ty
            }

            AstNode::Unary {
                op,
                operand,
                ty,
                span,
            } => {
                let op = *op;
                let span = *span;

                // `new T` names a type rather than a value; resolve it
                // directly.
                if op == UnaryOp::New {
                    let result = if let AstNode::Variable { name, .. } = &**operand {
                        match self.ctx.types.get(name) {
                            Some(target) => self.ctx.types.create_pointer(target),
                            None => {
                                let message = format!("unknown type name '{}'", name);
                                self.diag.report_error_with_code(E_UNKNOWN_TYPE, span, message);
                                void
                            }
                        }
                    } else {
                        void
                    };
                    *ty = result;
                    return result;
                }

                let operand_ty = self.check_node(operand);
                if operand_ty == void {
                    *ty = void;
                    return void;
                }
                let result = match op {
                    UnaryOp::Not => {
                        if !self.ctx.types.is_bool(operand_ty) {
                            let found = self.ctx.types.display(operand_ty);
                            self.error(span, format!("operand of '!' must be bool, found {}", found));
                        }
                        self.ctx.types.bool_type()
                    }
                    UnaryOp::Neg => {
                        if !self.ctx.types.is_integer(operand_ty) {
                            let found = self.ctx.types.display(operand_ty);
                            self.error(span, format!("cannot negate value of type {}", found));
                        }
                        operand_ty
                    }
                    UnaryOp::Deref => match self.ctx.types.pointee(operand_ty) {
                        Some(pointee) => pointee,
                        None => {
                            let found = self.ctx.types.display(operand_ty);
                            self.error(span, format!("cannot dereference value of type {}", found));
                            void
                        }
                    },
                    UnaryOp::AddressOf => self.ctx.types.create_pointer(operand_ty),
                    UnaryOp::New => unreachable!("handled above"),
                };
                *ty = result;
                result
            }

            AstNode::Binary {
                lhs,
                op,
                rhs,
                ty,
                span,
            } => {
                let op = *op;
                let span = *span;
                // Plain `=` only writes its target; the compound
                // assignments read the old value first.
                let lhs_ty = if op == BinaryOp::Assign {
                    self.check_assign_target(lhs)
                } else {
                    self.check_node(lhs)
                };
                let rhs_ty = self.check_node(rhs);
                if lhs_ty == void || rhs_ty == void {
                    *ty = void;
                    return void;
                }

                let result = if op.is_assignment() {
                    if !lhs.is_assignable() {
                        self.error(span, "invalid assignment target".to_string());
                    }
                    if !self.compatible(rhs_ty, lhs_ty) {
                        let expected = self.ctx.types.display(lhs_ty);
                        let found = self.ctx.types.display(rhs_ty);
                        self.error(
                            span,
                            format!("cannot assign {} to {}", found, expected),
                        );
                    }
                    lhs_ty
                } else if op.is_comparison() {
                    if !self.compatible(lhs_ty, rhs_ty) {
                        let left = self.ctx.types.display(lhs_ty);
                        let right = self.ctx.types.display(rhs_ty);
                        self.error(
                            span,
                            format!("cannot compare {} with {}", left, right),
                        );
                    }
                    self.ctx.types.bool_type()
                } else if op.is_logical() {
                    if !self.ctx.types.is_bool(lhs_ty) || !self.ctx.types.is_bool(rhs_ty) {
                        self.error(span, "logical operands must be bool".to_string());
                    }
                    self.ctx.types.bool_type()
                } else {
                    if !self.ctx.types.is_integer(lhs_ty) || !self.ctx.types.is_integer(rhs_ty) {
                        let left = self.ctx.types.display(lhs_ty);
                        let right = self.ctx.types.display(rhs_ty);
                        self.error(
                            span,
                            format!("mismatched operand types {} and {}", left, right),
                        );
                    }
                    lhs_ty
                };
                *ty = result;
                result
            }

            AstNode::Call {
                callee, args, ty, ..
            } => {
                let callee_ty = self.check_node(callee);
                for arg in args.iter_mut() {
                    self.check_node(arg);
                }
                *ty = callee_ty;
                callee_ty
            }

            AstNode::Index {
                array,
                index,
                ty,
                span,
            } => {
                let span = *span;
                let array_ty = self.check_node(array);
                let index_ty = self.check_node(index);
                if index_ty != void && !self.ctx.types.is_integer(index_ty) {
                    self.error(span, "array index must be an integer".to_string());
                }
                if array_ty == void {
                    *ty = void;
                    return void;
                }
                let result = match self
                    .ctx
                    .types
                    .element(array_ty)
                    .or_else(|| self.ctx.types.pointee(array_ty))
                {
                    Some(element) => element,
                    None => {
                        let found = self.ctx.types.display(array_ty);
                        self.error(span, format!("cannot index value of type {}", found));
                        void
                    }
                };
                *ty = result;
                result
            }

            AstNode::Member {
                object,
                field,
                ty,
                span,
            } => {
                let span = *span;
                let object_ty = self.check_node(object);
                if object_ty == void {
                    *ty = void;
                    return void;
                }
                let result = match self.struct_of(object_ty) {
                    Some(struct_ty) => {
                        if let Some((_, field_ty)) = self.ctx.types.struct_field(struct_ty, field)
                        {
                            field_ty
                        } else if let Some(method) = self.ctx.types.struct_method(struct_ty, field)
                        {
                            method.return_type.unwrap_or(void)
                        } else {
                            let on = self.ctx.types.display(struct_ty);
                            let message = format!("no member '{}' on type {}", field, on);
                            self.error(span, message);
                            void
                        }
                    }
                    None => {
                        let found = self.ctx.types.display(object_ty);
                        self.error(
                            span,
                            format!("member access on non-struct type {}", found),
                        );
                        void
                    }
                };
                *ty = result;
                result
            }

            AstNode::Return {
                value,
                return_type,
                span,
            } => {
                let span = *span;
                let expected = *return_type;
                let value_ty = value.as_deref_mut().map(|v| self.check_node(v));
                if let Some(expected) = expected {
                    match value_ty {
                        Some(found) => {
                            if found != void && !self.compatible(found, expected) {
                                let want = self.ctx.types.display(expected);
                                let got = self.ctx.types.display(found);
                                self.error(
                                    span,
                                    format!("return type mismatch: expected {}, found {}", want, got),
                                );
                            }
                        }
                        None => {
                            if expected != void {
                                let want = self.ctx.types.display(expected);
                                self.error(
                                    span,
                                    format!("missing return value in function returning {}", want),
                                );
                            }
                        }
                    }
                }
                void
            }

            AstNode::VariableDecl { ty, init, span, .. } => {
                let declared = *ty;
                let span = *span;
                if let Err(err) = self.ctx.types.size_in_bits(declared) {
                    self.diag
                        .report_error_with_code(E_INCOMPLETE_TYPE, span, err.to_string());
                }
                if let Some(init) = init.as_deref_mut() {
                    let init_ty = self.check_node(init);
                    if init_ty != self.ctx.types.void() && !self.compatible(init_ty, declared) {
                        let want = self.ctx.types.display(declared);
                        let got = self.ctx.types.display(init_ty);
                        self.error(
                            span,
                            format!("cannot initialize {} with {}", want, got),
                        );
                    }
                }
                void
            }

            AstNode::GlobalDecl { ty, init, span, .. } => {
                let declared = *ty;
                let span = *span;
                if let Err(err) = self.ctx.types.size_in_bits(declared) {
                    self.diag
                        .report_error_with_code(E_INCOMPLETE_TYPE, span, err.to_string());
                }
                if let Some(init) = init.as_deref_mut() {
                    let init_ty = self.check_node(init);
                    if init_ty != self.ctx.types.void() && !self.compatible(init_ty, declared) {
                        let want = self.ctx.types.display(declared);
                        let got = self.ctx.types.display(init_ty);
                        self.error(
                            span,
                            format!("cannot initialize {} with {}", want, got),
                        );
                    }
                }
                void
            }

            AstNode::Compound { children, .. } => {
                for child in children.iter_mut() {
                    self.check_node(child);
                }
                void
            }

            AstNode::If {
                cond,
                then_branch,
                else_branch,
                span,
            } => {
                let span = *span;
                let cond_ty = self.check_node(cond);
                if cond_ty != void && !self.ctx.types.is_bool(cond_ty) {
                    let found = self.ctx.types.display(cond_ty);
                    self.error(span, format!("if condition must be bool, found {}", found));
                }
                self.check_node(then_branch);
                if let Some(else_branch) = else_branch.as_deref_mut() {
                    self.check_node(else_branch);
                }
                void
            }

            AstNode::While { cond, body, span } => {
                let span = *span;
                let cond_ty = self.check_node(cond);
                if cond_ty != void && !self.ctx.types.is_bool(cond_ty) {
                    let found = self.ctx.types.display(cond_ty);
                    self.error(
                        span,
                        format!("while condition must be bool, found {}", found),
                    );
                }
                self.check_node(body);
                void
            }

            AstNode::Function { body, .. } => {
                if let Some(body) = body.as_deref_mut() {
                    self.check_node(body);
                }
                void
            }

            AstNode::ClassDefinition { methods, .. } => {
                for method in methods.iter_mut() {
                    self.check_node(&mut method.body);
                }
                void
            }

            AstNode::ExternFunction { .. } | AstNode::Import { .. } | AstNode::StructDecl { .. } => {
                void
            }
        }
    }

    /// Warn about locals never read. `this` is exempt; a method that
    /// ignores its receiver is unremarkable.
    fn report_unused_locals(&mut self) {
        for (_, local) in self.ctx.scopes.iter_locals() {
            if !local.used && local.name != "this" {
                self.diag.report_warning(
                    W_UNUSED_VARIABLE,
                    local.span,
                    format!("unused variable '{}'", local.name),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viperc_util::Span;

    /// A forward-declared struct that never got a body.
    fn incomplete_struct(ctx: &mut Context) -> TypeId {
        ctx.types.register_struct("S", Vec::new()).unwrap()
    }

    #[test]
    fn test_local_of_incomplete_type_errors() {
        let mut ctx = Context::new();
        let mut diag = Diagnostics::new();
        let s = incomplete_struct(&mut ctx);

        let mut nodes = vec![AstNode::VariableDecl {
            ty: s,
            name: "x".to_string(),
            local: None,
            init: None,
            span: Span::DUMMY,
        }];
        TypeChecker::new(&mut ctx, &mut diag).check(&mut nodes);

        assert_eq!(diag.error_count(), 1);
        assert!(diag.render_all().contains("incomplete"));
    }

    #[test]
    fn test_global_of_incomplete_type_errors() {
        let mut ctx = Context::new();
        let mut diag = Diagnostics::new();
        let s = incomplete_struct(&mut ctx);

        let mut nodes = vec![AstNode::GlobalDecl {
            ty: s,
            name: "x".to_string(),
            init: None,
            span: Span::DUMMY,
        }];
        TypeChecker::new(&mut ctx, &mut diag).check(&mut nodes);

        assert_eq!(diag.error_count(), 1);
        assert!(diag.render_all().contains("incomplete"));
    }

    #[test]
    fn test_completed_struct_passes_both_forms() {
        let mut ctx = Context::new();
        let mut diag = Diagnostics::new();
        let i32_ty = ctx.types.get("i32").unwrap();
        let s = incomplete_struct(&mut ctx);
        ctx.types.set_struct_body(s, vec![(i32_ty, "v".to_string())]);

        let mut nodes = vec![
            AstNode::VariableDecl {
                ty: s,
                name: "x".to_string(),
                local: None,
                init: None,
                span: Span::DUMMY,
            },
            AstNode::GlobalDecl {
                ty: s,
                name: "y".to_string(),
                init: None,
                span: Span::DUMMY,
            },
        ];
        TypeChecker::new(&mut ctx, &mut diag).check(&mut nodes);

        assert!(!diag.had_errors(), "{}", diag.render_all());
    }
}
