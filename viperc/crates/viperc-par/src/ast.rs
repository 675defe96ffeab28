//! AST node definitions.
//!
//! One tagged enum covers expressions, statements and top-level
//! declarations; Viper's grammar is expression-oriented, so the parser
//! produces statements from the same entry point as expressions and a
//! separate node hierarchy would only add boxing layers.
//!
//! Every expression variant carries its resolved [`TypeId`], attached
//! by the parser at construction and refined by the type-check pass
//! for operators and member accesses. Nodes that introduce a scope
//! (functions, methods, compound statements) carry the [`ScopeId`] of
//! the scope they opened; the scope records themselves live in the
//! [`Context`](viperc_sem::Context) arena.

use viperc_sem::{LocalId, ScopeId, TypeId};
use viperc_util::Span;

/// Unary operators, all binding at the same precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!` logical not.
    Not,
    /// `-` arithmetic negation.
    Neg,
    /// `#` pointer dereference.
    Deref,
    /// `@` address-of.
    AddressOf,
    /// `new T` heap allocation of a named type.
    New,
}

/// Binary operators. Indexing, calls and member access have dedicated
/// node variants and do not appear here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Add,
    Sub,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl BinaryOp {
    /// True for `=` and the compound assignments.
    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
        )
    }

    /// True for the ordering and equality operators.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::Greater
                | BinaryOp::LessEqual
                | BinaryOp::GreaterEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        )
    }

    /// True for `&&` and `||`.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }
}

/// A typed function or method parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub ty: TypeId,
    pub name: String,
}

/// A field descriptor inside a class definition.
#[derive(Clone, Debug)]
pub struct ClassField {
    pub ty: TypeId,
    pub name: String,
}

/// A method or constructor inside a class definition.
///
/// Constructors have no return type and see `this` by value; methods
/// see `this` as a pointer.
#[derive(Debug)]
pub struct ClassMethod {
    pub name: String,
    pub return_type: Option<TypeId>,
    pub params: Vec<Param>,
    pub scope: ScopeId,
    pub body: Box<AstNode>,
    pub span: Span,
}

/// A node of the abstract syntax tree.
#[derive(Debug)]
pub enum AstNode {
    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------
    IntegerLiteral {
        value: i64,
        ty: TypeId,
        span: Span,
    },
    StringLiteral {
        value: Vec<u8>,
        ty: TypeId,
        span: Span,
    },
    NullptrLiteral {
        ty: TypeId,
        span: Span,
    },
    BoolLiteral {
        value: bool,
        ty: TypeId,
        span: Span,
    },
    /// A name reference. `local` is the resolved symbol when the name
    /// bound a local; function and global references resolve through
    /// the flat tables instead.
    Variable {
        name: String,
        local: Option<LocalId>,
        ty: TypeId,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<AstNode>,
        ty: TypeId,
        span: Span,
    },
    Binary {
        lhs: Box<AstNode>,
        op: BinaryOp,
        rhs: Box<AstNode>,
        ty: TypeId,
        span: Span,
    },
    Call {
        callee: Box<AstNode>,
        args: Vec<AstNode>,
        ty: TypeId,
        span: Span,
    },
    Index {
        array: Box<AstNode>,
        index: Box<AstNode>,
        ty: TypeId,
        span: Span,
    },
    /// `object.field`; the type is resolved by the type-check pass
    /// from the object's struct type.
    Member {
        object: Box<AstNode>,
        field: String,
        ty: TypeId,
        span: Span,
    },

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------
    /// `return [expr]`. Captures the return type in scope at parse
    /// time so the type check can validate without recomputing it.
    Return {
        value: Option<Box<AstNode>>,
        return_type: Option<TypeId>,
        span: Span,
    },
    VariableDecl {
        ty: TypeId,
        name: String,
        local: Option<LocalId>,
        init: Option<Box<AstNode>>,
        span: Span,
    },
    Compound {
        children: Vec<AstNode>,
        scope: ScopeId,
        span: Span,
    },
    If {
        cond: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Option<Box<AstNode>>,
        span: Span,
    },
    While {
        cond: Box<AstNode>,
        body: Box<AstNode>,
        span: Span,
    },

    // ------------------------------------------------------------------
    // Top-level declarations
    // ------------------------------------------------------------------
    /// A function definition or forward declaration. The scope holds
    /// the parameters; `body` is `None` for forward declarations.
    Function {
        return_type: TypeId,
        name: String,
        params: Vec<Param>,
        body: Option<Box<AstNode>>,
        scope: ScopeId,
        span: Span,
    },
    ExternFunction {
        return_type: TypeId,
        name: String,
        params: Vec<Param>,
        span: Span,
    },
    Import {
        return_type: TypeId,
        name: String,
        params: Vec<Param>,
        span: Span,
    },
    /// A struct declaration; the fields live in the type registry.
    StructDecl {
        ty: TypeId,
        span: Span,
    },
    ClassDefinition {
        name: String,
        ty: TypeId,
        fields: Vec<ClassField>,
        methods: Vec<ClassMethod>,
        span: Span,
    },
    /// `global T name [= init];` — registered in the global table.
    GlobalDecl {
        ty: TypeId,
        name: String,
        init: Option<Box<AstNode>>,
        span: Span,
    },
}

impl AstNode {
    /// Source span of this node.
    pub fn span(&self) -> Span {
        use AstNode::*;
        match self {
            IntegerLiteral { span, .. }
            | StringLiteral { span, .. }
            | NullptrLiteral { span, .. }
            | BoolLiteral { span, .. }
            | Variable { span, .. }
            | Unary { span, .. }
            | Binary { span, .. }
            | Call { span, .. }
            | Index { span, .. }
            | Member { span, .. }
            | Return { span, .. }
            | VariableDecl { span, .. }
            | Compound { span, .. }
            | If { span, .. }
            | While { span, .. }
            | Function { span, .. }
            | ExternFunction { span, .. }
            | Import { span, .. }
            | StructDecl { span, .. }
            | ClassDefinition { span, .. }
            | GlobalDecl { span, .. } => *span,
        }
    }

    /// Resolved type, for expression nodes.
    pub fn ty(&self) -> Option<TypeId> {
        use AstNode::*;
        match self {
            IntegerLiteral { ty, .. }
            | StringLiteral { ty, .. }
            | NullptrLiteral { ty, .. }
            | BoolLiteral { ty, .. }
            | Variable { ty, .. }
            | Unary { ty, .. }
            | Binary { ty, .. }
            | Call { ty, .. }
            | Index { ty, .. }
            | Member { ty, .. } => Some(*ty),
            _ => None,
        }
    }

    /// Overwrite the resolved type of an expression node; no effect on
    /// statements and declarations.
    pub fn set_ty(&mut self, new_ty: TypeId) {
        use AstNode::*;
        match self {
            IntegerLiteral { ty, .. }
            | StringLiteral { ty, .. }
            | NullptrLiteral { ty, .. }
            | BoolLiteral { ty, .. }
            | Variable { ty, .. }
            | Unary { ty, .. }
            | Binary { ty, .. }
            | Call { ty, .. }
            | Index { ty, .. }
            | Member { ty, .. } => *ty = new_ty,
            _ => {}
        }
    }

    /// True for expression variants that may be assigned to.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            AstNode::Variable { .. }
                | AstNode::Member { .. }
                | AstNode::Index { .. }
                | AstNode::Unary {
                    op: UnaryOp::Deref,
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viperc_sem::Context;

    #[test]
    fn test_expression_nodes_carry_types() {
        let ctx = Context::new();
        let i32_ty = ctx.types.get("i32").unwrap();
        let mut node = AstNode::IntegerLiteral {
            value: 7,
            ty: i32_ty,
            span: Span::DUMMY,
        };
        assert_eq!(node.ty(), Some(i32_ty));

        let bool_ty = ctx.types.get("bool").unwrap();
        node.set_ty(bool_ty);
        assert_eq!(node.ty(), Some(bool_ty));
    }

    #[test]
    fn test_statement_nodes_have_no_type() {
        let ctx = Context::new();
        let i32_ty = ctx.types.get("i32").unwrap();
        let node = AstNode::VariableDecl {
            ty: i32_ty,
            name: "x".to_string(),
            local: None,
            init: None,
            span: Span::DUMMY,
        };
        assert_eq!(node.ty(), None);
    }

    #[test]
    fn test_assignability() {
        let ctx = Context::new();
        let i32_ty = ctx.types.get("i32").unwrap();
        let var = AstNode::Variable {
            name: "x".to_string(),
            local: None,
            ty: i32_ty,
            span: Span::DUMMY,
        };
        assert!(var.is_assignable());

        let lit = AstNode::IntegerLiteral {
            value: 1,
            ty: i32_ty,
            span: Span::DUMMY,
        };
        assert!(!lit.is_assignable());

        let deref = AstNode::Unary {
            op: UnaryOp::Deref,
            operand: Box::new(var),
            ty: i32_ty,
            span: Span::DUMMY,
        };
        assert!(deref.is_assignable());
    }

    #[test]
    fn test_nullptr_literal_defaults_to_i8_pointer() {
        // Back-ends lower default-initialized pointers through this
        // node; an untyped null is a pointer to i8.
        let mut ctx = Context::new();
        let i8_ty = ctx.types.get("i8").unwrap();
        let ptr = ctx.types.create_pointer(i8_ty);
        let node = AstNode::NullptrLiteral {
            ty: ptr,
            span: Span::DUMMY,
        };
        assert_eq!(node.ty(), Some(ptr));
        assert_eq!(ctx.types.pointee(node.ty().unwrap()), Some(i8_ty));
    }

    #[test]
    fn test_binary_op_classification() {
        assert!(BinaryOp::Assign.is_assignment());
        assert!(BinaryOp::AddAssign.is_assignment());
        assert!(!BinaryOp::Add.is_assignment());
        assert!(BinaryOp::Less.is_comparison());
        assert!(BinaryOp::NotEqual.is_comparison());
        assert!(!BinaryOp::LogicalAnd.is_comparison());
        assert!(BinaryOp::LogicalOr.is_logical());
    }
}
