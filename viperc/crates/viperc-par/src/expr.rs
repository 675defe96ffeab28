//! Expression parsing.
//!
//! Pratt-style precedence climbing. `parse_expression(min)` first
//! handles a prefix operator or a primary, then folds in binary
//! operators while their precedence stays at or above `min`. Three
//! infix tokens get special right-hand sides: `.` takes a bare member
//! name, `[` takes an index expression closed by `]`, and `(` switches
//! to call parsing with the left-hand side as callee.

use viperc_lex::TokenKind;
use viperc_util::{E_UNDECLARED, E_UNEXPECTED_TOKEN};

use crate::ast::{AstNode, BinaryOp, UnaryOp};
use crate::{binary_precedence, is_right_associative, unary_precedence, Parser};

fn unary_op_from(kind: TokenKind) -> UnaryOp {
    match kind {
        TokenKind::Bang => UnaryOp::Not,
        TokenKind::Minus => UnaryOp::Neg,
        TokenKind::Hash => UnaryOp::Deref,
        TokenKind::Asperand => UnaryOp::AddressOf,
        TokenKind::NewKeyword => UnaryOp::New,
        _ => unreachable!("not a unary operator"),
    }
}

fn binary_op_from(kind: TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::LessThan => BinaryOp::Less,
        TokenKind::GreaterThan => BinaryOp::Greater,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        TokenKind::DoubleEquals => BinaryOp::Equal,
        TokenKind::BangEquals => BinaryOp::NotEqual,
        TokenKind::DoubleAmpersand => BinaryOp::LogicalAnd,
        TokenKind::DoublePipe => BinaryOp::LogicalOr,
        TokenKind::Equals => BinaryOp::Assign,
        TokenKind::PlusEquals => BinaryOp::AddAssign,
        TokenKind::MinusEquals => BinaryOp::SubAssign,
        TokenKind::StarEquals => BinaryOp::MulAssign,
        TokenKind::SlashEquals => BinaryOp::DivAssign,
        _ => unreachable!("not a binary operator"),
    }
}

impl<'a> Parser<'a> {
    /// Parse an expression with minimum binding precedence `min_prec`.
    ///
    /// Left-associative operators parse their right-hand side at
    /// `precedence + 1`; the right-associative assignments reuse their
    /// own precedence so `a = b = c` nests rightward.
    pub(crate) fn parse_expression(&mut self, min_prec: i32) -> Option<AstNode> {
        let mut lhs;

        let unary = unary_precedence(self.current().kind);
        if unary != 0 && unary >= min_prec {
            let op_token = self.consume();
            let op = unary_op_from(op_token.kind);
            let operand = if op == UnaryOp::New {
                // `new T` names the constructed type; the operand is a
                // bare identifier resolved by the type check.
                if !(self.check(TokenKind::Identifier) || self.check(TokenKind::Type)) {
                    let span = self.current().span;
                    let found = self.describe_current();
                    self.report(
                        E_UNEXPECTED_TOKEN,
                        span,
                        format!("expected type name after 'new', found {}", found),
                    );
                    return None;
                }
                let name_token = self.consume();
                AstNode::Variable {
                    name: name_token.text.clone(),
                    local: None,
                    ty: self.ctx.types.void(),
                    span: name_token.span,
                }
            } else {
                self.parse_expression(unary)?
            };
            let ty = operand.ty().unwrap_or(self.ctx.types.void());
            let span = op_token.span.merge(operand.span());
            lhs = AstNode::Unary {
                op,
                operand: Box::new(operand),
                ty,
                span,
            };
        } else {
            lhs = self.parse_primary()?;
        }

        loop {
            let prec = binary_precedence(self.current().kind);
            if prec == 0 || prec < min_prec {
                break;
            }
            let op_token = self.consume();

            match op_token.kind {
                TokenKind::Dot => {
                    // Member name; resolved against the object's
                    // struct type by the type check.
                    if !self.expect(TokenKind::Identifier) {
                        return Some(lhs);
                    }
                    let field_token = self.consume();
                    let span = lhs.span().merge(field_token.span);
                    lhs = AstNode::Member {
                        object: Box::new(lhs),
                        field: field_token.text,
                        ty: self.ctx.types.void(),
                        span,
                    };
                }
                TokenKind::LeftSquareBracket => {
                    let index = self.parse_expression(0)?;
                    if !self.expect(TokenKind::RightSquareBracket) {
                        return Some(lhs);
                    }
                    let close = self.consume();
                    let span = lhs.span().merge(close.span);
                    lhs = AstNode::Index {
                        array: Box::new(lhs),
                        index: Box::new(index),
                        ty: self.ctx.types.void(),
                        span,
                    };
                }
                TokenKind::LeftParen => {
                    lhs = self.parse_call_expression(lhs)?;
                }
                _ => {
                    let next_min = if is_right_associative(op_token.kind) {
                        prec
                    } else {
                        prec + 1
                    };
                    let rhs = self.parse_expression(next_min)?;
                    let ty = lhs.ty().unwrap_or(self.ctx.types.void());
                    let span = lhs.span().merge(rhs.span());
                    lhs = AstNode::Binary {
                        lhs: Box::new(lhs),
                        op: binary_op_from(op_token.kind),
                        rhs: Box::new(rhs),
                        ty,
                        span,
                    };
                }
            }
        }

        Some(lhs)
    }

    /// Dispatch on the current token to parse a leaf of the grammar.
    pub(crate) fn parse_primary(&mut self) -> Option<AstNode> {
        use TokenKind::*;
        match self.current().kind {
            LetKeyword => self.parse_variable_declaration(),
            ReturnKeyword => self.parse_return_statement(),
            IntegerLiteral => self.parse_integer_literal(),
            StringLiteral => self.parse_string_literal(),
            TrueKeyword | FalseKeyword => self.parse_bool_literal(),
            Identifier => self.parse_variable(),
            LeftBracket => self.parse_compound_statement(),
            LeftParen => self.parse_parenthesized_expression(),
            IfKeyword => self.parse_if_statement(),
            WhileKeyword => self.parse_while_statement(),
            ImportKeyword => self.parse_import_statement(),
            ExternKeyword => self.parse_extern_function(),
            FuncKeyword => self.parse_func_definition(),
            GlobalKeyword => self.parse_global_declaration(),
            StructKeyword => self.parse_struct_declaration(),
            ClassKeyword => self.parse_class_definition(),
            // A type name in primary position starts a C-form function
            // or variable declaration.
            Type => self.parse_typed_declaration(),
            // Invalid characters were already reported by the
            // invalid-token sweep; skip without a second message.
            Error if !self.at_end() => {
                self.consume();
                None
            }
            _ => {
                let span = self.current().span;
                let found = self.describe_current();
                self.report(
                    E_UNEXPECTED_TOKEN,
                    span,
                    format!("expected primary expression, found {}", found),
                );
                None
            }
        }
    }

    fn parse_integer_literal(&mut self) -> Option<AstNode> {
        let token = self.consume();
        // Overflow was already reported by the lexer.
        let value = token.text.parse::<i64>().unwrap_or(0);
        Some(AstNode::IntegerLiteral {
            value,
            ty: self.ctx.types.i32_type(),
            span: token.span,
        })
    }

    fn parse_string_literal(&mut self) -> Option<AstNode> {
        let token = self.consume();
        let i8_ty = self.ctx.types.i8_type();
        let ty = self.ctx.types.create_pointer(i8_ty);
        Some(AstNode::StringLiteral {
            value: token.text.into_bytes(),
            ty,
            span: token.span,
        })
    }

    fn parse_bool_literal(&mut self) -> Option<AstNode> {
        let token = self.consume();
        Some(AstNode::BoolLiteral {
            value: token.kind == TokenKind::TrueKeyword,
            ty: self.ctx.types.bool_type(),
            span: token.span,
        })
    }

    /// An identifier reference. Locals win over functions, functions
    /// over globals; an unresolved name is an error at the
    /// identifier's span.
    fn parse_variable(&mut self) -> Option<AstNode> {
        let token = self.consume();
        let name = token.text;

        if let Some(local) = self.ctx.scopes.find_variable(self.scope(), &name) {
            // Read-vs-write is not known yet (this may turn out to be
            // an assignment target); the type check marks reads.
            let ty = self.ctx.scopes.local(local).ty;
            return Some(AstNode::Variable {
                name,
                local: Some(local),
                ty,
                span: token.span,
            });
        }
        if let Some(function) = self.ctx.functions.lookup(&name) {
            let ty = function.return_type;
            return Some(AstNode::Variable {
                name,
                local: None,
                ty,
                span: token.span,
            });
        }
        if let Some(global) = self.ctx.globals.lookup(&name) {
            let ty = global.ty;
            return Some(AstNode::Variable {
                name,
                local: None,
                ty,
                span: token.span,
            });
        }

        self.report(
            E_UNDECLARED,
            token.span,
            format!("undeclared identifier '{}'", name),
        );
        // Recover with a void-typed reference so the statement keeps
        // parsing.
        Some(AstNode::Variable {
            name,
            local: None,
            ty: self.ctx.types.void(),
            span: token.span,
        })
    }

    fn parse_parenthesized_expression(&mut self) -> Option<AstNode> {
        self.consume(); // (
        let expr = self.parse_expression(0)?;
        if self.expect(TokenKind::RightParen) {
            self.consume();
        }
        Some(expr)
    }

    /// Arguments of `callee(...)`; the opening `(` is already
    /// consumed. A trailing comma is rejected.
    pub(crate) fn parse_call_expression(&mut self, callee: AstNode) -> Option<AstNode> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RightParen) && !self.at_end() {
            args.push(self.parse_expression(0)?);
            if self.check(TokenKind::RightParen) {
                break;
            }
            if !self.expect(TokenKind::Comma) {
                return Some(callee);
            }
            self.consume();
            if self.check(TokenKind::RightParen) {
                let span = self.current().span;
                self.report(
                    E_UNEXPECTED_TOKEN,
                    span,
                    "expected expression after ',', found ')'".to_string(),
                );
                break;
            }
        }
        if !self.expect(TokenKind::RightParen) {
            return Some(callee);
        }
        let close = self.consume();

        let ty = callee.ty().unwrap_or(self.ctx.types.void());
        let span = callee.span().merge(close.span);
        Some(AstNode::Call {
            callee: Box::new(callee),
            args,
            ty,
            span,
        })
    }
}
