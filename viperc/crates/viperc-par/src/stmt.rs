//! Statement parsing: return, compound blocks, if and while.

use viperc_lex::TokenKind;

use crate::ast::AstNode;
use crate::Parser;

impl<'a> Parser<'a> {
    /// `return [expr]` — body-less when the next token is `;`.
    /// Captures the return type currently in scope.
    pub(crate) fn parse_return_statement(&mut self) -> Option<AstNode> {
        let keyword = self.consume();

        if self.check(TokenKind::Semicolon) {
            return Some(AstNode::Return {
                value: None,
                return_type: self.return_type(),
                span: keyword.span,
            });
        }

        let value = self.parse_expression(0)?;
        let span = keyword.span.merge(value.span());
        Some(AstNode::Return {
            value: Some(Box::new(value)),
            return_type: self.return_type(),
            span,
        })
    }

    /// `{ stmt; stmt; ... }` — opens a child scope for the duration of
    /// the block and injects a synthetic `;` after the closing brace.
    pub(crate) fn parse_compound_statement(&mut self) -> Option<AstNode> {
        let open = self.consume(); // {

        let scope = self.ctx.scopes.new_scope(self.scope());
        let children = self.with_scope(scope, |parser| {
            let mut children = Vec::new();
            while !parser.check(TokenKind::RightBracket) && !parser.at_end() {
                // A brace body injects its own `;`, so a written one
                // right after it is a stray; skip it.
                if parser.check(TokenKind::Semicolon) {
                    parser.consume();
                    continue;
                }
                let save = parser.position;
                match parser.parse_expression(0) {
                    Some(node) => {
                        parser.expect_statement_terminator();
                        children.push(node);
                    }
                    None => {
                        parser.synchronize();
                        if parser.check(TokenKind::Semicolon) {
                            parser.consume();
                        }
                        if parser.position == save && !parser.at_end() {
                            parser.consume();
                        }
                    }
                }
            }
            children
        });

        let close_span = self.current().span;
        if self.expect(TokenKind::RightBracket) {
            self.consume();
        }
        self.inject_semicolon();

        Some(AstNode::Compound {
            children,
            scope,
            span: open.span.merge(close_span),
        })
    }

    /// `if (cond) body [; else body]` — the `else` is detected one
    /// token past the statement terminator, which the synthetic `;`
    /// after `}` makes uniform for brace and non-brace bodies.
    pub(crate) fn parse_if_statement(&mut self) -> Option<AstNode> {
        let keyword = self.consume();

        if !self.expect(TokenKind::LeftParen) {
            return None;
        }
        self.consume();
        let cond = self.parse_expression(0)?;
        if !self.expect(TokenKind::RightParen) {
            return None;
        }
        self.consume();

        let then_branch = self.parse_expression(0)?;

        let else_branch = if self.check(TokenKind::Semicolon)
            && self.peek(1).kind == TokenKind::ElseKeyword
        {
            self.consume(); // ;
            self.consume(); // else
            Some(Box::new(self.parse_expression(0)?))
        } else if self.check(TokenKind::ElseKeyword) {
            self.consume();
            Some(Box::new(self.parse_expression(0)?))
        } else {
            None
        };

        let span = keyword.span.merge(
            else_branch
                .as_deref()
                .map(|e| e.span())
                .unwrap_or(then_branch.span()),
        );
        Some(AstNode::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
            span,
        })
    }

    /// `while (cond) body`.
    pub(crate) fn parse_while_statement(&mut self) -> Option<AstNode> {
        let keyword = self.consume();

        if !self.expect(TokenKind::LeftParen) {
            return None;
        }
        self.consume();
        let cond = self.parse_expression(0)?;
        if !self.expect(TokenKind::RightParen) {
            return None;
        }
        self.consume();

        let body = self.parse_expression(0)?;
        let span = keyword.span.merge(body.span());
        Some(AstNode::While {
            cond: Box::new(cond),
            body: Box::new(body),
            span,
        })
    }
}
