//! Type grammar: a base type name followed by `*` and `[N]` suffixes.
//!
//! Suffixes nest left-to-right textually, so `i8*[4]` is an array of
//! four pointers to `i8`.

use viperc_lex::TokenKind;
use viperc_util::{E_EXPECTED_TOKEN, E_UNKNOWN_TYPE};

use crate::Parser;
use viperc_sem::TypeId;

impl<'a> Parser<'a> {
    /// Parse a type. The base is either a `Type` token (a name the
    /// lexer found in the registry) or an identifier naming a type
    /// registered since lexing, which is how struct and class names
    /// declared in the same file are spelled.
    pub(crate) fn parse_type(&mut self) -> Option<TypeId> {
        let token = self.current().clone();
        let base = match token.kind {
            TokenKind::Type => {
                self.consume();
                self.ctx.types.get(&token.text)
            }
            TokenKind::Identifier if self.ctx.types.exists(&token.text) => {
                self.consume();
                self.ctx.types.get(&token.text)
            }
            TokenKind::Identifier => {
                self.report(
                    E_UNKNOWN_TYPE,
                    token.span,
                    format!("unknown type name '{}'", token.text),
                );
                self.synchronize();
                None
            }
            _ => {
                let found = self.describe_current();
                self.report(
                    E_EXPECTED_TOKEN,
                    token.span,
                    format!("expected type name, found {}", found),
                );
                self.synchronize();
                None
            }
        }?;

        let mut ty = base;
        loop {
            if self.check(TokenKind::Star) {
                self.consume();
                ty = self.ctx.types.create_pointer(ty);
            } else if self.check(TokenKind::LeftSquareBracket) {
                self.consume();
                if !self.expect(TokenKind::IntegerLiteral) {
                    return None;
                }
                let length_token = self.consume();
                let length = match length_token.text.parse::<u32>() {
                    Ok(length) => length,
                    Err(_) => {
                        self.report(
                            E_EXPECTED_TOKEN,
                            length_token.span,
                            format!("array length '{}' is too large", length_token.text),
                        );
                        0
                    }
                };
                if !self.expect(TokenKind::RightSquareBracket) {
                    return None;
                }
                self.consume();
                ty = self.ctx.types.create_array(length, ty);
            } else {
                break;
            }
        }
        Some(ty)
    }
}
