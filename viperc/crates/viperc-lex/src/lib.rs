//! viperc-lex - Lexical analysis for Viper.
//!
//! Turns source text into the finite token sequence the parser
//! consumes. The lexer is a single forward pass with one character of
//! lookahead; the only context it carries is a read-only view of the
//! type registry, used to classify identifier lexemes that name a
//! registered type as [`TokenKind::Type`].
//!
//! Unknown characters become [`TokenKind::Error`] tokens and are
//! reported in one sweep by [`scan_invalid_tokens`] so a stray byte
//! cannot abort tokenization.

mod cursor;
mod lexer;
mod token;

pub use cursor::Cursor;
pub use lexer::{scan_invalid_tokens, Lexer};
pub use token::{keyword_from_ident, Token, TokenKind};
