//! The lexer: source text to token stream.
//!
//! At each step the lexer skips whitespace and line comments, then
//! dispatches on the first character of the next lexeme:
//!
//! 1. letter or `_` — maximal identifier run, classified as keyword,
//!    registered type name, or identifier;
//! 2. digit — maximal decimal run (`i64` overflow is a lexical error);
//! 3. `"` — string body with escape decoding;
//! 4. otherwise — punctuation and operators, with one character of
//!    lookahead for the shared-prefix operators (`=`/`==`, `-`/`-=`/`->`
//!    and friends);
//! 5. anything else becomes an `Error` token, reported afterwards by
//!    [`scan_invalid_tokens`].
//!
//! Every token records its absolute byte range and the 1-based
//! line/column of its first character.

use viperc_sem::TypeRegistry;
use viperc_util::{
    Diagnostics, Span, E_INT_OVERFLOW, E_UNEXPECTED_CHAR, E_UNKNOWN_ESCAPE, E_UNTERMINATED_STRING,
};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// The Viper lexer.
///
/// Borrows the type registry read-only so identifier lexemes that name
/// a registered type come out as [`TokenKind::Type`], and the
/// diagnostics handler for string and integer errors.
///
/// # Examples
///
/// ```
/// use viperc_lex::{Lexer, TokenKind};
/// use viperc_sem::TypeRegistry;
/// use viperc_util::Diagnostics;
///
/// let types = TypeRegistry::new();
/// let mut diag = Diagnostics::new();
/// let tokens = Lexer::new("let i32 x = 42;", &types, &mut diag).lex();
///
/// let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::LetKeyword,
///         TokenKind::Type,
///         TokenKind::Identifier,
///         TokenKind::Equals,
///         TokenKind::IntegerLiteral,
///         TokenKind::Semicolon,
///     ]
/// );
/// ```
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    types: &'a TypeRegistry,
    diag: &'a mut Diagnostics,
    token_start: usize,
    token_line: u32,
    token_column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, types: &'a TypeRegistry, diag: &'a mut Diagnostics) -> Self {
        Self {
            cursor: Cursor::new(source),
            types,
            diag,
            token_start: 0,
            token_line: 1,
            token_column: 1,
        }
    }

    /// Lex the whole input.
    pub fn lex(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();

        self.token_start = self.cursor.position();
        self.token_line = self.cursor.line();
        self.token_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return None;
        }

        let token = match self.cursor.current_char() {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '{' => self.single(TokenKind::LeftBracket),
            '}' => self.single(TokenKind::RightBracket),
            '[' => self.single(TokenKind::LeftSquareBracket),
            ']' => self.single(TokenKind::RightSquareBracket),
            ';' => self.single(TokenKind::Semicolon),
            ':' => self.single(TokenKind::Colon),
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Dot),
            '@' => self.single(TokenKind::Asperand),
            '#' => self.single(TokenKind::Hash),
            '^' => self.single(TokenKind::Caret),
            '~' => self.single(TokenKind::Tilde),

            '=' => self.one_or_two('=', TokenKind::DoubleEquals, TokenKind::Equals),
            '+' => self.one_or_two('=', TokenKind::PlusEquals, TokenKind::Plus),
            '*' => self.one_or_two('=', TokenKind::StarEquals, TokenKind::Star),
            '/' => self.one_or_two('=', TokenKind::SlashEquals, TokenKind::Slash),
            '!' => self.one_or_two('=', TokenKind::BangEquals, TokenKind::Bang),
            '<' => self.one_or_two('=', TokenKind::LessEqual, TokenKind::LessThan),
            '>' => self.one_or_two('=', TokenKind::GreaterEqual, TokenKind::GreaterThan),
            '&' => self.one_or_two('&', TokenKind::DoubleAmpersand, TokenKind::Ampersand),
            '|' => self.one_or_two('|', TokenKind::DoublePipe, TokenKind::Pipe),

            '-' => {
                self.cursor.advance();
                if self.cursor.match_char('>') {
                    Token::bare(TokenKind::RightArrow, self.span())
                } else if self.cursor.match_char('=') {
                    Token::bare(TokenKind::MinusEquals, self.span())
                } else {
                    Token::bare(TokenKind::Minus, self.span())
                }
            }

            '"' => self.lex_string(),

            c if is_ident_start(c) => self.lex_identifier(),
            c if c.is_ascii_digit() => self.lex_number(),

            c => {
                self.cursor.advance();
                Token::new(TokenKind::Error, c.to_string(), self.span())
            }
        };

        Some(token)
    }

    /// Span of the token currently being built.
    fn span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_line,
            self.token_column,
        )
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.cursor.advance();
        Token::bare(kind, self.span())
    }

    fn one_or_two(&mut self, second: char, two: TokenKind, one: TokenKind) -> Token {
        self.cursor.advance();
        if self.cursor.match_char(second) {
            Token::bare(two, self.span())
        } else {
            Token::bare(one, self.span())
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let c = self.cursor.current_char();
            if c.is_whitespace() && !self.cursor.is_at_end() {
                self.cursor.advance();
            } else if c == '/' && self.cursor.peek_char(1) == '/' {
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Identifier, keyword or registered type name.
    fn lex_identifier(&mut self) -> Token {
        while is_ident_continue(self.cursor.current_char()) && !self.cursor.is_at_end() {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(self.token_start);

        if let Some(keyword) = keyword_from_ident(text) {
            return Token::bare(keyword, self.span());
        }
        if self.types.exists(text) {
            return Token::new(TokenKind::Type, text, self.span());
        }
        Token::new(TokenKind::Identifier, text, self.span())
    }

    /// Decimal integer literal. Values that do not fit an `i64` are a
    /// lexical error; the token still carries the text.
    fn lex_number(&mut self) -> Token {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(self.token_start).to_string();
        if text.parse::<i64>().is_err() {
            self.diag.report_error_with_code(
                E_INT_OVERFLOW,
                self.span(),
                format!("integer literal '{}' is too large", text),
            );
        }
        Token::new(TokenKind::IntegerLiteral, text, self.span())
    }

    /// String literal with escape decoding. The token text is the
    /// decoded value.
    fn lex_string(&mut self) -> Token {
        self.cursor.advance(); // opening quote
        let mut value = String::new();

        loop {
            let c = self.cursor.current_char();
            if c == '"' {
                self.cursor.advance();
                return Token::new(TokenKind::StringLiteral, value, self.span());
            }
            if self.cursor.is_at_end() || c == '\n' {
                // Span runs to end of line.
                self.diag.report_error_with_code(
                    E_UNTERMINATED_STRING,
                    self.span(),
                    "unterminated string literal",
                );
                return Token::new(TokenKind::StringLiteral, value, self.span());
            }
            if c == '\\' {
                let escape_start = self.cursor.position();
                let escape_line = self.cursor.line();
                let escape_column = self.cursor.column();
                self.cursor.advance();
                let escaped = self.cursor.current_char();
                match escaped {
                    'n' => value.push('\n'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    '0' => value.push('\0'),
                    other => {
                        if !self.cursor.is_at_end() {
                            let span = Span::new(
                                escape_start,
                                self.cursor.position() + other.len_utf8(),
                                escape_line,
                                escape_column,
                            );
                            self.diag.report_error_with_code(
                                E_UNKNOWN_ESCAPE,
                                span,
                                format!("unknown escape sequence '\\{}'", other),
                            );
                        }
                    }
                }
                if !self.cursor.is_at_end() {
                    self.cursor.advance();
                }
                continue;
            }
            value.push(c);
            self.cursor.advance();
        }
    }
}

/// Post-pass over a token stream reporting every `Error` token.
pub fn scan_invalid_tokens(tokens: &[Token], diag: &mut Diagnostics) {
    for token in tokens {
        if token.kind == TokenKind::Error {
            diag.report_error_with_code(
                E_UNEXPECTED_CHAR,
                token.span,
                format!("unexpected character '{}'", token.text),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lex(source: &str) -> (Vec<Token>, Diagnostics) {
        let types = TypeRegistry::new();
        let mut diag = Diagnostics::new();
        diag.set_file_name("test.vpr");
        diag.set_text(source);
        let tokens = Lexer::new(source, &types, &mut diag).lex();
        (tokens, diag)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.into_iter().map(|t| t.kind).collect()
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn test_empty_input() {
        let (tokens, diag) = lex("");
        assert!(tokens.is_empty());
        assert!(!diag.had_errors());
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("func return let global if else while true false struct class extern import new"),
            vec![
                TokenKind::FuncKeyword,
                TokenKind::ReturnKeyword,
                TokenKind::LetKeyword,
                TokenKind::GlobalKeyword,
                TokenKind::IfKeyword,
                TokenKind::ElseKeyword,
                TokenKind::WhileKeyword,
                TokenKind::TrueKeyword,
                TokenKind::FalseKeyword,
                TokenKind::StructKeyword,
                TokenKind::ClassKeyword,
                TokenKind::ExternKeyword,
                TokenKind::ImportKeyword,
                TokenKind::NewKeyword,
            ]
        );
    }

    #[test]
    fn test_type_names_from_registry() {
        assert_eq!(
            kinds("i8 i16 i32 i64 bool void"),
            vec![TokenKind::Type; 6]
        );
    }

    #[test]
    fn test_identifiers() {
        let (tokens, _) = lex("foo _bar baz42 letters");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Identifier));
        assert_eq!(tokens[0].text, "foo");
        assert_eq!(tokens[1].text, "_bar");
        assert_eq!(tokens[2].text, "baz42");
        // Prefix of a keyword is an identifier.
        assert_eq!(tokens[3].text, "letters");
    }

    // =========================================================================
    // Operators and punctuation
    // =========================================================================

    #[test]
    fn test_single_char_tokens() {
        assert_eq!(
            kinds("( ) { } [ ] ; : , . @ # ^ ~"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::LeftSquareBracket,
                TokenKind::RightSquareBracket,
                TokenKind::Semicolon,
                TokenKind::Colon,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Asperand,
                TokenKind::Hash,
                TokenKind::Caret,
                TokenKind::Tilde,
            ]
        );
    }

    #[test]
    fn test_operator_disambiguation() {
        assert_eq!(
            kinds("= == + += - -= -> * *= / /= ! != < <= > >= & && | ||"),
            vec![
                TokenKind::Equals,
                TokenKind::DoubleEquals,
                TokenKind::Plus,
                TokenKind::PlusEquals,
                TokenKind::Minus,
                TokenKind::MinusEquals,
                TokenKind::RightArrow,
                TokenKind::Star,
                TokenKind::StarEquals,
                TokenKind::Slash,
                TokenKind::SlashEquals,
                TokenKind::Bang,
                TokenKind::BangEquals,
                TokenKind::LessThan,
                TokenKind::LessEqual,
                TokenKind::GreaterThan,
                TokenKind::GreaterEqual,
                TokenKind::Ampersand,
                TokenKind::DoubleAmpersand,
                TokenKind::Pipe,
                TokenKind::DoublePipe,
            ]
        );
    }

    #[test]
    fn test_adjacent_operators() {
        // "==" then "=" with no separator.
        assert_eq!(
            kinds("==="),
            vec![TokenKind::DoubleEquals, TokenKind::Equals]
        );
    }

    // =========================================================================
    // Literals
    // =========================================================================

    #[test]
    fn test_integer_literal() {
        let (tokens, diag) = lex("0 42 123456789");
        assert!(!diag.had_errors());
        assert!(tokens.iter().all(|t| t.kind == TokenKind::IntegerLiteral));
        assert_eq!(tokens[1].text, "42");
    }

    #[test]
    fn test_integer_overflow_is_lexical_error() {
        let (tokens, diag) = lex("99999999999999999999");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::IntegerLiteral);
        assert_eq!(diag.error_count(), 1);
    }

    #[test]
    fn test_string_literal() {
        let (tokens, diag) = lex("\"hello world\"");
        assert!(!diag.had_errors());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "hello world");
    }

    #[test]
    fn test_string_escapes() {
        let (tokens, diag) = lex(r#""a\n\'\"\\\0b""#);
        assert!(!diag.had_errors());
        assert_eq!(tokens[0].text, "a\n'\"\\\0b");
    }

    #[test]
    fn test_unknown_escape_reported() {
        let (tokens, diag) = lex(r#""a\qb""#);
        assert_eq!(diag.error_count(), 1);
        // Lexing continues past the bad escape.
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, "ab");
    }

    #[test]
    fn test_unterminated_string_at_eof() {
        let (tokens, diag) = lex("\"abc");
        assert_eq!(diag.error_count(), 1);
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_unterminated_string_spans_to_end_of_line() {
        let (tokens, diag) = lex("\"abc\nlet");
        assert_eq!(diag.error_count(), 1);
        assert_eq!(tokens[0].span.end, 4);
        // The next line still lexes.
        assert_eq!(tokens[1].kind, TokenKind::LetKeyword);
    }

    // =========================================================================
    // Comments and whitespace
    // =========================================================================

    #[test]
    fn test_line_comments_skipped() {
        assert_eq!(
            kinds("let // the rest is ignored\nx"),
            vec![TokenKind::LetKeyword, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_comment_at_eof() {
        assert_eq!(kinds("// nothing else"), Vec::<TokenKind>::new());
    }

    #[test]
    fn test_slash_equals_not_a_comment() {
        assert_eq!(kinds("a /= b"), vec![
            TokenKind::Identifier,
            TokenKind::SlashEquals,
            TokenKind::Identifier,
        ]);
    }

    // =========================================================================
    // Spans and positions
    // =========================================================================

    #[test]
    fn test_spans_and_positions() {
        let (tokens, _) = lex("let x;\n  y");
        assert_eq!(tokens[0].span.start, 0);
        assert_eq!(tokens[0].span.end, 3);
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 5));
        assert_eq!((tokens[3].span.line, tokens[3].span.column), (2, 3));
    }

    #[test]
    fn test_spans_strictly_increasing() {
        let (tokens, _) = lex("let i32 x = 1 + 2; // end\nwhile (x < 3) x += 1;");
        for pair in tokens.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
            assert!(pair[0].span.start < pair[1].span.start);
        }
    }

    // =========================================================================
    // Error tokens
    // =========================================================================

    #[test]
    fn test_unknown_character_becomes_error_token() {
        let (tokens, mut diag) = lex("let $ x");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].text, "$");
        // The post-pass, not the lexer, reports it.
        assert!(!diag.had_errors());
        scan_invalid_tokens(&tokens, &mut diag);
        assert_eq!(diag.error_count(), 1);
    }

    #[test]
    fn test_scan_invalid_tokens_reports_each() {
        let (tokens, mut diag) = lex("` $");
        scan_invalid_tokens(&tokens, &mut diag);
        assert_eq!(diag.error_count(), 2);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    proptest! {
        /// Every non-whitespace byte of a comment-free source lies in
        /// exactly one token's span, and spans never overlap.
        #[test]
        fn prop_tokens_cover_non_whitespace(
            words in proptest::collection::vec("[a-z_][a-z0-9_]{0,6}|[0-9]{1,8}|==|!=|<=|\\+=|->|[-+*/<>=!;,.(){}\\[\\]]", 0..24)
        ) {
            let source = words.join(" ");
            let types = TypeRegistry::new();
            let mut diag = Diagnostics::new();
            let tokens = Lexer::new(&source, &types, &mut diag).lex();

            // Strictly increasing, non-overlapping.
            for pair in tokens.windows(2) {
                prop_assert!(pair[0].span.end <= pair[1].span.start);
            }

            // Coverage of every non-whitespace byte.
            let mut covered = vec![false; source.len()];
            for token in &tokens {
                for slot in &mut covered[token.span.start..token.span.end] {
                    prop_assert!(!*slot);
                    *slot = true;
                }
            }
            for (i, byte) in source.bytes().enumerate() {
                if !byte.is_ascii_whitespace() {
                    prop_assert!(covered[i], "byte {} ({:?}) uncovered", i, byte as char);
                }
            }
        }
    }
}
