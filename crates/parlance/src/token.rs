//! Quoting-aware tokenizer.
//!
//! Splits a raw command line into [`Token`]s. The rules are deliberately small:
//!
//! - Unquoted whitespace separates tokens.
//! - A token whose first character is `"` is [`TokenKind::Quoted`]: everything up
//!   to the next `"` (or end of input) is taken literally, whitespace included.
//!   The closing quote always ends the token, so `"a b"c` yields two tokens.
//! - Any other token is [`TokenKind::Plain`] and runs to the next whitespace.
//!   Quotes inside a plain token are ordinary characters.
//! - Backslash has no special meaning.
//!
//! Tokenizing never fails. Unbalanced quotes simply run to the end of the line.
//!
//! ```
//! use parlance::{tokenize, Token};
//!
//! let tokens = tokenize(r#"say "hello world" now"#);
//! assert_eq!(
//!     tokens,
//!     vec![Token::plain("say"), Token::quoted("hello world"), Token::plain("now")]
//! );
//! ```

use std::fmt;

/// How a token was written in the source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A bare run of non-whitespace characters.
    Plain,
    /// A double-quoted segment; quotes are not part of the text.
    Quoted,
}

/// One lexical unit of a command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    /// Creates a token of the given kind.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Creates a [`TokenKind::Plain`] token.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Plain, text)
    }

    /// Creates a [`TokenKind::Quoted`] token.
    pub fn quoted(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Quoted, text)
    }

    /// Whether the token was written bare or in quotes.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The token text, without surrounding quotes.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shorthand for `kind() == TokenKind::Quoted`.
    pub fn is_quoted(&self) -> bool {
        self.kind == TokenKind::Quoted
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Plain => f.write_str(&self.text),
            TokenKind::Quoted => write!(f, "\"{}\"", self.text),
        }
    }
}

/// Splits `line` into tokens.
pub fn tokenize(line: &str) -> Vec<Token> {
    scan(line).tokens
}

/// Tokens plus whether the line ended inside an unclosed quote.
pub(crate) struct Scan {
    pub(crate) tokens: Vec<Token>,
    pub(crate) open_quote: bool,
}

pub(crate) fn scan(line: &str) -> Scan {
    let mut tokens = Vec::new();
    let mut open_quote = false;
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        match chars.peek() {
            None => break,
            Some('"') => {
                chars.next();
                let mut text = String::new();
                open_quote = true;
                for c in chars.by_ref() {
                    if c == '"' {
                        open_quote = false;
                        break;
                    }
                    text.push(c);
                }
                tokens.push(Token::quoted(text));
            }
            Some(_) => {
                let mut text = String::new();
                while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                    text.push(c);
                }
                tokens.push(Token::plain(text));
            }
        }
    }

    tracing::trace!(count = tokens.len(), open_quote, "tokenized command line");
    Scan { tokens, open_quote }
}

/// Joins token texts with single spaces.
pub fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::text)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(
            tokenize("a b c"),
            vec![Token::plain("a"), Token::plain("b"), Token::plain("c")]
        );
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(tokenize("  a \t\tb  "), vec![Token::plain("a"), Token::plain("b")]);
    }

    #[test]
    fn empty_line_has_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn quotes_mid_token_are_literal() {
        // raw: \"\a b" \"c
        let tokens = tokenize("\\\"\\a b\" \\\"c");
        assert_eq!(
            tokens,
            vec![
                Token::plain("\\\"\\a"),
                Token::plain("b\""),
                Token::plain("\\\"c"),
            ]
        );
    }

    #[test]
    fn closing_quote_starts_new_token() {
        assert_eq!(tokenize("\"a b \"c"), vec![Token::quoted("a b "), Token::plain("c")]);
    }

    #[test]
    fn adjacent_quoted_segments_stay_separate() {
        assert_eq!(tokenize("\"a\"\"b\""), vec![Token::quoted("a"), Token::quoted("b")]);
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        assert_eq!(
            tokenize("say \"hello there"),
            vec![Token::plain("say"), Token::quoted("hello there")]
        );
    }

    #[test]
    fn scan_reports_unclosed_quote() {
        let open = scan("say \"hello ");
        assert!(open.open_quote);
        assert_eq!(open.tokens, vec![Token::plain("say"), Token::quoted("hello ")]);

        assert!(!scan("say \"hello\" ").open_quote);
        assert!(!scan("say hello").open_quote);
        assert!(scan("\"").open_quote);
    }

    #[test]
    fn empty_quotes_yield_empty_token() {
        assert_eq!(
            tokenize("x \"\" y"),
            vec![Token::plain("x"), Token::quoted(""), Token::plain("y")]
        );
    }

    #[test]
    fn display_restores_quotes() {
        assert_eq!(Token::quoted("a b").to_string(), "\"a b\"");
        assert_eq!(Token::plain("a").to_string(), "a");
    }

    #[test]
    fn join_uses_single_spaces() {
        let tokens = tokenize("one   two \"three four\"");
        assert_eq!(join_tokens(&tokens), "one two three four");
    }
}
