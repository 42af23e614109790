use std::fmt;
use thiserror::Error as ThisError;

///
/// TokenKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// Run of identifier characters.
    Word,
    /// Verbatim string; carries the quote character that opened it.
    Quoted(char),
    /// Run of `= < > ~ !`.
    Operator,
    LParen,
    RParen,
    Comma,
}

///
/// Token
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Character offset of the token's first character.
    pub position: usize,
}

impl Token {
    /// Whether this is a bare word matching `keyword` (case-insensitive).
    /// Quoted literals are never keywords.
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::Quoted(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Quoted(quote) => write!(f, "{quote}{}{quote}", self.text),
            _ => f.write_str(&self.text),
        }
    }
}

///
/// LexErrorKind
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum LexErrorKind {
    #[error("unterminated string opened with {quote}")]
    UnterminatedString { quote: char },

    #[error("unterminated block comment")]
    UnterminatedComment,

    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char },
}

///
/// LexError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("error tokenizing query «{query}» around position {position}: {kind}")]
pub struct LexError {
    pub query: String,
    pub position: usize,
    pub kind: LexErrorKind,
}

/// Characters allowed inside a bare word.
#[must_use]
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | ':' | '.' | '[' | ']' | '-')
}

/// Characters that make up operator tokens.
#[must_use]
pub const fn is_operator_char(ch: char) -> bool {
    matches!(ch, '=' | '<' | '>' | '~' | '!')
}

const fn is_quote(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '`')
}

/// Split query text into tokens, discarding whitespace and comments.
pub fn tokenize(query: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(query).run()
}

///
/// Lexer
///

struct Lexer<'a> {
    query: &'a str,
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(query: &'a str) -> Self {
        Self {
            query,
            chars: query.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.peek(0) {
            let start = self.pos;

            if ch.is_whitespace() {
                self.pos += 1;
            } else if self.starts_comment() {
                self.skip_comment()?;
            } else if ch == '(' {
                self.single(TokenKind::LParen, ch);
            } else if ch == ')' {
                self.single(TokenKind::RParen, ch);
            } else if ch == ',' {
                self.single(TokenKind::Comma, ch);
            } else if is_quote(ch) {
                self.quoted(ch)?;
            } else if is_word_char(ch) {
                let text = self.take_while(is_word_char);
                self.push(TokenKind::Word, text, start);
            } else if is_operator_char(ch) {
                let text = self.take_while(is_operator_char);
                self.push(TokenKind::Operator, text, start);
            } else {
                return Err(self.error(start, LexErrorKind::UnexpectedChar { ch }));
            }
        }

        Ok(self.tokens)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    // `--` only opens a comment at a token boundary; inside a word it is text.
    fn starts_comment(&self) -> bool {
        matches!(
            (self.peek(0), self.peek(1)),
            (Some('-'), Some('-')) | (Some('/'), Some('/' | '*'))
        )
    }

    fn skip_comment(&mut self) -> Result<(), LexError> {
        let start = self.pos;

        if self.peek(1) == Some('*') {
            self.pos += 2;
            loop {
                match (self.peek(0), self.peek(1)) {
                    (Some('*'), Some('/')) => {
                        self.pos += 2;
                        return Ok(());
                    }
                    (Some(_), _) => self.pos += 1,
                    (None, _) => {
                        return Err(self.error(start, LexErrorKind::UnterminatedComment));
                    }
                }
            }
        }

        // line comment: an unterminated one simply ends the input
        while let Some(ch) = self.peek(0) {
            self.pos += 1;
            if ch == '\n' {
                break;
            }
        }

        Ok(())
    }

    fn single(&mut self, kind: TokenKind, ch: char) {
        let start = self.pos;
        self.pos += 1;
        self.push(kind, ch.to_string(), start);
    }

    fn quoted(&mut self, quote: char) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;

        let body_start = self.pos;
        while let Some(ch) = self.peek(0) {
            if ch == quote {
                let text: String = self.chars[body_start..self.pos].iter().collect();
                self.pos += 1;
                self.push(TokenKind::Quoted(quote), text, start);
                return Ok(());
            }
            self.pos += 1;
        }

        Err(self.error(start, LexErrorKind::UnterminatedString { quote }))
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek(0).is_some_and(&accept) {
            self.pos += 1;
        }

        self.chars[start..self.pos].iter().collect()
    }

    fn push(&mut self, kind: TokenKind, text: String, position: usize) {
        self.tokens.push(Token {
            kind,
            text,
            position,
        });
    }

    fn error(&self, position: usize, kind: LexErrorKind) -> LexError {
        LexError {
            query: self.query.to_string(),
            position,
            kind,
        }
    }
}
