use thiserror::Error;

use crate::source::Span;
use crate::types::Keyword;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Number(f64),
    Symbol(String),
    Keyword(Keyword),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LexerErrorKind {
    #[error("invalid value")]
    InvalidValue,
    #[error("number does not fit in a double")]
    NumberTooBig,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct LexerError {
    pub kind: LexerErrorKind,
    pub span: Span,
}

pub type LexerResult<T> = Result<T, LexerError>;

/// Character-level scanner with explicit lookahead.
///
/// Reserved words are matched as literal prefixes at a first-letter
/// dispatch: a complete literal wins even when more symbol characters
/// follow (`definea` lexes as `define` + `a`), while a partial match falls
/// back to a plain symbol (`defi`, `lambd`, `ca` are symbols).
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Lexer<'a> {
        Lexer { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.bump();
        }
    }

    /// A symbol run ends at whitespace or `)`; anything else, including
    /// further `(` characters, is part of the symbol text.
    fn is_delimiter(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\r' | '\n' | ')')
    }

    fn invalid(&self, start: usize) -> LexerError {
        LexerError {
            kind: LexerErrorKind::InvalidValue,
            span: Span::new(start, self.pos.max(start + 1)),
        }
    }

    pub fn next_token(&mut self) -> LexerResult<Option<Token>> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let kind = match c {
            '(' => {
                self.bump();
                TokenKind::LParen
            }
            ')' => {
                self.bump();
                TokenKind::RParen
            }
            '+' => {
                self.bump();
                TokenKind::Keyword(Keyword::Plus)
            }
            '*' => {
                self.bump();
                TokenKind::Keyword(Keyword::Multiply)
            }
            '/' => {
                self.bump();
                TokenKind::Keyword(Keyword::Divide)
            }
            '<' => {
                self.bump();
                TokenKind::Keyword(Keyword::Less)
            }
            '>' => {
                self.bump();
                TokenKind::Keyword(Keyword::Greater)
            }
            '=' => {
                self.bump();
                TokenKind::Keyword(Keyword::Equal)
            }
            '-' => match self.peek_second() {
                Some(d) if d.is_ascii_digit() => self.lex_number(start)?,
                Some(d) if !Self::is_delimiter(d) => self.lex_symbol(start),
                _ => {
                    // minus operator when followed by a delimiter or EOF
                    self.bump();
                    TokenKind::Keyword(Keyword::Minus)
                }
            },
            '0'..='9' => self.lex_number(start)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(start),
            _ => {
                self.bump();
                return Err(self.invalid(start));
            }
        };
        Ok(Some(Token {
            kind,
            span: Span::new(start, self.pos),
        }))
    }

    /// `-? (0 | [1-9][0-9]*) (\.[0-9]+)? ([eE][+-]?[0-9]+)?`
    fn lex_number(&mut self, start: usize) -> LexerResult<TokenKind> {
        if self.peek() == Some('-') {
            self.bump();
        }
        match self.peek() {
            Some('0') => {
                self.bump();
            }
            Some(c) if c.is_ascii_digit() => {
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.bump();
                }
            }
            _ => return Err(self.invalid(start)),
        }
        if self.peek() == Some('.') {
            self.bump();
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return Err(self.invalid(start));
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return Err(self.invalid(start));
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = &self.src[start..self.pos];
        let n: f64 = text.parse().map_err(|_| self.invalid(start))?;
        if n.is_infinite() {
            return Err(LexerError {
                kind: LexerErrorKind::NumberTooBig,
                span: Span::new(start, self.pos),
            });
        }
        Ok(TokenKind::Number(n))
    }

    fn lex_symbol(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek(), Some(c) if !Self::is_delimiter(c)) {
            self.bump();
        }
        TokenKind::Symbol(self.src[start..self.pos].to_string())
    }

    /// First-letter dispatch over the reserved words; a failed literal match
    /// consumes nothing, so the whole run lexes as a symbol instead.
    fn lex_word(&mut self, start: usize) -> TokenKind {
        let matched = match self.peek() {
            Some('d') => self.lex_literal("define", Keyword::Define),
            Some('l') => self.lex_literal("lambda", Keyword::Lambda),
            Some('i') => self.lex_literal("if", Keyword::If),
            Some('q') => self.lex_literal("quote", Keyword::Quote),
            Some('n') => {
                if self.peek_second() == Some('o') {
                    self.lex_literal("not", Keyword::Not)
                } else {
                    self.lex_literal("null?", Keyword::IsNull)
                }
            }
            Some('c') => match self.peek_second() {
                Some('a') => self.lex_literal("car", Keyword::Car),
                Some('d') => self.lex_literal("cdr", Keyword::Cdr),
                Some('o') => self.lex_literal("cons", Keyword::Cons),
                _ => None,
            },
            _ => None,
        };
        match matched {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => self.lex_symbol(start),
        }
    }

    fn lex_literal(&mut self, literal: &str, keyword: Keyword) -> Option<Keyword> {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            Some(keyword)
        } else {
            None
        }
    }
}

/// Tokenizes a whole input string (tests, parser, REPL completion).
pub fn tokenize(input: &str) -> LexerResult<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}
