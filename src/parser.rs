use std::iter::Peekable;
use std::vec::IntoIter;

use thiserror::Error;

use crate::lexer::{self, LexerError, LexerErrorKind, Token, TokenKind};
use crate::source::Span;
use crate::types::{Node, Sexpr};

/// One variant per fatal parse status; no partial results survive an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid value")]
    InvalidValue(Span),
    #[error("number does not fit in a double")]
    NumberTooBig(Span),
    #[error("only one expression is accepted per parse")]
    RootNotSingular(Span),
    #[error("missing closing parenthesis")]
    MissCloseParen(Span),
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::InvalidValue(span)
            | ParseError::NumberTooBig(span)
            | ParseError::RootNotSingular(span)
            | ParseError::MissCloseParen(span) => *span,
        }
    }
}

impl From<LexerError> for ParseError {
    fn from(err: LexerError) -> Self {
        match err.kind {
            LexerErrorKind::InvalidValue => ParseError::InvalidValue(err.span),
            LexerErrorKind::NumberTooBig => ParseError::NumberTooBig(err.span),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    // We iterate over owned Tokens, consuming them.
    tokens: Peekable<IntoIter<Token>>,
    // Byte length of the source, for end-of-input error spans.
    end: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, end: usize) -> Parser {
        Parser {
            tokens: tokens.into_iter().peekable(),
            end,
        }
    }

    fn eof_span(&self) -> Span {
        Span::new(self.end, self.end)
    }

    /// Parses a single expression from the token stream.
    fn parse_expr(&mut self) -> ParseResult<Node> {
        match self.tokens.next() {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => self.parse_list(span),
            Some(Token {
                kind: TokenKind::Number(n),
                span,
            }) => Ok(Node::new_number(n, span)),
            Some(Token {
                kind: TokenKind::Symbol(s),
                span,
            }) => Ok(Node::new_symbol(s, span)),
            Some(Token {
                kind: TokenKind::Keyword(keyword),
                span,
            }) => Ok(Node::new_keyword(keyword, span)),
            // a close paren with no matching open
            Some(Token {
                kind: TokenKind::RParen,
                span,
            }) => Err(ParseError::InvalidValue(span)),
            None => Err(ParseError::InvalidValue(self.eof_span())),
        }
    }

    /// Parses list elements after `(`; an inner failure discards the
    /// partially-built element buffer by unwinding through `?`.
    fn parse_list(&mut self, lparen: Span) -> ParseResult<Node> {
        let mut elements = Vec::new();
        loop {
            if let Some(rparen) = self.tokens.next_if(|t| t.kind == TokenKind::RParen) {
                return Ok(Node::new(
                    Sexpr::List(elements),
                    lparen.merge(rparen.span),
                ));
            }
            if self.tokens.peek().is_none() {
                return Err(ParseError::MissCloseParen(Span::new(lparen.start, self.end)));
            }
            elements.push(self.parse_expr()?);
        }
    }

    /// Parses exactly one top-level expression; trailing tokens are an error.
    pub fn parse(mut self) -> ParseResult<Node> {
        let expr = self.parse_expr()?;
        match self.tokens.next() {
            Some(found) => Err(ParseError::RootNotSingular(found.span)),
            None => Ok(expr),
        }
    }
}

/// Lexes and parses one expression (REPL, tests).
pub fn parse(input: &str) -> ParseResult<Node> {
    let tokens = lexer::tokenize(input)?;
    Parser::new(tokens, input.len()).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Keyword;

    // Helper for asserting successful parsing, compared structurally with
    // explicit spans
    fn assert_parse(input: &str, expected: Node) {
        match parse(input) {
            Ok(result) => assert_eq!(result, expected, "Input: '{}'", input),
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    // Helper asserting the parse succeeds and serializes back to `expected`
    fn assert_parse_stringifies(input: &str, expected: &str) {
        match parse(input) {
            Ok(result) => assert_eq!(result.to_string(), expected, "Input: '{}'", input),
            Err(e) => panic!("Parsing failed for input '{}': {}", input, e),
        }
    }

    // Helper for asserting parse errors by variant
    fn assert_parse_error(input: &str, expected: ParseError) {
        match parse(input) {
            Ok(result) => panic!(
                "Expected parsing to fail for input '{}', but got: {:?}",
                input, result
            ),
            Err(e) => assert_eq!(
                std::mem::discriminant(&e),
                std::mem::discriminant(&expected),
                "Input: '{}', Expected error variant like {:?}, got: {:?}",
                input,
                expected,
                e
            ),
        }
    }

    fn node_number(n: f64, start: usize, end: usize) -> Node {
        Node::new_number(n, Span::new(start, end))
    }

    fn node_symbol(s: &str, start: usize, end: usize) -> Node {
        Node::new_symbol(s, Span::new(start, end))
    }

    fn node_keyword(keyword: Keyword, start: usize, end: usize) -> Node {
        Node::new_keyword(keyword, Span::new(start, end))
    }

    fn node_list(elements: Vec<Node>, start: usize, end: usize) -> Node {
        Node::new_list(elements, Span::new(start, end))
    }

    #[test]
    fn test_parse_atoms() {
        assert_parse("123", node_number(123.0, 0, 3));
        assert_parse("-4.5", node_number(-4.5, 0, 4));
        assert_parse("symbol", node_symbol("symbol", 0, 6));
        assert_parse("+", node_keyword(Keyword::Plus, 0, 1));
        assert_parse("- ", node_keyword(Keyword::Minus, 0, 1));
        assert_parse("define", node_keyword(Keyword::Define, 0, 6));
    }

    #[test]
    fn test_parse_empty_list() {
        assert_parse("()", node_list(vec![], 0, 2));
        assert_parse("( )", node_list(vec![], 0, 3));
    }

    #[test]
    fn test_parse_simple_list() {
        assert_parse(
            "(+ 1 2)",
            node_list(
                vec![
                    node_keyword(Keyword::Plus, 1, 2),
                    node_number(1.0, 3, 4),
                    node_number(2.0, 5, 6),
                ],
                0,
                7,
            ),
        );
    }

    #[test]
    fn test_parse_nested_list() {
        assert_parse(
            "(+ 1 (* 2 3))",
            node_list(
                vec![
                    node_keyword(Keyword::Plus, 1, 2),
                    node_number(1.0, 3, 4),
                    node_list(
                        vec![
                            node_keyword(Keyword::Multiply, 6, 7),
                            node_number(2.0, 8, 9),
                            node_number(3.0, 10, 11),
                        ],
                        5,
                        12,
                    ),
                ],
                0,
                13,
            ),
        );
        assert_parse(
            "(()())",
            node_list(
                vec![node_list(vec![], 1, 3), node_list(vec![], 3, 5)],
                0,
                6,
            ),
        );
    }

    #[test]
    fn test_parse_define_form_shape() {
        // head is the define tag, name stays an uninterpreted symbol
        let input = "(define fib (lambda (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2))))))";
        let node = parse(input).expect("should parse");
        let Sexpr::List(elements) = &node.kind else {
            panic!("expected a list, got {:?}", node);
        };
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].kind, Sexpr::Keyword(Keyword::Define));
        assert_eq!(elements[1].kind, Sexpr::Symbol("fib".to_string()));
        assert_eq!(elements[2].head_keyword(), Some(Keyword::Lambda));
        assert_eq!(node.to_string(), input);
    }

    #[test]
    fn test_parse_quote_form() {
        assert_parse_stringifies("(quote (1 2))", "(quote (1 2))");
        assert_parse_stringifies("(quote ())", "(quote ())");
        assert_parse_stringifies("( quote ( 1 ( 2 3 ) ) )", "(quote (1 (2 3)))");
    }

    #[test]
    fn test_parse_round_trip() {
        // operator-free literal data survives parse -> stringify -> parse
        for input in ["12", "(1 2 3)", "(quote (1 (2) ()))", "(a b (c))"] {
            let first = parse(input).expect("first parse");
            let second = parse(&first.to_string()).expect("reparse");
            assert_eq!(first.to_string(), second.to_string(), "Input: '{}'", input);
        }
    }

    #[test]
    fn test_parse_root_not_singular() {
        let root_not_singular = ParseError::RootNotSingular(Span::default());
        assert_parse_error("definea", root_not_singular.clone());
        assert_parse_error("define a", root_not_singular.clone());
        assert_parse_error("lambdab", root_not_singular.clone());
        assert_parse_error("carr", root_not_singular.clone());
        assert_parse_error("car r", root_not_singular.clone());
        assert_parse_error("cdrr", root_not_singular.clone());
        assert_parse_error("cdr r", root_not_singular.clone());
        assert_parse_error("(1) 2", root_not_singular);
    }

    #[test]
    fn test_parse_miss_close_paren() {
        let miss_close = ParseError::MissCloseParen(Span::default());
        assert_parse_error("(", miss_close.clone());
        assert_parse_error("(+", miss_close.clone());
        assert_parse_error("((", miss_close.clone());
        assert_parse_error("(1 2", miss_close);
    }

    #[test]
    fn test_parse_invalid_value() {
        let invalid = ParseError::InvalidValue(Span::default());
        assert_parse_error("", invalid.clone());
        assert_parse_error(")", invalid.clone());
        assert_parse_error("(1 .)", invalid.clone());
        assert_parse_error("1.", invalid);
    }

    #[test]
    fn test_parse_number_too_big() {
        assert_parse_error("1e309", ParseError::NumberTooBig(Span::default()));
    }

    #[test]
    fn test_partial_reserved_words_parse_as_symbols() {
        assert_parse("defi", node_symbol("defi", 0, 4));
        assert_parse("lambd", node_symbol("lambd", 0, 5));
        assert_parse("ca", node_symbol("ca", 0, 2));
        assert_parse("cd", node_symbol("cd", 0, 2));
    }

    #[test]
    fn test_error_spans() {
        match parse("(1 2") {
            Err(ParseError::MissCloseParen(span)) => assert_eq!(span, Span::new(0, 4)),
            other => panic!("expected MissCloseParen, got {:?}", other),
        }
        match parse("definea") {
            Err(ParseError::RootNotSingular(span)) => assert_eq!(span, Span::new(6, 7)),
            other => panic!("expected RootNotSingular, got {:?}", other),
        }
    }
}
