use crate::error::{EvalError, EvalResult, Span};
use logos::Logos;
use std::fmt;

/// Tokens of the embedded expression language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token<'src> {
    // Keywords
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    #[token("as")]
    As,

    // Literals
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| &lex.slice()[1..])]
    Variable(&'src str),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| lex.slice())]
    String(&'src str),

    // Operators
    #[token("===")]
    StrictEq,

    #[token("!==")]
    StrictNotEq,

    #[token("==")]
    Eq,

    #[token("!=")]
    NotEq,

    #[token("<=")]
    LessEq,

    #[token(">=")]
    GreaterEq,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token("??")]
    Coalesce,

    #[token("++")]
    Increment,

    #[token("--")]
    Decrement,

    #[token("+=")]
    PlusAssign,

    #[token("-=")]
    MinusAssign,

    #[token("=>")]
    Arrow,

    #[token("=")]
    Assign,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("!")]
    Bang,

    #[token("?")]
    Question,

    // Punctuation
    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::As => write!(f, "as"),
            Token::Variable(name) => write!(f, "${}", name),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{}", s),
            Token::StrictEq => write!(f, "==="),
            Token::StrictNotEq => write!(f, "!=="),
            Token::Eq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::LessEq => write!(f, "<="),
            Token::GreaterEq => write!(f, ">="),
            Token::Less => write!(f, "<"),
            Token::Greater => write!(f, ">"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Coalesce => write!(f, "??"),
            Token::Increment => write!(f, "++"),
            Token::Decrement => write!(f, "--"),
            Token::PlusAssign => write!(f, "+="),
            Token::MinusAssign => write!(f, "-="),
            Token::Arrow => write!(f, "=>"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Bang => write!(f, "!"),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
        }
    }
}

/// Split an expression into tokens; unknown characters are syntax errors
pub fn tokenize(source: &str) -> EvalResult<Vec<(Token<'_>, Span)>> {
    let lexer = Token::lexer(source);
    lexer
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(EvalError::SyntaxError {
                message: format!("unexpected character '{}'", &source[span.clone()]),
                span,
            }),
        })
        .collect()
}

/// Contents of a quoted string token with escapes resolved
pub fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some('0') => value.push('\0'),
            Some(other) => value.push(other),
            None => value.push('\\'),
        }
    }
    value
}
