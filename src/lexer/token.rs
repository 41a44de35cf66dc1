use std::fmt;
use std::mem;

use phf::phf_map;

/// A single lexed token. Literal payloads (decoded string bytes, rune
/// codepoints, raw digit text) live inside the kind; `offset` is the byte
/// position of the token's first character in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub offset: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(offset: usize, kind: TokenKind) -> Self {
        Self { offset, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Semi,
    Comma,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Only used inside the lexer: a line continuation occupies the
    // "previous token" slot so the next newline is not promoted. It is
    // never emitted.
    Backslash,

    Equals,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Pipe,
    Caret,
    Amp,
    Less,
    Greater,

    Shl,
    Shr,
    AndAnd,
    OrOr,
    EqEq,
    BangEq,
    LessEq,
    GreaterEq,

    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    PipeEq,
    CaretEq,
    AmpEq,
    ShlEq,
    ShrEq,
    AndAndEq,
    OrOrEq,

    PlusPlus,
    MinusMinus,

    Dot,

    Else,
    Extern,
    Fn,
    For,
    If,
    Ns,
    Pub,
    Return,
    Struct,
    Type,
    Union,
    Var,
    Variadic,
    Break,
    Continue,

    Ident(String),
    TypeName(String),
    /// Decoded byte payload; escapes are already resolved.
    Str(Vec<u8>),
    Rune(char),
    /// Raw digit text, including any base prefix, sign and separators.
    Int(String),
    Float(String),

    Invalid(char),
    Eof,
}

impl TokenKind {
    /// True if a newline directly after this token is promoted to ';'.
    pub fn auto_semi(&self) -> bool {
        matches!(
            self,
            TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Ident(_)
                | TokenKind::TypeName(_)
                | TokenKind::Str(_)
                | TokenKind::Rune(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }

    /// Variant equality, ignoring payloads.
    pub fn same(&self, other: &TokenKind) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// Decodes raw integer literal text (optional sign, `0x`/`0b`/leading-zero
/// octal prefixes, `_` separators) into its value.
pub fn decode_int(text: &str) -> Option<i64> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits: String = rest.chars().filter(|c| *c != '_').collect();

    let (radix, digits) = if let Some(hex) = digits.strip_prefix("0x") {
        (16, hex)
    } else if let Some(bin) = digits.strip_prefix("0b") {
        (2, bin)
    } else if digits.len() > 1 && digits.starts_with('0') && digits.bytes().all(|b| b < b'8') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };

    let value = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "else" => TokenKind::Else,
    "extern" => TokenKind::Extern,
    "fn" => TokenKind::Fn,
    "for" => TokenKind::For,
    "if" => TokenKind::If,
    "ns" => TokenKind::Ns,
    "pub" => TokenKind::Pub,
    "return" => TokenKind::Return,
    "struct" => TokenKind::Struct,
    "type" => TokenKind::Type,
    "union" => TokenKind::Union,
    "var" => TokenKind::Var,
    "variadic" => TokenKind::Variadic,
    "break" => TokenKind::Break,
    "continue" => TokenKind::Continue,
};

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Semi => "';'",
            TokenKind::Comma => "','",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Backslash => "'\\'",
            TokenKind::Equals => "'='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Bang => "'!'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Amp => "'&'",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::Shl => "'<<'",
            TokenKind::Shr => "'>>'",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::EqEq => "'=='",
            TokenKind::BangEq => "'!='",
            TokenKind::LessEq => "'<='",
            TokenKind::GreaterEq => "'>='",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::PercentEq => "'%='",
            TokenKind::PipeEq => "'|='",
            TokenKind::CaretEq => "'^='",
            TokenKind::AmpEq => "'&='",
            TokenKind::ShlEq => "'<<='",
            TokenKind::ShrEq => "'>>='",
            TokenKind::AndAndEq => "'&&='",
            TokenKind::OrOrEq => "'||='",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Dot => "'.'",
            TokenKind::Else => "'else'",
            TokenKind::Extern => "'extern'",
            TokenKind::Fn => "'fn'",
            TokenKind::For => "'for'",
            TokenKind::If => "'if'",
            TokenKind::Ns => "'ns'",
            TokenKind::Pub => "'pub'",
            TokenKind::Return => "'return'",
            TokenKind::Struct => "'struct'",
            TokenKind::Type => "'type'",
            TokenKind::Union => "'union'",
            TokenKind::Var => "'var'",
            TokenKind::Variadic => "'variadic'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Ident(_) => "identifier",
            TokenKind::TypeName(_) => "type name",
            TokenKind::Str(_) => "string literal",
            TokenKind::Rune(_) => "rune literal",
            TokenKind::Int(_) => "integer literal",
            TokenKind::Float(_) => "float literal",
            TokenKind::Invalid(_) => "invalid token",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}
