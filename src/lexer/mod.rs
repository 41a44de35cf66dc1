pub mod token;

use std::error::Error;
use std::fmt;

use token::{Token, TokenKind, KEYWORDS};

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

impl LexError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lex error at offset {}: {}", self.offset, self.message)
    }
}

impl Error for LexError {}

pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).lex()
}

/// Single-pass scanner. Token recognition follows a fixed precedence order
/// at each position: comments, whitespace, newline, line continuation,
/// brackets, string/rune literals, numeric literals (sign included when a
/// digit follows directly), multi-character operators, single-character
/// operators, identifiers, type names, and finally a one-character invalid
/// token.
///
/// Newlines are discarded unless the previously emitted token closes an
/// expression (see [`TokenKind::auto_semi`]), in which case the newline is
/// emitted as a ';'. A backslash clears that state without emitting
/// anything, which is what makes it a line continuation.
struct Lexer {
    chars: Vec<char>,
    current: usize,
    offset: usize,
    start_offset: usize,
    prev_auto_semi: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            current: 0,
            offset: 0,
            start_offset: 0,
            prev_auto_semi: false,
            tokens: Vec::new(),
        }
    }

    fn lex(mut self) -> Result<Vec<Token>, LexError> {
        while !self.is_at_end() {
            self.start_offset = self.offset;
            self.scan_token()?;
        }
        self.tokens.push(Token::new(self.offset, TokenKind::Eof));
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexError> {
        let c = self.advance();
        match c {
            ' ' | '\t' | '\r' => {}
            '\n' => {
                if self.prev_auto_semi {
                    self.tokens
                        .push(Token::new(self.start_offset, TokenKind::Semi));
                    self.prev_auto_semi = false;
                }
            }
            '\\' => {
                // Line continuation: the next newline must not become a
                // semicolon, and the backslash itself is never emitted.
                self.prev_auto_semi = false;
            }

            '(' => self.emit(TokenKind::LParen),
            ')' => self.emit(TokenKind::RParen),
            '[' => self.emit(TokenKind::LBracket),
            ']' => self.emit(TokenKind::RBracket),
            '{' => self.emit(TokenKind::LBrace),
            '}' => self.emit(TokenKind::RBrace),
            ';' => self.emit(TokenKind::Semi),
            ',' => self.emit(TokenKind::Comma),

            '"' => self.string()?,
            '\'' => self.rune()?,

            '/' => {
                if self.matches('/') {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                } else if self.matches('=') {
                    self.emit(TokenKind::SlashEq);
                } else {
                    self.emit(TokenKind::Slash);
                }
            }

            '-' | '+' if self.starts_number() => self.number(Some(c)),
            d if d.is_ascii_digit() => self.number_from(d),
            '.' if self.peek().is_ascii_digit() => self.float_fraction(String::from(".")),
            '.' => self.emit(TokenKind::Dot),

            '=' => {
                if self.matches('=') {
                    self.emit(TokenKind::EqEq);
                } else {
                    self.emit(TokenKind::Equals);
                }
            }
            '!' => {
                if self.matches('=') {
                    self.emit(TokenKind::BangEq);
                } else {
                    self.emit(TokenKind::Bang);
                }
            }
            '+' => {
                if self.matches('=') {
                    self.emit(TokenKind::PlusEq);
                } else if self.matches('+') {
                    self.emit(TokenKind::PlusPlus);
                } else {
                    self.emit(TokenKind::Plus);
                }
            }
            '-' => {
                if self.matches('=') {
                    self.emit(TokenKind::MinusEq);
                } else if self.matches('-') {
                    self.emit(TokenKind::MinusMinus);
                } else {
                    self.emit(TokenKind::Minus);
                }
            }
            '*' => {
                if self.matches('=') {
                    self.emit(TokenKind::StarEq);
                } else {
                    self.emit(TokenKind::Star);
                }
            }
            '%' => {
                if self.matches('=') {
                    self.emit(TokenKind::PercentEq);
                } else {
                    self.emit(TokenKind::Percent);
                }
            }
            '^' => {
                if self.matches('=') {
                    self.emit(TokenKind::CaretEq);
                } else {
                    self.emit(TokenKind::Caret);
                }
            }
            '|' => {
                if self.matches('|') {
                    if self.matches('=') {
                        self.emit(TokenKind::OrOrEq);
                    } else {
                        self.emit(TokenKind::OrOr);
                    }
                } else if self.matches('=') {
                    self.emit(TokenKind::PipeEq);
                } else {
                    self.emit(TokenKind::Pipe);
                }
            }
            '&' => {
                if self.matches('&') {
                    if self.matches('=') {
                        self.emit(TokenKind::AndAndEq);
                    } else {
                        self.emit(TokenKind::AndAnd);
                    }
                } else if self.matches('=') {
                    self.emit(TokenKind::AmpEq);
                } else {
                    self.emit(TokenKind::Amp);
                }
            }
            '<' => {
                if self.matches('<') {
                    if self.matches('=') {
                        self.emit(TokenKind::ShlEq);
                    } else {
                        self.emit(TokenKind::Shl);
                    }
                } else if self.matches('=') {
                    self.emit(TokenKind::LessEq);
                } else {
                    self.emit(TokenKind::Less);
                }
            }
            '>' => {
                if self.matches('>') {
                    if self.matches('=') {
                        self.emit(TokenKind::ShrEq);
                    } else {
                        self.emit(TokenKind::Shr);
                    }
                } else if self.matches('=') {
                    self.emit(TokenKind::GreaterEq);
                } else {
                    self.emit(TokenKind::Greater);
                }
            }

            a if a == '_' || a.is_lowercase() => self.identifier(a),
            a if a.is_uppercase() => self.type_name(a),

            other => self.emit(TokenKind::Invalid(other)),
        }

        Ok(())
    }

    /// Lowercase identifiers may contain letters and digits, plus trailing
    /// underscores. An interior underscore ends the token.
    fn identifier(&mut self, first: char) {
        let mut text = String::from(first);
        while self.peek().is_alphanumeric() {
            text.push(self.advance());
        }
        while self.peek() == '_' {
            text.push(self.advance());
        }

        match KEYWORDS.get(text.as_str()) {
            Some(kind) => self.emit(kind.clone()),
            None => self.emit(TokenKind::Ident(text)),
        }
    }

    fn type_name(&mut self, first: char) {
        let mut text = String::from(first);
        while self.peek().is_alphanumeric() {
            text.push(self.advance());
        }
        self.emit(TokenKind::TypeName(text));
    }

    /// True when the character after a '-'/'+' begins a numeric literal, in
    /// which case the sign belongs to the literal.
    fn starts_number(&self) -> bool {
        self.peek().is_ascii_digit() || (self.peek() == '.' && self.peek_next().is_ascii_digit())
    }

    fn number(&mut self, sign: Option<char>) {
        let mut text = String::new();
        if let Some(sign) = sign {
            text.push(sign);
        }
        if self.peek() == '.' {
            text.push(self.advance());
            self.float_fraction(text);
            return;
        }
        let first = self.advance();
        text.push(first);
        self.number_tail(first, text);
    }

    fn number_from(&mut self, first: char) {
        self.number_tail(first, String::from(first));
    }

    fn number_tail(&mut self, first: char, mut text: String) {
        if first == '0' && (self.peek() == 'x' || self.peek() == 'b') {
            let base = self.advance();
            text.push(base);
            let hex = base == 'x';
            while self.peek() == '_'
                || (hex && self.peek().is_ascii_hexdigit())
                || (!hex && (self.peek() == '0' || self.peek() == '1'))
            {
                text.push(self.advance());
            }
            self.emit(TokenKind::Int(text));
            return;
        }

        while self.peek().is_ascii_digit() || self.peek() == '_' {
            text.push(self.advance());
        }

        if self.peek() == '.' {
            text.push(self.advance());
            self.float_fraction(text);
        } else {
            self.emit(TokenKind::Int(text));
        }
    }

    /// Continues a float literal after its '.' has been consumed.
    fn float_fraction(&mut self, mut text: String) {
        while self.peek().is_ascii_digit() || self.peek() == '_' {
            text.push(self.advance());
        }
        self.emit(TokenKind::Float(text));
    }

    fn string(&mut self) -> Result<(), LexError> {
        let mut value = Vec::new();
        loop {
            if self.is_at_end() {
                return Err(LexError::new(
                    "Unterminated string literal",
                    self.start_offset,
                ));
            }
            let c = self.advance();
            match c {
                '"' => break,
                '\\' => match self.escape()? {
                    Escaped::Byte(b) => value.push(b),
                    Escaped::Char(ch) => {
                        let mut buf = [0; 4];
                        value.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                    }
                },
                _ => {
                    let mut buf = [0; 4];
                    value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        self.emit(TokenKind::Str(value));
        Ok(())
    }

    fn rune(&mut self) -> Result<(), LexError> {
        if self.is_at_end() {
            return Err(LexError::new("Unterminated rune literal", self.start_offset));
        }
        let c = self.advance();
        let value = match c {
            '\\' => match self.escape()? {
                Escaped::Byte(b) => b as char,
                Escaped::Char(ch) => ch,
            },
            '\'' => {
                return Err(LexError::new("Empty rune literal", self.start_offset));
            }
            other => other,
        };
        if self.is_at_end() || self.advance() != '\'' {
            return Err(LexError::new("Unterminated rune literal", self.start_offset));
        }
        self.emit(TokenKind::Rune(value));
        Ok(())
    }

    /// Decodes one escape sequence, the leading '\\' already consumed.
    fn escape(&mut self) -> Result<Escaped, LexError> {
        if self.is_at_end() {
            return Err(LexError::new("Unterminated escape sequence", self.offset));
        }
        let at = self.offset;
        let c = self.advance();
        let escaped = match c {
            'e' => Escaped::Byte(0x1b),
            'n' => Escaped::Byte(b'\n'),
            'r' => Escaped::Byte(b'\r'),
            't' => Escaped::Byte(b'\t'),
            '\\' => Escaped::Byte(b'\\'),
            '"' => Escaped::Byte(b'"'),
            '\'' => Escaped::Byte(b'\''),
            'x' => Escaped::Byte(self.escape_digits(2, 16, at)? as u8),
            d if d.is_digit(8) => {
                let rest = self.escape_digits(2, 8, at)?;
                let value = (d.to_digit(8).unwrap_or(0) << 6) | rest;
                Escaped::Byte(value as u8)
            }
            'u' => Escaped::Char(self.escape_codepoint(4, at)?),
            'U' => Escaped::Char(self.escape_codepoint(8, at)?),
            other => {
                return Err(LexError::new(
                    format!("Invalid escape sequence '\\{}'", other),
                    at,
                ));
            }
        };
        Ok(escaped)
    }

    fn escape_digits(&mut self, count: usize, radix: u32, at: usize) -> Result<u32, LexError> {
        let mut value = 0;
        for _ in 0..count {
            let digit = self
                .peek()
                .to_digit(radix)
                .ok_or_else(|| LexError::new("Invalid escape sequence", at))?;
            self.advance();
            value = value * radix + digit;
        }
        Ok(value)
    }

    fn escape_codepoint(&mut self, count: usize, at: usize) -> Result<char, LexError> {
        let value = self.escape_digits(count, 16, at)?;
        char::from_u32(value)
            .ok_or_else(|| LexError::new(format!("Invalid codepoint {:#x}", value), at))
    }

    fn emit(&mut self, kind: TokenKind) {
        self.prev_auto_semi = kind.auto_semi();
        self.tokens.push(Token::new(self.start_offset, kind));
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            return false;
        }
        self.advance();
        true
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.current + 1]
        }
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        self.offset += c.len_utf8();
        c
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }
}

enum Escaped {
    Byte(u8),
    Char(char),
}
