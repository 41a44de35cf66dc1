pub mod ast;
mod expr;

use std::error::Error;
use std::fmt;

use crate::lexer::token::{Token, TokenKind};
use ast::{Program, Stmt, Toplevel, TypeExpr, VarDecl, VarsDecl};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, token: &Token) -> Self {
        Self {
            message: message.into(),
            offset: token.offset,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at offset {}: {}", self.offset, self.message)
    }
}

impl Error for ParseError {}

/// Parses a whole source text into a program.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = crate::lexer::lex(source).map_err(|err| ParseError {
        message: err.message,
        offset: err.offset,
    })?;
    Parser::new(tokens).parse_program()
}

type ToplevelParselet = fn(&mut Parser, Token) -> Result<Toplevel, ParseError>;
type StatementParselet = fn(&mut Parser, Token) -> Result<Stmt, ParseError>;
type TypeParselet = fn(&mut Parser, Token) -> Result<TypeExpr, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Vec::new();
        while !self.is_at_end() {
            program.push(self.parse_toplevel()?);
            self.require(&[TokenKind::Semi, TokenKind::Eof])?;
        }
        Ok(program)
    }

    fn parse_toplevel(&mut self) -> Result<Toplevel, ParseError> {
        let Some(parselet) = toplevel_parselet(self.peek_kind()) else {
            return Err(self.err_expect("toplevel construct"));
        };
        let tok = self.next();
        parselet(self, tok)
    }

    pub fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match statement_parselet(self.peek_kind()) {
            Some(parselet) => {
                let tok = self.next();
                parselet(self, tok)
            }
            None => Ok(Stmt::Expr(self.parse_expression(0)?)),
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.require(&[TokenKind::LBrace])?;
        let mut stmts = Vec::new();
        let mut list = self.list(TokenKind::Semi, TokenKind::RBrace);
        while list.next(self)? {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    /// Parses `name[, name…] Type`, the shared shape of variable
    /// declarations, parameter groups and composite fields.
    fn parse_var_types(&mut self) -> Result<VarsDecl, ParseError> {
        let mut names = vec![self.require_ident()?];
        while self.accept(&TokenKind::Comma) {
            names.push(self.require_ident()?);
        }

        let Some(ty) = self.parse_type()? else {
            return Err(self.err_expect("type"));
        };
        Ok(VarsDecl {
            external: false,
            names,
            ty,
        })
    }

    pub(crate) fn parse_type(&mut self) -> Result<Option<TypeExpr>, ParseError> {
        let Some(parselet) = type_parselet(self.peek_kind()) else {
            return Ok(None);
        };
        let tok = self.next();
        parselet(self, tok).map(Some)
    }

    pub(crate) fn require_type(&mut self) -> Result<TypeExpr, ParseError> {
        match self.parse_type()? {
            Some(ty) => Ok(ty),
            None => Err(self.err_expect("type")),
        }
    }

    pub(crate) fn err_expect(&self, what: &str) -> ParseError {
        ParseError::new(
            format!("Expected {}; got {}", what, self.peek().kind),
            self.peek(),
        )
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        match self.tokens.get(self.current + offset) {
            Some(token) => &token.kind,
            None => &TokenKind::Eof,
        }
    }

    pub(crate) fn next(&mut self) -> Token {
        let tok = self.tokens[self.current].clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        tok
    }

    pub(crate) fn accept(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind().same(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    pub(crate) fn require(&mut self, kinds: &[TokenKind]) -> Result<Token, ParseError> {
        for kind in kinds {
            if self.peek_kind().same(kind) {
                return Ok(self.next());
            }
        }

        let what = if kinds.len() == 1 {
            kinds[0].to_string()
        } else {
            let mut what = String::from("one of");
            for (i, kind) in kinds.iter().enumerate() {
                if i > 0 {
                    what.push(',');
                }
                what.push(' ');
                what.push_str(&kind.to_string());
            }
            what
        };
        Err(self.err_expect(&what))
    }

    pub(crate) fn require_ident(&mut self) -> Result<String, ParseError> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.next();
                Ok(name)
            }
            _ => Err(self.err_expect("identifier")),
        }
    }

    fn require_type_name(&mut self) -> Result<String, ParseError> {
        match self.peek_kind() {
            TokenKind::TypeName(name) => {
                let name = name.clone();
                self.next();
                Ok(name)
            }
            _ => Err(self.err_expect("type name")),
        }
    }

    pub(crate) fn list(&mut self, sep: TokenKind, end: TokenKind) -> ListParser {
        ListParser {
            started: false,
            sep,
            end,
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}

/// Separator/terminator-driven list walker. Accepts a trailing separator
/// before the end token, and either the separator or the end token after
/// every element.
pub(crate) struct ListParser {
    started: bool,
    sep: TokenKind,
    end: TokenKind,
}

impl ListParser {
    pub(crate) fn next(&mut self, p: &mut Parser) -> Result<bool, ParseError> {
        if !self.started {
            self.started = true;
            Ok(!p.accept(&self.end))
        } else {
            let tok = p.require(&[self.end.clone(), self.sep.clone()])?;
            let mut done = tok.kind.same(&self.end);
            if !done {
                done = p.accept(&self.end);
            }
            Ok(!done)
        }
    }
}

fn toplevel_parselet(kind: &TokenKind) -> Option<ToplevelParselet> {
    let parselet: ToplevelParselet = match kind {
        TokenKind::Ns => |p, _| {
            let name = p.require_ident()?;
            p.require(&[TokenKind::LBrace])?;
            let mut body = Vec::new();
            let mut list = p.list(TokenKind::Semi, TokenKind::RBrace);
            while list.next(p)? {
                body.push(p.parse_toplevel()?);
            }
            Ok(Toplevel::Namespace { name, body })
        },

        TokenKind::Pub => |p, tok| match p.parse_toplevel()? {
            Toplevel::Function {
                name,
                params,
                ret,
                body,
                ..
            } => Ok(Toplevel::Function {
                public: true,
                name,
                params,
                ret,
                body,
            }),
            _ => Err(ParseError::new("Expected function", &tok)),
        },

        TokenKind::Variadic => |p, tok| match p.parse_toplevel()? {
            Toplevel::Vars(mut decl) => match decl.ty {
                TypeExpr::Func { ref mut variadic, .. } => {
                    *variadic = true;
                    Ok(Toplevel::Vars(decl))
                }
                _ => Err(ParseError::new("Expected function declaration", &tok)),
            },
            _ => Err(ParseError::new("Expected function declaration", &tok)),
        },

        TokenKind::Extern => |p, tok| match p.parse_toplevel()? {
            Toplevel::Vars(mut decl) => {
                decl.external = true;
                Ok(Toplevel::Vars(decl))
            }
            _ => Err(ParseError::new("Expected variable declaration", &tok)),
        },

        TokenKind::Fn => |p, _| {
            let name = p.require_ident()?;
            p.require(&[TokenKind::LParen])?;
            let mut params = Vec::new();
            let mut list = p.list(TokenKind::Comma, TokenKind::RParen);
            while list.next(p)? {
                // Parameter names are optional in bodyless declarations;
                // a lone lowercase identifier not starting a namespace
                // path must be a name.
                if matches!(p.peek_kind(), TokenKind::Ident(_))
                    && !matches!(p.peek_kind_at(1), TokenKind::Dot)
                {
                    params.extend(p.parse_var_types()?.decls());
                } else {
                    let ty = p.require_type()?;
                    params.push(VarDecl {
                        name: String::new(),
                        ty,
                    });
                }
            }
            let ret = p.parse_type()?;

            if matches!(p.peek_kind(), TokenKind::LBrace) {
                let body = p.parse_block()?;
                Ok(Toplevel::Function {
                    public: false,
                    name,
                    params,
                    ret,
                    body,
                })
            } else {
                // No body: this is a declaration of a callable name.
                let param_tys = params.into_iter().map(|p| p.ty).collect();
                Ok(Toplevel::Vars(VarsDecl {
                    external: false,
                    names: vec![name],
                    ty: TypeExpr::Func {
                        variadic: false,
                        params: param_tys,
                        ret: ret.map(Box::new),
                    },
                }))
            }
        },

        TokenKind::Var => |p, _| Ok(Toplevel::Vars(p.parse_var_types()?)),

        TokenKind::Type => |p, _| {
            let name = p.require_type_name()?;
            if p.accept(&TokenKind::Equals) {
                let ty = p.require_type()?;
                Ok(Toplevel::TypeAlias { name, ty })
            } else {
                let ty = p.require_type()?;
                Ok(Toplevel::TypeDef { name, ty })
            }
        },

        _ => return None,
    };
    Some(parselet)
}

fn statement_parselet(kind: &TokenKind) -> Option<StatementParselet> {
    let parselet: StatementParselet = match kind {
        TokenKind::Return => |p, _| {
            if matches!(
                p.peek_kind(),
                TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof
            ) {
                return Ok(Stmt::Return(None));
            }
            Ok(Stmt::Return(Some(p.parse_expression(0)?)))
        },

        TokenKind::Var => |p, _| Ok(Stmt::Vars(p.parse_var_types()?)),

        TokenKind::If => |p, _| {
            let cond = p.parse_expression(0)?;
            let then = p.parse_block()?;
            let els = if p.accept(&TokenKind::Else) {
                if matches!(p.peek_kind(), TokenKind::If) {
                    vec![p.parse_statement()?]
                } else {
                    p.parse_block()?
                }
            } else {
                Vec::new()
            };
            Ok(Stmt::If { cond, then, els })
        },

        TokenKind::For => |p, tok| {
            if matches!(p.peek_kind(), TokenKind::LBrace) {
                return Ok(Stmt::For {
                    init: None,
                    cond: None,
                    step: None,
                    body: p.parse_block()?,
                });
            }

            let mut init = None;
            if !p.accept(&TokenKind::Semi) {
                let stmt = p.parse_statement()?;
                if !p.accept(&TokenKind::Semi) {
                    // Single-argument shorthand: the lone clause is the
                    // loop condition.
                    return match stmt {
                        Stmt::Expr(cond) => Ok(Stmt::For {
                            init: None,
                            cond: Some(cond),
                            step: None,
                            body: p.parse_block()?,
                        }),
                        _ => Err(ParseError::new("Expected expression, got statement", &tok)),
                    };
                }
                init = Some(Box::new(stmt));
            }

            let mut cond = None;
            if !p.accept(&TokenKind::Semi) {
                cond = Some(p.parse_expression(0)?);
                p.require(&[TokenKind::Semi])?;
            }

            let mut step = None;
            if !matches!(p.peek_kind(), TokenKind::LBrace) {
                step = Some(p.parse_expression(0)?);
            }

            Ok(Stmt::For {
                init,
                cond,
                step,
                body: p.parse_block()?,
            })
        },

        TokenKind::Break => |_, _| Ok(Stmt::Break),
        TokenKind::Continue => |_, _| Ok(Stmt::Continue),

        _ => return None,
    };
    Some(parselet)
}

fn type_parselet(kind: &TokenKind) -> Option<TypeParselet> {
    let parselet: TypeParselet = match kind {
        TokenKind::TypeName(_) => |_, tok| match tok.kind {
            TokenKind::TypeName(name) => Ok(TypeExpr::Named(name)),
            _ => unreachable!(),
        },

        // A dotted namespace path ending in a type name.
        TokenKind::Ident(_) => |p, tok| {
            let TokenKind::Ident(first) = tok.kind else {
                unreachable!()
            };
            let mut path = vec![first];
            loop {
                p.require(&[TokenKind::Dot])?;
                match p.peek_kind() {
                    TokenKind::Ident(_) => path.push(p.require_ident()?),
                    TokenKind::TypeName(_) => {
                        path.push(p.require_type_name()?);
                        return Ok(TypeExpr::Namespaced(path));
                    }
                    _ => return Err(p.err_expect("type name")),
                }
            }
        },

        TokenKind::LBracket => |p, _| {
            if p.accept(&TokenKind::RBracket) {
                return Ok(TypeExpr::Pointer(None));
            }
            let inner = p.require_type()?;
            if let TokenKind::Int(text) = p.peek_kind() {
                let len = crate::lexer::token::decode_int(text)
                    .filter(|n| *n > 0)
                    .ok_or_else(|| p.err_expect("array length"))?;
                p.next();
                p.require(&[TokenKind::RBracket])?;
                return Ok(TypeExpr::Array {
                    elem: Box::new(inner),
                    len: len as u64,
                });
            }
            p.require(&[TokenKind::RBracket])?;
            Ok(TypeExpr::Pointer(Some(Box::new(inner))))
        },

        // A function type in type position is a pointer to the function.
        TokenKind::Fn => |p, _| {
            p.require(&[TokenKind::LParen])?;
            let mut params = Vec::new();
            let mut list = p.list(TokenKind::Comma, TokenKind::RParen);
            while list.next(p)? {
                // Parameter names are permitted but carry no meaning here.
                if matches!(p.peek_kind(), TokenKind::Ident(_))
                    && !matches!(p.peek_kind_at(1), TokenKind::Dot)
                {
                    p.next();
                }
                params.push(p.require_type()?);
            }
            let ret = p.parse_type()?;
            Ok(TypeExpr::Pointer(Some(Box::new(TypeExpr::Func {
                variadic: false,
                params,
                ret: ret.map(Box::new),
            }))))
        },

        TokenKind::Struct => |p, _| Ok(TypeExpr::Struct(p.composite_fields()?)),
        TokenKind::Union => |p, _| Ok(TypeExpr::Union(p.composite_fields()?)),

        _ => return None,
    };
    Some(parselet)
}

impl Parser {
    fn composite_fields(&mut self) -> Result<Vec<VarDecl>, ParseError> {
        self.require(&[TokenKind::LBrace])?;
        let mut fields = Vec::new();
        let mut list = self.list(TokenKind::Semi, TokenKind::RBrace);
        while list.next(self)? {
            fields.extend(self.parse_var_types()?.decls());
        }
        Ok(fields)
    }
}
