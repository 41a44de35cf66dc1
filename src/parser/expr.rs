use crate::lexer::token::{Token, TokenKind};

use super::ast::{BinaryOp, BooleanOp, Expr, LValue, PrefixOp};
use super::{ParseError, Parser};

// Binding powers, loosest first. Assignment and mutation are the only
// right-associative tiers; they re-enter the parser at prec - 1.
const PREC_ASSIGN: u8 = 1;
const PREC_LOR: u8 = 2;
const PREC_LAND: u8 = 3;
const PREC_COMPARE: u8 = 4;
const PREC_BITWISE: u8 = 5;
const PREC_SHIFT: u8 = 6;
const PREC_SUM: u8 = 7;
const PREC_MUL: u8 = 8;
const PREC_PREFIX: u8 = 9;
const PREC_CALL: u8 = 10;
const PREC_GROUP: u8 = 11;
const PREC_LITERAL: u8 = 12;

struct PrefixRule {
    prec: u8,
    parse: fn(u8, &mut Parser, Token) -> Result<Expr, ParseError>,
}

struct InfixRule {
    prec: u8,
    parse: fn(u8, &mut Parser, Token, Expr) -> Result<Expr, ParseError>,
}

impl Parser {
    pub(crate) fn parse_expression(&mut self, prec: u8) -> Result<Expr, ParseError> {
        let Some(rule) = prefix_rule(self.peek_kind()) else {
            return Err(self.err_expect("expression"));
        };
        let tok = self.next();
        let mut left = (rule.parse)(rule.prec, self, tok)?;

        loop {
            let Some(rule) = infix_rule(self.peek_kind()) else {
                return Ok(left);
            };
            if rule.prec <= prec {
                return Ok(left);
            }
            let tok = self.next();
            left = (rule.parse)(rule.prec, self, tok, left)?;
        }
    }
}

fn prefix_rule(kind: &TokenKind) -> Option<PrefixRule> {
    let rule = match kind {
        TokenKind::Ident(_) => PrefixRule {
            prec: PREC_LITERAL,
            parse: |_, _, tok| match tok.kind {
                TokenKind::Ident(name) => Ok(Expr::LValue(LValue::Var(name))),
                _ => unreachable!(),
            },
        },
        TokenKind::Str(_) => PrefixRule {
            prec: PREC_LITERAL,
            parse: |_, _, tok| match tok.kind {
                TokenKind::Str(bytes) => Ok(Expr::StringLit(bytes)),
                _ => unreachable!(),
            },
        },
        TokenKind::Rune(_) => PrefixRule {
            prec: PREC_LITERAL,
            parse: |_, _, tok| match tok.kind {
                TokenKind::Rune(c) => Ok(Expr::RuneLit(c)),
                _ => unreachable!(),
            },
        },
        TokenKind::Int(_) => PrefixRule {
            prec: PREC_LITERAL,
            parse: |_, _, tok| match tok.kind {
                TokenKind::Int(text) => Ok(Expr::IntLit(text)),
                _ => unreachable!(),
            },
        },
        TokenKind::Float(_) => PrefixRule {
            prec: PREC_LITERAL,
            parse: |_, _, tok| match tok.kind {
                TokenKind::Float(text) => Ok(Expr::FloatLit(text)),
                _ => unreachable!(),
            },
        },

        TokenKind::LParen => PrefixRule {
            prec: PREC_GROUP,
            parse: |_, p, _| {
                let e = p.parse_expression(0)?;
                p.require(&[TokenKind::RParen])?;
                Ok(e)
            },
        },
        // `[e]` dereferences e.
        TokenKind::LBracket => PrefixRule {
            prec: PREC_GROUP,
            parse: |_, p, _| {
                let e = p.parse_expression(0)?;
                p.require(&[TokenKind::RBracket])?;
                Ok(Expr::LValue(LValue::Deref(Box::new(e))))
            },
        },

        TokenKind::Amp => PrefixRule {
            prec: PREC_PREFIX,
            parse: |prec, p, tok| {
                let value = p.parse_expression(prec)?;
                match value.into_lvalue() {
                    Ok(lv) => Ok(Expr::Ref(lv)),
                    Err(_) => Err(ParseError::new("Reference of non-lvalue", &tok)),
                }
            },
        },

        TokenKind::Bang | TokenKind::Caret | TokenKind::Minus | TokenKind::Plus => PrefixRule {
            prec: PREC_PREFIX,
            parse: |prec, p, tok| {
                let op = match tok.kind {
                    TokenKind::Bang => PrefixOp::Not,
                    TokenKind::Caret => PrefixOp::Inv,
                    TokenKind::Minus => PrefixOp::Neg,
                    TokenKind::Plus => PrefixOp::Pos,
                    _ => unreachable!(),
                };
                let value = p.parse_expression(prec)?;
                Ok(Expr::Prefix {
                    op,
                    value: Box::new(value),
                })
            },
        },

        _ => return None,
    };
    Some(rule)
}

fn infix_rule(kind: &TokenKind) -> Option<InfixRule> {
    let rule = match kind {
        TokenKind::Dot => InfixRule {
            prec: PREC_CALL,
            parse: |_, p, tok, left| {
                let base = left
                    .into_lvalue()
                    .map_err(|_| ParseError::new("Field access of non-lvalue", &tok))?;
                let field = p.require_ident()?;
                Ok(Expr::LValue(LValue::Access {
                    base: Box::new(base),
                    field,
                }))
            },
        },

        TokenKind::Equals => InfixRule {
            prec: PREC_ASSIGN,
            parse: |prec, p, tok, left| {
                let target = left
                    .into_lvalue()
                    .map_err(|_| ParseError::new("Assign to non-lvalue", &tok))?;
                let value = p.parse_expression(prec - 1)?;
                Ok(Expr::Assign {
                    target,
                    value: Box::new(value),
                })
            },
        },

        TokenKind::PlusEq
        | TokenKind::MinusEq
        | TokenKind::StarEq
        | TokenKind::SlashEq
        | TokenKind::PercentEq
        | TokenKind::PipeEq
        | TokenKind::CaretEq
        | TokenKind::AmpEq
        | TokenKind::ShlEq
        | TokenKind::ShrEq
        | TokenKind::AndAndEq
        | TokenKind::OrOrEq => InfixRule {
            prec: PREC_ASSIGN,
            parse: |prec, p, tok, left| {
                let op = match tok.kind {
                    TokenKind::PlusEq => BinaryOp::Add,
                    TokenKind::MinusEq => BinaryOp::Sub,
                    TokenKind::StarEq => BinaryOp::Mul,
                    TokenKind::SlashEq => BinaryOp::Div,
                    TokenKind::PercentEq => BinaryOp::Mod,
                    TokenKind::PipeEq => BinaryOp::Or,
                    TokenKind::CaretEq => BinaryOp::Xor,
                    TokenKind::AmpEq => BinaryOp::And,
                    TokenKind::ShlEq => BinaryOp::Shl,
                    TokenKind::ShrEq => BinaryOp::Shr,
                    ref other => {
                        return Err(ParseError::new(
                            format!("Invalid mutation operator {}", other),
                            &tok,
                        ));
                    }
                };
                let target = left
                    .into_lvalue()
                    .map_err(|_| ParseError::new("Mutate of non-lvalue", &tok))?;
                let value = p.parse_expression(prec - 1)?;
                Ok(Expr::Mutate {
                    op,
                    target,
                    value: Box::new(value),
                })
            },
        },

        TokenKind::PlusPlus | TokenKind::MinusMinus => InfixRule {
            prec: PREC_CALL,
            parse: |_, _, tok, left| {
                let op = match tok.kind {
                    TokenKind::PlusPlus => BinaryOp::Add,
                    _ => BinaryOp::Sub,
                };
                let target = left
                    .into_lvalue()
                    .map_err(|_| ParseError::new("Mutate of non-lvalue", &tok))?;
                Ok(Expr::Mutate {
                    op,
                    target,
                    value: Box::new(Expr::IntLit(String::from("1"))),
                })
            },
        },

        TokenKind::Plus | TokenKind::Minus => binary_rule(PREC_SUM),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => binary_rule(PREC_MUL),
        TokenKind::Pipe | TokenKind::Caret | TokenKind::Amp => binary_rule(PREC_BITWISE),
        TokenKind::Shl | TokenKind::Shr => binary_rule(PREC_SHIFT),
        TokenKind::EqEq
        | TokenKind::BangEq
        | TokenKind::Less
        | TokenKind::Greater
        | TokenKind::LessEq
        | TokenKind::GreaterEq => binary_rule(PREC_COMPARE),

        TokenKind::AndAnd => boolean_rule(PREC_LAND, BooleanOp::And),
        TokenKind::OrOr => boolean_rule(PREC_LOR, BooleanOp::Or),

        TokenKind::LParen => InfixRule {
            prec: PREC_CALL,
            parse: |_, p, _, left| {
                // `cast(v, T)` shares call syntax but takes a type as its
                // second argument.
                if matches!(&left, Expr::LValue(LValue::Var(name)) if name == "cast") {
                    let value = p.parse_expression(0)?;
                    p.require(&[TokenKind::Comma])?;
                    let ty = p.require_type()?;
                    p.require(&[TokenKind::RParen])?;
                    return Ok(Expr::Cast {
                        value: Box::new(value),
                        ty,
                    });
                }

                let mut args = Vec::new();
                let mut list = p.list(TokenKind::Comma, TokenKind::RParen);
                while list.next(p)? {
                    args.push(p.parse_expression(0)?);
                }
                Ok(Expr::Call {
                    func: Box::new(left),
                    args,
                })
            },
        },

        _ => return None,
    };
    Some(rule)
}

fn binary_rule(prec: u8) -> InfixRule {
    InfixRule {
        prec,
        parse: |prec, p, tok, left| {
            let op = match tok.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                TokenKind::Pipe => BinaryOp::Or,
                TokenKind::Caret => BinaryOp::Xor,
                TokenKind::Amp => BinaryOp::And,
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::BangEq => BinaryOp::Ne,
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::LessEq => BinaryOp::Le,
                TokenKind::GreaterEq => BinaryOp::Ge,
                _ => unreachable!(),
            };
            let rhs = p.parse_expression(prec)?;
            Ok(Expr::Binary {
                op,
                lhs: Box::new(left),
                rhs: Box::new(rhs),
            })
        },
    }
}

fn boolean_rule(prec: u8, op: BooleanOp) -> InfixRule {
    let parse: fn(u8, &mut Parser, Token, Expr) -> Result<Expr, ParseError> = match op {
        BooleanOp::And => |prec, p, _, left| {
            let rhs = p.parse_expression(prec)?;
            Ok(Expr::Boolean {
                op: BooleanOp::And,
                lhs: Box::new(left),
                rhs: Box::new(rhs),
            })
        },
        BooleanOp::Or => |prec, p, _, left| {
            let rhs = p.parse_expression(prec)?;
            Ok(Expr::Boolean {
                op: BooleanOp::Or,
                lhs: Box::new(left),
                rhs: Box::new(rhs),
            })
        },
    };
    InfixRule { prec, parse }
}
