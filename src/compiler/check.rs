use crate::parser::ast::{Expr, LValue, TypeExpr, VarDecl};

use super::types::{compatible, Composite, ConcreteType, Field, FuncType, Type};
use super::{CompileError, Compiler, Variable};

impl Compiler {
    /// Resolves a syntactic type against the current scope, interning the
    /// aggregate layouts it introduces.
    pub(crate) fn resolve_type(&mut self, ty: &TypeExpr) -> Result<ConcreteType, CompileError> {
        let resolved = match ty {
            TypeExpr::Named(name) => self.type_by_name(name)?,
            TypeExpr::Namespaced(path) => self.type_by_name(&path.join("."))?,
            TypeExpr::Pointer(None) => ConcreteType::Pointer(None),
            TypeExpr::Pointer(Some(inner)) => {
                ConcreteType::pointer_to(self.resolve_type(inner)?)
            }
            TypeExpr::Array { elem, len } => {
                let elem = self.resolve_type(elem)?;
                let ty = ConcreteType::Array {
                    elem: Box::new(elem),
                    len: *len,
                };
                self.intern_composite(ty.layout());
                ty
            }
            TypeExpr::Func {
                variadic,
                params,
                ret,
            } => {
                let mut resolved_params = Vec::with_capacity(params.len());
                for param in params {
                    resolved_params.push(self.resolve_type(param)?);
                }
                let ret = match ret {
                    Some(ret) => Some(Box::new(self.resolve_type(ret)?)),
                    None => None,
                };
                ConcreteType::Func(FuncType {
                    variadic: *variadic,
                    params: resolved_params,
                    ret,
                })
            }
            TypeExpr::Struct(fields) => {
                let ty = ConcreteType::Struct(self.resolve_fields(fields)?);
                self.intern_composite(ty.layout());
                ty
            }
            TypeExpr::Union(fields) => {
                let ty = ConcreteType::Union(self.resolve_fields(fields)?);
                self.intern_composite(ty.layout());
                ty
            }
        };
        Ok(resolved)
    }

    fn resolve_fields(&mut self, fields: &[VarDecl]) -> Result<Composite, CompileError> {
        let mut resolved = Vec::with_capacity(fields.len());
        for field in fields {
            resolved.push(Field {
                name: field.name.clone(),
                ty: self.resolve_type(&field.ty)?,
            });
        }
        Ok(Composite { fields: resolved })
    }

    /// The type of an expression; `None` is void. Type checking happens
    /// here, interleaved with generation.
    pub(crate) fn type_of(&mut self, expr: &Expr) -> Result<Option<Type>, CompileError> {
        let ty = match expr {
            Expr::LValue(lv) => Some(Type::Concrete(self.lvalue_type(lv)?)),

            Expr::Ref(lv) => {
                let inner = self.lvalue_type(lv)?;
                if matches!(inner.unwrapped(), ConcreteType::Array { .. }) {
                    return Err(CompileError::new("Cannot reference array field"));
                }
                Some(Type::Concrete(ConcreteType::pointer_to(inner)))
            }

            Expr::Assign { target, value } => {
                if is_discard(target) {
                    self.type_of(value)?;
                    return Ok(None);
                }
                let lty = Type::Concrete(self.lvalue_type(target)?);
                let rty = self.value_type(value, "assignment")?;
                if !compatible(&lty, &rty) {
                    return Err(type_error("assignment", &rty, &lty));
                }
                None
            }

            Expr::Mutate { target, value, .. } => {
                let lty = Type::Concrete(self.lvalue_type(target)?);
                let rty = self.value_type(value, "mutation")?;
                self.check_binary(&lty, &rty, "mutation")?;
                None
            }

            Expr::Call { func, .. } => {
                let (signature, _) = self.callee_type(func)?;
                signature.ret.map(|ret| Type::Concrete(*ret))
            }

            Expr::Cast { ty, .. } => Some(Type::Concrete(self.resolve_type(ty)?)),

            Expr::Prefix { value, .. } => {
                let ty = self.value_type(value, "prefix expression")?;
                if !ty.concrete().is_numeric() {
                    return Err(CompileError::new(
                        "Operand of prefix expression is of non-numeric type",
                    ));
                }
                Some(ty)
            }

            Expr::Binary { lhs, rhs, .. } => {
                let lty = self.value_type(lhs, "binary expression")?;
                let rty = self.value_type(rhs, "binary expression")?;
                Some(self.check_binary(&lty, &rty, "binary expression")?)
            }

            Expr::Boolean { lhs, rhs, .. } => {
                let lty = self.value_type(lhs, "boolean expression")?;
                let rty = self.value_type(rhs, "boolean expression")?;
                Some(self.check_binary(&lty, &rty, "boolean expression")?)
            }

            Expr::IntLit(_) => Some(Type::IntLit),
            Expr::FloatLit(_) => Some(Type::FloatLit),
            Expr::StringLit(_) => Some(Type::Concrete(ConcreteType::pointer_to(
                ConcreteType::Primitive(super::types::Primitive::I8),
            ))),
            Expr::RuneLit(_) => Some(Type::IntLit),
        };
        Ok(ty)
    }

    /// Like [`type_of`], but an expression without a value is an error.
    pub(crate) fn value_type(&mut self, expr: &Expr, ctx: &str) -> Result<Type, CompileError> {
        self.type_of(expr)?.ok_or_else(|| {
            CompileError::new(format!("Type error in {}: expression has no value", ctx))
        })
    }

    pub(crate) fn lvalue_type(&mut self, lv: &LValue) -> Result<ConcreteType, CompileError> {
        match lv {
            LValue::Var(name) => Ok(self.variable(name)?.ty),

            LValue::Deref(expr) => match self.type_of(expr)? {
                Some(Type::Concrete(ty)) => match ty.unwrapped() {
                    ConcreteType::Pointer(Some(to)) => Ok((**to).clone()),
                    ConcreteType::Pointer(None) => {
                        Err(CompileError::new("Generic pointer may not be dereferenced"))
                    }
                    _ => Err(CompileError::new("Dereference of non-pointer type")),
                },
                _ => Err(CompileError::new("Dereference of non-pointer type")),
            },

            LValue::Access { base, field } => {
                if let Some(var) = self.ns_member(base, field) {
                    return Ok(var.ty);
                }

                // Pointers to composites are traversed implicitly.
                let mut ty = self.lvalue_type(base)?;
                loop {
                    let inner = match ty.unwrapped() {
                        ConcreteType::Pointer(Some(inner)) => (**inner).clone(),
                        _ => break,
                    };
                    ty = inner;
                }

                if !ty.is_composite() {
                    return Err(CompileError::new("Field access of non-composite type"));
                }
                match ty.field(field) {
                    Some((_, field_ty)) => Ok(field_ty),
                    None => Err(CompileError::new(format!(
                        "No field '{}' in {}",
                        field, ty
                    ))),
                }
            }
        }
    }

    /// Resolves `base.field` as a namespace member, when `base` is a
    /// (possibly nested) namespace path rather than a variable.
    pub(crate) fn ns_member(&self, base: &LValue, field: &str) -> Option<Variable> {
        let path = self.ns_path(base)?;
        self.global(&format!("{}.{}", path, field)).cloned()
    }

    fn ns_path(&self, lv: &LValue) -> Option<String> {
        match lv {
            LValue::Var(name) => {
                // A variable of the same name wins over a namespace.
                if self.lookup(name).is_some() {
                    return None;
                }
                for i in (0..=self.prefix.len()).rev() {
                    let key = if i == 0 {
                        name.clone()
                    } else {
                        format!("{}.{}", self.prefix[..i].join("."), name)
                    };
                    if self.is_namespace(&key) {
                        return Some(key);
                    }
                }
                None
            }
            LValue::Access { base, field } => {
                let path = self.ns_path(base)?;
                let key = format!("{}.{}", path, field);
                if self.is_namespace(&key) {
                    Some(key)
                } else {
                    None
                }
            }
            LValue::Deref(_) => None,
        }
    }

    /// Resolves the callable signature of a call target: either a function
    /// directly, or a pointer to one (`true` in the second slot).
    pub(crate) fn callee_type(&mut self, func: &Expr) -> Result<(FuncType, bool), CompileError> {
        if let Some(Type::Concrete(ty)) = self.type_of(func)? {
            match ty.unwrapped() {
                ConcreteType::Func(f) => return Ok((f.clone(), false)),
                ConcreteType::Pointer(Some(inner)) => {
                    if let ConcreteType::Func(f) = inner.unwrapped() {
                        return Ok((f.clone(), true));
                    }
                }
                _ => {}
            }
        }
        Err(CompileError::new("Invalid function type"))
    }

    /// The combined operand type of a two-sided numeric operation, after
    /// pointer-arithmetic and literal-coercion rules.
    pub(crate) fn check_binary(
        &self,
        lty: &Type,
        rty: &Type,
        ctx: &str,
    ) -> Result<Type, CompileError> {
        let lptr = is_pointer(lty);
        let rptr = is_pointer(rty);

        if lptr && !rptr {
            if !is_integer(rty) {
                return Err(type_error(ctx, rty, lty));
            }
            return Ok(lty.clone());
        }
        if rptr && !lptr {
            if !is_integer(lty) {
                return Err(type_error(ctx, lty, rty));
            }
            return Ok(rty.clone());
        }

        let result = if compatible(lty, rty) {
            if lty.is_concrete() {
                lty.clone()
            } else if rty.is_concrete() {
                rty.clone()
            } else {
                lty.clone()
            }
        } else if let Some(wider) = widened(lty, rty) {
            wider
        } else {
            return Err(type_error(ctx, rty, lty));
        };

        if !result.concrete().is_numeric() {
            return Err(CompileError::new(format!(
                "Operand of {} is of non-numeric type",
                ctx
            )));
        }
        Ok(result)
    }
}

pub(crate) fn is_discard(lv: &LValue) -> bool {
    matches!(lv, LValue::Var(name) if name == "_")
}

pub(crate) fn is_pointer(ty: &Type) -> bool {
    matches!(ty, Type::Concrete(c) if matches!(c.unwrapped(), ConcreteType::Pointer(_)))
}

pub(crate) fn is_integer(ty: &Type) -> bool {
    match ty {
        Type::IntLit => true,
        Type::FloatLit => false,
        Type::Concrete(c) => {
            matches!(c.unwrapped(), ConcreteType::Primitive(p) if !p.is_float())
        }
    }
}

/// Integer primitives of different widths combine into the wider type.
fn widened(lty: &Type, rty: &Type) -> Option<Type> {
    if !is_integer(lty) || !is_integer(rty) {
        return None;
    }
    let (Type::Concrete(l), Type::Concrete(r)) = (lty, rty) else {
        return None;
    };
    let (ls, rs) = (l.metrics().size, r.metrics().size);
    if ls == rs {
        return None;
    }
    Some(if ls > rs { lty.clone() } else { rty.clone() })
}

/// The shared type-error shape. Long operand types push the message onto
/// multiple lines.
pub(crate) fn type_error(ctx: &str, got: &Type, want: &Type) -> CompileError {
    let got = got.to_string();
    let want = want.to_string();
    if got.len() + want.len() > 60 {
        CompileError::new(format!(
            "Type error in {}:\n\t{}\nis not\n\t{}",
            ctx, got, want
        ))
    } else {
        CompileError::new(format!("Type error in {}: {} is not {}", ctx, got, want))
    }
}
