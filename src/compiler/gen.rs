use crate::lexer::token::decode_int;
use crate::parser::ast::{
    BinaryOp, BooleanOp, Expr, LValue, PrefixOp, Program, Stmt, Toplevel,
};

use super::check::{is_discard, is_pointer, type_error};
use super::types::{compatible, ConcreteType, FuncType, Type};
use super::{CompileError, Compiler, LoopBlocks, Operand};

pub(crate) fn gen_program(program: &Program, c: &mut Compiler) -> Result<(), CompileError> {
    for toplevel in program {
        gen_toplevel(toplevel, c)?;
    }
    Ok(())
}

fn gen_toplevel(toplevel: &Toplevel, c: &mut Compiler) -> Result<(), CompileError> {
    match toplevel {
        Toplevel::Vars(decl) => {
            let ty = c.resolve_type(&decl.ty)?;
            for name in &decl.names {
                c.declare_global(name, ty.clone())?;
            }
            Ok(())
        }

        Toplevel::TypeDef { name, ty } => {
            let inner = c.resolve_type(ty)?;
            c.define_type(name, inner)
        }

        Toplevel::TypeAlias { name, ty } => {
            let inner = c.resolve_type(ty)?;
            c.alias_type(name, inner)
        }

        Toplevel::Namespace { name, body } => {
            c.enter_namespace(name);
            let result = body.iter().try_for_each(|tl| gen_toplevel(tl, c));
            c.exit_namespace();
            result
        }

        Toplevel::Function {
            public,
            name,
            params,
            ret,
            body,
        } => {
            let mut resolved = Vec::with_capacity(params.len());
            for param in params {
                resolved.push((param.name.clone(), c.resolve_type(&param.ty)?));
            }
            let ret_ty = match ret {
                Some(ty) => Some(c.resolve_type(ty)?),
                None => None,
            };

            // The function's own name is visible inside its body.
            let fn_ty = ConcreteType::Func(FuncType {
                variadic: false,
                params: resolved.iter().map(|(_, ty)| ty.clone()).collect(),
                ret: ret_ty.clone().map(Box::new),
            });
            let var = c.declare_global(name, fn_ty)?;
            let qualified = match &var.location {
                Operand::Global(qualified) => qualified.clone(),
                _ => name.clone(),
            };

            c.ret = ret_ty.clone();
            c.start_function(*public, &qualified, &resolved, ret_ty.as_ref())?;
            for stmt in body {
                gen_statement(stmt, c)?;
            }
            c.end_function();
            Ok(())
        }
    }
}

fn gen_statement(stmt: &Stmt, c: &mut Compiler) -> Result<(), CompileError> {
    c.just_returned = false;
    match stmt {
        Stmt::Vars(decl) => {
            let ty = c.resolve_type(&decl.ty)?;
            for name in &decl.names {
                c.declare_local(name, ty.clone())?;
            }
            Ok(())
        }

        Stmt::If { cond, then, els } => {
            let then_b = c.block();
            let else_b = c.block();
            let end_b = c.block();

            let cond_op = gen_value(cond, c)?;
            c.insn(None, "jnz", &[cond_op, then_b.clone(), else_b.clone()]);

            c.start_block(&then_b);
            for stmt in then {
                gen_statement(stmt, c)?;
            }
            if !c.just_returned {
                c.insn(None, "jmp", &[end_b.clone()]);
            }
            c.start_block(&else_b);
            for stmt in els {
                gen_statement(stmt, c)?;
            }
            c.start_block(&end_b);
            Ok(())
        }

        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            let start_b = c.block();
            let body_b = c.block();
            let end_b = c.block();
            c.loops.push(LoopBlocks {
                start: start_b.clone(),
                end: end_b.clone(),
            });

            if let Some(init) = init {
                gen_statement(init, c)?;
            }
            c.start_block(&start_b);
            if let Some(cond) = cond {
                let cond_op = gen_value(cond, c)?;
                c.insn(None, "jnz", &[cond_op, body_b.clone(), end_b.clone()]);
            }
            c.start_block(&body_b);
            for stmt in body {
                gen_statement(stmt, c)?;
            }
            if let Some(step) = step {
                gen_expression(step, c)?;
            }
            c.insn(None, "jmp", &[start_b.clone()]);
            c.start_block(&end_b);

            c.loops.pop();
            Ok(())
        }

        Stmt::Break => {
            let target = match c.loops.last() {
                Some(l) => l.end.clone(),
                None => return Err(CompileError::new("Break outside of loop")),
            };
            c.insn(None, "jmp", &[target]);
            // Code after a loop exit still needs a block to live in.
            let next = c.block();
            c.start_block(&next);
            Ok(())
        }

        Stmt::Continue => {
            let target = match c.loops.last() {
                Some(l) => l.start.clone(),
                None => return Err(CompileError::new("Continue outside of loop")),
            };
            c.insn(None, "jmp", &[target]);
            let next = c.block();
            c.start_block(&next);
            Ok(())
        }

        Stmt::Return(value) => {
            match (value, c.ret.clone()) {
                (Some(expr), Some(ret_ty)) => {
                    let ty = c.value_type(expr, "return")?;
                    let want = Type::Concrete(ret_ty);
                    if !compatible(&ty, &want) {
                        return Err(type_error("return", &ty, &want));
                    }
                    let op = gen_value(expr, c)?;
                    c.insn(None, "ret", &[op]);
                }
                (Some(_), None) => {
                    return Err(CompileError::new(
                        "Return with a value in a function returning none",
                    ));
                }
                (None, Some(_)) => {
                    return Err(CompileError::new(
                        "Return without a value in a function returning one",
                    ));
                }
                (None, None) => c.insn(None, "ret", &[]),
            }
            c.just_returned = true;
            Ok(())
        }

        Stmt::Expr(expr) => {
            if c.type_of(expr)?.is_some() {
                return Err(CompileError::new(
                    "Expression returning non-void cannot be used as statement",
                ));
            }
            gen_expression(expr, c)?;
            Ok(())
        }
    }
}

fn gen_value(expr: &Expr, c: &mut Compiler) -> Result<Operand, CompileError> {
    gen_expression(expr, c)?.ok_or_else(|| CompileError::new("Expression has no value"))
}

fn gen_expression(expr: &Expr, c: &mut Compiler) -> Result<Option<Operand>, CompileError> {
    let op = match expr {
        Expr::LValue(lv) => {
            let ty = c.lvalue_type(lv)?;
            if ty.is_composite() {
                // Composites are handled by address.
                Some(gen_pointer(lv, c)?)
            } else if ty.is_numeric() {
                let ptr = gen_pointer(lv, c)?;
                Some(gen_load(&ptr, &ty, c)?)
            } else {
                return Err(CompileError::new("Attempted load of non-numeric type"));
            }
        }

        Expr::Ref(lv) => {
            c.type_of(expr)?;
            Some(gen_pointer(lv, c)?)
        }

        Expr::Assign { target, value } => {
            if is_discard(target) {
                return gen_expression(value, c);
            }
            c.type_of(expr)?;
            let lty = c.lvalue_type(target)?;
            if !lty.is_numeric() {
                return Err(CompileError::new("Cannot assign values of non-numeric type"));
            }
            let ptr = gen_pointer(target, c)?;
            let val = gen_value(value, c)?;
            gen_store(&ptr, val, &lty, c);
            None
        }

        Expr::Mutate { op, target, value } => {
            let lty = Type::Concrete(c.lvalue_type(target)?);
            let rty = c.value_type(value, "mutation")?;
            let result = c.check_binary(&lty, &rty, "mutation")?;
            let target_ty = lty.concrete();
            if !target_ty.is_numeric() {
                return Err(CompileError::new("Cannot mutate values of non-numeric type"));
            }

            let ptr = gen_pointer(target, c)?;
            let current = gen_load(&ptr, &target_ty, c)?;
            let val = gen_value(value, c)?;
            let out = emit_binary(*op, &lty, current, &rty, val, &result, c)?;
            gen_store(&ptr, out, &target_ty, c);
            None
        }

        Expr::Call { func, args } => gen_call(func, args, c)?,

        Expr::Cast { value, ty } => {
            let src = c.value_type(value, "cast")?;
            let dst = c.resolve_type(ty)?;
            let (src_p, dst_p) = match (src.concrete().unwrapped(), dst.unwrapped()) {
                (ConcreteType::Primitive(s), ConcreteType::Primitive(d))
                    if !s.is_float() && !d.is_float() =>
                {
                    (*s, *d)
                }
                _ => {
                    return Err(CompileError::new(format!(
                        "Cannot cast {} to {}",
                        src, dst
                    )));
                }
            };

            let val = gen_value(value, c)?;
            if src_p.metrics().size >= dst_p.metrics().size {
                // Narrowing and same-width casts only retype the value.
                Some(val)
            } else {
                let opcode = format!(
                    "ext{}{}",
                    if src_p.signed() { "s" } else { "u" },
                    src_p.ir_name()
                );
                let out = c.temporary();
                let kind = dst_p.ir_base().to_string();
                c.insn(Some((&out, kind.as_str())), &opcode, &[val]);
                Some(out)
            }
        }

        Expr::Prefix { op, value } => {
            let ty = c.value_type(value, "prefix expression")?;
            let cty = ty.concrete();
            if !cty.is_numeric() {
                return Err(CompileError::new(
                    "Operand of prefix expression is of non-numeric type",
                ));
            }
            let base = base_letter(&cty)?;
            let val = gen_value(value, c)?;
            let out = c.temporary();
            let kind = base.to_string();
            match op {
                PrefixOp::Not => c.insn(
                    Some((&out, kind.as_str())),
                    &format!("ceq{}", base),
                    &[Operand::Const(0), val],
                ),
                PrefixOp::Inv => c.insn(Some((&out, kind.as_str())), "xor", &[Operand::Const(-1), val]),
                PrefixOp::Neg => c.insn(Some((&out, kind.as_str())), "sub", &[Operand::Const(0), val]),
                PrefixOp::Pos => c.insn(Some((&out, kind.as_str())), "copy", &[val]),
            }
            Some(out)
        }

        Expr::Binary { op, lhs, rhs } => {
            let lty = c.value_type(lhs, "binary expression")?;
            let rty = c.value_type(rhs, "binary expression")?;
            let result = c.check_binary(&lty, &rty, "binary expression")?;
            let l = gen_value(lhs, c)?;
            let r = gen_value(rhs, c)?;
            Some(emit_binary(*op, &lty, l, &rty, r, &result, c)?)
        }

        Expr::Boolean { op, lhs, rhs } => {
            let lty = c.value_type(lhs, "boolean expression")?;
            let rty = c.value_type(rhs, "boolean expression")?;
            let result = c.check_binary(&lty, &rty, "boolean expression")?;
            let kind = base_letter(&result.concrete())?.to_string();

            let out = c.temporary();
            let l = gen_value(lhs, c)?;
            c.insn(Some((&out, kind.as_str())), "copy", &[l]);

            let long_b = c.block();
            let short_b = c.block();
            match op {
                BooleanOp::And => {
                    c.insn(None, "jnz", &[out.clone(), long_b.clone(), short_b.clone()])
                }
                BooleanOp::Or => {
                    c.insn(None, "jnz", &[out.clone(), short_b.clone(), long_b.clone()])
                }
            }

            c.start_block(&long_b);
            let r = gen_value(rhs, c)?;
            c.insn(Some((&out, kind.as_str())), "copy", &[r]);
            c.start_block(&short_b);
            Some(out)
        }

        Expr::IntLit(text) => Some(Operand::Const(
            decode_int(text).ok_or_else(|| CompileError::new("Invalid integer literal"))?,
        )),
        Expr::FloatLit(_) => {
            return Err(CompileError::new("Float literals are not supported yet"));
        }
        Expr::StringLit(bytes) => Some(c.intern_string(bytes)),
        Expr::RuneLit(ch) => Some(Operand::Const(*ch as i64)),
    };
    Ok(op)
}

fn gen_pointer(lv: &LValue, c: &mut Compiler) -> Result<Operand, CompileError> {
    match lv {
        LValue::Var(name) => Ok(c.variable(name)?.location),

        LValue::Deref(expr) => {
            c.lvalue_type(lv)?;
            gen_value(expr, c)
        }

        LValue::Access { base, field } => {
            if let Some(var) = c.ns_member(base, field) {
                return Ok(var.location);
            }

            let mut ty = c.lvalue_type(base)?;
            let mut ptr = gen_pointer(base, c)?;
            // Pointers to composites are loaded through implicitly.
            loop {
                let inner = match ty.unwrapped() {
                    ConcreteType::Pointer(Some(inner)) => (**inner).clone(),
                    _ => break,
                };
                let loaded = c.temporary();
                c.insn(Some((&loaded, "l")), "loadl", &[ptr]);
                ptr = loaded;
                ty = inner;
            }

            if !ty.is_composite() {
                return Err(CompileError::new("Field access of non-composite type"));
            }
            let (offset, _) = ty
                .field(field)
                .ok_or_else(|| CompileError::new(format!("No field '{}' in {}", field, ty)))?;
            if offset > 0 {
                let shifted = c.temporary();
                c.insn(
                    Some((&shifted, "l")),
                    "add",
                    &[ptr, Operand::Const(offset as i64)],
                );
                ptr = shifted;
            }
            Ok(ptr)
        }
    }
}

fn gen_call(
    func: &Expr,
    args: &[Expr],
    c: &mut Compiler,
) -> Result<Option<Operand>, CompileError> {
    let (signature, via_pointer) = c.callee_type(func)?;
    let name = call_name(func);

    let target = if via_pointer {
        gen_value(func, c)?
    } else {
        match func {
            Expr::LValue(lv) => gen_pointer(lv, c)?,
            _ => gen_value(func, c)?,
        }
    };

    if args.len() < signature.params.len()
        || (args.len() > signature.params.len() && !signature.variadic)
    {
        return Err(CompileError::new(format!(
            "Wrong number of arguments in call to {}",
            name
        )));
    }

    let ctx = format!("call to {}", name);
    let mut call_args = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let arg_ty = c.value_type(arg, &ctx)?;
        let tag = match signature.params.get(i) {
            Some(param) => {
                let want = Type::Concrete(param.clone());
                if !compatible(&arg_ty, &want) {
                    return Err(type_error(&ctx, &arg_ty, &want));
                }
                param.ir_type_name()
            }
            // Extra variadic arguments carry their own type.
            None => arg_ty.concrete().ir_type_name(),
        };
        let op = gen_value(arg, c)?;
        call_args.push((tag, op));
    }

    let call = Operand::Call {
        func: Box::new(target),
        args: call_args,
    };
    match signature.ret {
        None => {
            c.insn(None, "call", &[call]);
            Ok(None)
        }
        Some(ret) => {
            let kind = match ret.ir_base_type() {
                Some(letter) => letter.to_string(),
                None => ret.ir_type_name(),
            };
            let out = c.temporary();
            c.insn(Some((&out, kind.as_str())), "call", &[call]);
            Ok(Some(out))
        }
    }
}

fn call_name(func: &Expr) -> String {
    fn lv_name(lv: &LValue) -> Option<String> {
        match lv {
            LValue::Var(name) => Some(name.clone()),
            LValue::Access { base, field } => Some(format!("{}.{}", lv_name(base)?, field)),
            LValue::Deref(_) => None,
        }
    }
    match func {
        Expr::LValue(lv) => lv_name(lv).unwrap_or_else(|| String::from("function")),
        _ => String::from("function"),
    }
}

fn gen_load(ptr: &Operand, ty: &ConcreteType, c: &mut Compiler) -> Result<Operand, CompileError> {
    let base = base_letter(ty)?;
    let ext = ty.ir_type_name();

    let mut opcode = String::from("load");
    if ext != base.to_string() {
        opcode.push(if ty.is_signed() { 's' } else { 'u' });
    }
    opcode.push_str(&ext);

    let out = c.temporary();
    c.insn(Some((&out, base.to_string().as_str())), &opcode, &[ptr.clone()]);
    Ok(out)
}

fn gen_store(ptr: &Operand, val: Operand, ty: &ConcreteType, c: &mut Compiler) {
    c.insn(
        None,
        &format!("store{}", ty.ir_type_name()),
        &[val, ptr.clone()],
    );
}

/// Emits one two-operand operation: scales the index side of pointer
/// arithmetic, widens a narrower integer operand, then selects the opcode
/// by operation and signedness.
fn emit_binary(
    op: BinaryOp,
    lty: &Type,
    l: Operand,
    rty: &Type,
    r: Operand,
    result: &Type,
    c: &mut Compiler,
) -> Result<Operand, CompileError> {
    let result_ty = result.concrete();
    let base = base_letter(&result_ty)?;

    let lptr = is_pointer(lty);
    let rptr = is_pointer(rty);
    let (l, r) = if lptr && !rptr {
        (l, scale_index(&result_ty, rty, r, c))
    } else if rptr && !lptr {
        (scale_index(&result_ty, lty, l, c), r)
    } else {
        (extend(lty, l, base, c), extend(rty, r, base, c))
    };

    let opcode = opcode_for(op, &result_ty, base);
    let out = c.temporary();
    c.insn(Some((&out, base.to_string().as_str())), &opcode, &[l, r]);
    Ok(out)
}

/// Pointer arithmetic counts in elements: the numeric side is multiplied
/// by the pointee size. Byte-sized pointees and the generic pointer need
/// no multiply.
fn scale_index(ptr_ty: &ConcreteType, index_ty: &Type, index: Operand, c: &mut Compiler) -> Operand {
    let index = extend(index_ty, index, 'l', c);
    let size = match ptr_ty.unwrapped() {
        ConcreteType::Pointer(Some(to)) => to.metrics().size,
        _ => 1,
    };
    if size <= 1 {
        return index;
    }
    let out = c.temporary();
    c.insn(
        Some((&out, "l")),
        "mul",
        &[Operand::Const(size as i64), index],
    );
    out
}

/// Widens a word-sized operand to long when the operation computes in
/// longs. Literals are immediates and need no widening.
fn extend(ty: &Type, op: Operand, target: char, c: &mut Compiler) -> Operand {
    let Type::Concrete(cty) = ty else {
        return op;
    };
    let Some(from) = cty.ir_base_type() else {
        return op;
    };
    if from == target || target != 'l' || from != 'w' {
        return op;
    }

    let ext_name = match cty.unwrapped() {
        ConcreteType::Primitive(p) => p.ir_name(),
        _ => "w",
    };
    let opcode = format!(
        "ext{}{}",
        if cty.is_signed() { "s" } else { "u" },
        ext_name
    );
    let out = c.temporary();
    c.insn(Some((&out, "l")), &opcode, &[op]);
    out
}

fn opcode_for(op: BinaryOp, ty: &ConcreteType, base: char) -> String {
    let signed = ty.is_signed();
    let sign = if signed { 's' } else { 'u' };
    match op {
        BinaryOp::Add => String::from("add"),
        BinaryOp::Sub => String::from("sub"),
        BinaryOp::Mul => String::from("mul"),
        BinaryOp::Div => String::from(if signed { "div" } else { "udiv" }),
        BinaryOp::Mod => String::from(if signed { "rem" } else { "urem" }),
        BinaryOp::Or => String::from("or"),
        BinaryOp::Xor => String::from("xor"),
        BinaryOp::And => String::from("and"),
        BinaryOp::Shl => String::from("shl"),
        BinaryOp::Shr => String::from(if signed { "sar" } else { "shr" }),
        BinaryOp::Eq => format!("ceq{}", base),
        BinaryOp::Ne => format!("cne{}", base),
        BinaryOp::Lt => format!("c{}lt{}", sign, base),
        BinaryOp::Gt => format!("c{}gt{}", sign, base),
        BinaryOp::Le => format!("c{}le{}", sign, base),
        BinaryOp::Ge => format!("c{}ge{}", sign, base),
    }
}

fn base_letter(ty: &ConcreteType) -> Result<char, CompileError> {
    ty.ir_base_type()
        .ok_or_else(|| CompileError::new("Attempted load of non-numeric type"))
}

impl Compiler {
    /// Zero-initializes freshly allocated storage, recursing through
    /// composite types with the same offset math the layout uses.
    pub(crate) fn gen_zero(
        &mut self,
        ty: &ConcreteType,
        ptr: &Operand,
    ) -> Result<(), CompileError> {
        match ty.unwrapped() {
            ConcreteType::Primitive(_) | ConcreteType::Pointer(_) => {
                self.insn(
                    None,
                    &format!("store{}", ty.ir_type_name()),
                    &[Operand::Const(0), ptr.clone()],
                );
                Ok(())
            }
            ConcreteType::Struct(composite) => {
                for (offset, field) in composite.offsets() {
                    let field_ptr = self.offset_pointer(ptr, offset);
                    self.gen_zero(&field.ty, &field_ptr)?;
                }
                Ok(())
            }
            ConcreteType::Union(composite) => match composite.largest_field() {
                Some(field) => self.gen_zero(&field.ty, ptr),
                None => Ok(()),
            },
            ConcreteType::Array { elem, len } => {
                let size = elem.metrics().size;
                for i in 0..*len {
                    let elem_ptr = self.offset_pointer(ptr, i * size);
                    self.gen_zero(elem, &elem_ptr)?;
                }
                Ok(())
            }
            ConcreteType::Func(_) => Err(CompileError::new("Cannot create value of function type")),
            ConcreteType::Named { .. } => unreachable!(),
        }
    }

    fn offset_pointer(&mut self, ptr: &Operand, offset: u64) -> Operand {
        if offset == 0 {
            return ptr.clone();
        }
        let out = self.temporary();
        self.insn(
            Some((&out, "l")),
            "add",
            &[ptr.clone(), Operand::Const(offset as i64)],
        );
        out
    }
}
