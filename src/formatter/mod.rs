use crate::parser::ast::{
    Expr, LValue, Program, Stmt, Toplevel, TypeExpr, VarDecl, VarsDecl,
};

/// Re-serializes a program to source text. The output is canonical: running
/// the formatter over its own output is a fixed point, which the round-trip
/// tests rely on.
pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    for toplevel in program {
        out.push_str(&format_toplevel(toplevel, 0));
        out.push('\n');
    }
    out
}

fn format_toplevel(toplevel: &Toplevel, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match toplevel {
        Toplevel::Function {
            public,
            name,
            params,
            ret,
            body,
        } => {
            let mut out = String::from(&pad);
            if *public {
                out.push_str("pub ");
            }
            out.push_str(&format!("fn {}(", name));
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format!("{} {}", param.name, format_type(&param.ty)));
            }
            out.push(')');
            if let Some(ret) = ret {
                out.push(' ');
                out.push_str(&format_type(ret));
            }
            out.push_str(" {");
            push_block(&mut out, body, indent, &pad);
            out
        }

        Toplevel::Vars(decl) => format!("{}{}", pad, format_vars(decl)),

        Toplevel::TypeDef { name, ty } => format!("{}type {} {}", pad, name, format_type(ty)),
        Toplevel::TypeAlias { name, ty } => {
            format!("{}type {} = {}", pad, name, format_type(ty))
        }

        Toplevel::Namespace { name, body } => {
            let mut out = format!("{}ns {} {{", pad, name);
            if body.is_empty() {
                out.push('}');
                return out;
            }
            out.push('\n');
            for toplevel in body {
                out.push_str(&format_toplevel(toplevel, indent + 1));
                out.push('\n');
            }
            out.push_str(&format!("{}}}", pad));
            out
        }
    }
}

fn format_vars(decl: &VarsDecl) -> String {
    // A bare function type only arises from a bodyless `fn` declaration;
    // print it back in that form so it re-parses identically.
    if let TypeExpr::Func {
        variadic,
        params,
        ret,
    } = &decl.ty
    {
        if let Some(name) = decl.names.first() {
            let mut out = String::new();
            if *variadic {
                out.push_str("variadic ");
            }
            out.push_str(&format!("fn {}(", name));
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format_type(param));
            }
            out.push(')');
            if let Some(ret) = ret {
                out.push(' ');
                out.push_str(&format_type(ret));
            }
            return out;
        }
    }

    let mut out = String::new();
    if decl.external {
        out.push_str("extern ");
    }
    out.push_str("var ");
    out.push_str(&decl.names.join(", "));
    out.push(' ');
    out.push_str(&format_type(&decl.ty));
    out
}

fn format_statement(stmt: &Stmt, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match stmt {
        Stmt::Vars(decl) => format!("{}{}", pad, format_vars(decl)),

        Stmt::If { cond, then, els } => {
            let mut out = format!("{}if {} {{", pad, format_expr(cond));
            push_block(&mut out, then, indent, &pad);

            if !els.is_empty() {
                if els.len() == 1 {
                    if let Stmt::If { .. } = els[0] {
                        out.push_str(" else ");
                        out.push_str(format_statement(&els[0], indent).trim_start());
                        return out;
                    }
                }
                out.push_str(" else {");
                push_block(&mut out, els, indent, &pad);
            }
            out
        }

        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            let mut out = format!("{}for", pad);
            match (init, cond, step) {
                (None, None, None) => {}
                (None, Some(cond), None) => {
                    out.push_str(&format!(" {}", format_expr(cond)));
                }
                _ => {
                    out.push(' ');
                    if let Some(init) = init {
                        out.push_str(format_statement(init, 0).trim_start());
                    }
                    out.push(';');
                    if let Some(cond) = cond {
                        out.push_str(&format!(" {}", format_expr(cond)));
                    }
                    out.push(';');
                    if let Some(step) = step {
                        out.push_str(&format!(" {}", format_expr(step)));
                    }
                }
            }
            out.push_str(" {");
            push_block(&mut out, body, indent, &pad);
            out
        }

        Stmt::Break => format!("{}break", pad),
        Stmt::Continue => format!("{}continue", pad),

        Stmt::Return(None) => format!("{}return", pad),
        Stmt::Return(Some(value)) => format!("{}return {}", pad, format_expr(value)),

        Stmt::Expr(expr) => format!("{}{}", pad, format_expr(expr)),
    }
}

fn push_block(out: &mut String, body: &[Stmt], indent: usize, pad: &str) {
    if body.is_empty() {
        out.push('}');
        return;
    }
    out.push('\n');
    for stmt in body {
        out.push_str(&format_statement(stmt, indent + 1));
        out.push('\n');
    }
    out.push_str(&format!("{}}}", pad));
}

pub fn format_expr(expr: &Expr) -> String {
    match expr {
        Expr::LValue(lv) => format_lvalue(lv),
        Expr::Ref(lv) => format!("&{}", format_lvalue(lv)),

        Expr::Assign { target, value } => {
            format!("{} = {}", format_lvalue(target), format_expr(value))
        }
        Expr::Mutate { op, target, value } => format!(
            "{} {}= {}",
            format_lvalue(target),
            op.symbol(),
            format_expr(value)
        ),

        Expr::Call { func, args } => {
            let mut out = format!("{}(", format_expr(func));
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format_expr(arg));
            }
            out.push(')');
            out
        }

        Expr::Cast { value, ty } => {
            format!("cast({}, {})", format_expr(value), format_type(ty))
        }

        Expr::Prefix { op, value } => format!("{}{}", op.symbol(), format_expr(value)),

        Expr::Binary { op, lhs, rhs } => format!(
            "({} {} {})",
            format_expr(lhs),
            op.symbol(),
            format_expr(rhs)
        ),
        Expr::Boolean { op, lhs, rhs } => format!(
            "({} {} {})",
            format_expr(lhs),
            op.symbol(),
            format_expr(rhs)
        ),

        Expr::IntLit(text) => text.clone(),
        Expr::FloatLit(text) => text.clone(),
        Expr::StringLit(bytes) => format_string(bytes),
        Expr::RuneLit(c) => format_rune(*c),
    }
}

fn format_lvalue(lv: &LValue) -> String {
    match lv {
        LValue::Var(name) => name.clone(),
        LValue::Deref(expr) => format!("[{}]", format_expr(expr)),
        LValue::Access { base, field } => format!("{}.{}", format_lvalue(base), field),
    }
}

pub fn format_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named(name) => name.clone(),
        TypeExpr::Namespaced(path) => path.join("."),
        TypeExpr::Pointer(None) => String::from("[]"),
        // A pointed-to function type came from `fn(…)` syntax; print it
        // back that way.
        TypeExpr::Pointer(Some(inner)) => match inner.as_ref() {
            TypeExpr::Func { .. } => format_type(inner),
            _ => format!("[{}]", format_type(inner)),
        },
        TypeExpr::Array { elem, len } => format!("[{} {}]", format_type(elem), len),
        TypeExpr::Func {
            variadic,
            params,
            ret,
        } => {
            let mut out = String::new();
            if *variadic {
                out.push_str("variadic ");
            }
            out.push_str("fn(");
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&format_type(param));
            }
            out.push(')');
            if let Some(ret) = ret {
                out.push(' ');
                out.push_str(&format_type(ret));
            }
            out
        }
        TypeExpr::Struct(fields) => format!("struct {}", format_fields(fields)),
        TypeExpr::Union(fields) => format!("union {}", format_fields(fields)),
    }
}

fn format_fields(fields: &[VarDecl]) -> String {
    let mut out = String::from("{ ");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        out.push_str(&format!("{} {}", field.name, format_type(&field.ty)));
    }
    out.push_str(" }");
    out
}

fn format_string(bytes: &[u8]) -> String {
    let mut out = String::from("\"");
    for &b in bytes {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x1b => out.push_str("\\e"),
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out.push('"');
    out
}

fn format_rune(c: char) -> String {
    let escaped = match c {
        '\n' => String::from("\\n"),
        '\r' => String::from("\\r"),
        '\t' => String::from("\\t"),
        '\x1b' => String::from("\\e"),
        '\'' => String::from("\\'"),
        '\\' => String::from("\\\\"),
        ' '..='~' => c.to_string(),
        _ if (c as u32) <= 0xff => format!("\\x{:02x}", c as u32),
        _ if (c as u32) <= 0xffff => format!("\\u{:04x}", c as u32),
        _ => format!("\\U{:08x}", c as u32),
    };
    format!("'{}'", escaped)
}
