mod check;
mod gen;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;

use crate::parser::ast::Program;
use types::{CompositeLayout, ConcreteType};

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for CompileError {}

/// Compiles a parsed program to IR text.
pub fn compile(program: &Program) -> Result<String, CompileError> {
    let mut compiler = Compiler::new();
    gen::gen_program(program, &mut compiler)?;
    Ok(compiler.finish())
}

/// One IR value or reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Temp(u32),
    Global(String),
    Block(u32),
    Const(i64),
    /// A call with its typed argument list; only ever used as the sole
    /// operand of a `call` instruction.
    Call {
        func: Box<Operand>,
        args: Vec<(String, Operand)>,
    },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(n) => write!(f, "%t{}", n),
            Operand::Global(name) => write!(f, "${}", name),
            Operand::Block(n) => write!(f, "@b{}", n),
            Operand::Const(v) => write!(f, "{}", v),
            Operand::Call { func, args } => {
                write!(f, "{}(", func)?;
                for (i, (ty, op)) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", ty, op)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A declared name: where it lives and what type it has.
#[derive(Debug, Clone)]
pub struct Variable {
    pub location: Operand,
    pub ty: ConcreteType,
}

pub(crate) struct LoopBlocks {
    pub start: Operand,
    pub end: Operand,
}

/// The IR emitter. Owns the scope, the interning tables and the per-function
/// counters, and writes one line of IR at a time into an output buffer.
pub struct Compiler {
    out: String,

    temp: u32,
    blk: u32,
    /// Set right after a `ret` is emitted, so an enclosing `if` branch can
    /// suppress its dead fallthrough jump.
    pub(crate) just_returned: bool,

    /// Innermost scope last; the first entry holds globals.
    scopes: Vec<HashMap<String, Variable>>,
    /// Current namespace path.
    prefix: Vec<String>,
    namespaces: HashSet<String>,
    pub(crate) loops: Vec<LoopBlocks>,

    types: HashMap<String, ConcreteType>,
    /// Kept sorted by layout identifier so emission is deterministic.
    composites: Vec<CompositeLayout>,
    strings: Vec<Vec<u8>>,
    string_index: HashMap<Vec<u8>, usize>,

    /// Return type of the function currently being generated.
    pub(crate) ret: Option<ConcreteType>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        use types::Primitive::*;
        let mut types = HashMap::new();
        for p in [I64, I32, I16, I8, U64, U32, U16, U8, F64, F32, Bool] {
            types.insert(p.name().to_string(), ConcreteType::Primitive(p));
        }

        Self {
            out: String::new(),
            temp: 0,
            blk: 0,
            just_returned: false,
            scopes: vec![HashMap::new()],
            prefix: Vec::new(),
            namespaces: HashSet::new(),
            loops: Vec::new(),
            types,
            composites: Vec::new(),
            strings: Vec::new(),
            string_index: HashMap::new(),
            ret: None,
        }
    }

    pub(crate) fn temporary(&mut self) -> Operand {
        self.temp += 1;
        Operand::Temp(self.temp)
    }

    pub(crate) fn block(&mut self) -> Operand {
        self.blk += 1;
        Operand::Block(self.blk)
    }

    pub(crate) fn start_block(&mut self, block: &Operand) {
        self.out.push_str(&format!("{}\n", block));
        self.just_returned = false;
    }

    /// Writes one instruction line. With a destination the line reads
    /// `%tN =k opcode …`, without one just `opcode …`.
    pub(crate) fn insn(&mut self, dst: Option<(&Operand, &str)>, opcode: &str, operands: &[Operand]) {
        let mut body = String::from(opcode);
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                body.push(',');
            }
            body.push(' ');
            body.push_str(&operand.to_string());
        }

        match dst {
            Some((dst, kind)) => self.out.push_str(&format!("\t{} ={} {}\n", dst, kind, body)),
            None => self.out.push_str(&format!("\t{}\n", body)),
        }
    }

    pub(crate) fn start_function(
        &mut self,
        export: bool,
        name: &str,
        params: &[(String, ConcreteType)],
        ret: Option<&ConcreteType>,
    ) -> Result<(), CompileError> {
        let mut header = String::new();
        if export {
            header.push_str("export ");
        }
        header.push_str("function ");
        if let Some(ret) = ret {
            header.push_str(&ret.ir_type_name());
            header.push(' ');
        }
        header.push_str(&format!("${}(", name));

        let mut incoming = Vec::with_capacity(params.len());
        for (i, (_, ty)) in params.iter().enumerate() {
            if i > 0 {
                header.push_str(", ");
            }
            let tmp = self.temporary();
            header.push_str(&format!("{} {}", ty.ir_type_name(), tmp));
            incoming.push(tmp);
        }
        header.push_str(") {\n@start\n");
        self.out.push_str(&header);

        self.scopes.push(HashMap::new());
        for ((name, ty), tmp) in params.iter().zip(incoming) {
            // Register-sized parameters get a stack slot so they are
            // addressable; aggregates already arrive as an address.
            let location = if ty.ir_base_type().is_some() {
                let loc = self.temporary();
                self.alloc_local(&loc, ty)?;
                self.insn(None, &format!("store{}", ty.ir_type_name()), &[tmp, loc.clone()]);
                loc
            } else {
                tmp
            };
            self.bind(
                name.clone(),
                Variable {
                    location,
                    ty: ty.clone(),
                },
            )?;
        }

        Ok(())
    }

    pub(crate) fn end_function(&mut self) {
        self.out.push_str("}\n");
        self.temp = 0;
        self.blk = 0;
        self.just_returned = false;
        self.ret = None;
        self.scopes.pop();
    }

    pub(crate) fn enter_namespace(&mut self, name: &str) {
        self.prefix.push(name.to_string());
        self.namespaces.insert(self.prefix.join("."));
    }

    pub(crate) fn exit_namespace(&mut self) {
        self.prefix.pop();
    }

    pub(crate) fn is_namespace(&self, path: &str) -> bool {
        self.namespaces.contains(path)
    }

    /// Prepends the current namespace path to a declared name.
    fn qualify(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix.join("."), name)
        }
    }

    pub(crate) fn declare_global(
        &mut self,
        name: &str,
        ty: ConcreteType,
    ) -> Result<Variable, CompileError> {
        let qualified = self.qualify(name);
        if self.scopes[0].contains_key(&qualified) {
            return Err(CompileError::new("Variable already exists"));
        }
        let var = Variable {
            location: Operand::Global(qualified.clone()),
            ty,
        };
        self.scopes[0].insert(qualified, var.clone());
        Ok(var)
    }

    pub(crate) fn declare_local(
        &mut self,
        name: &str,
        ty: ConcreteType,
    ) -> Result<Variable, CompileError> {
        if self.lookup(name).is_some() {
            return Err(CompileError::new("Variable already exists"));
        }
        if ty.metrics().size == 0 {
            return Err(CompileError::new("Cannot create value of function type"));
        }

        let loc = self.temporary();
        self.alloc_local(&loc, &ty)?;
        self.gen_zero(&ty, &loc)?;

        let var = Variable {
            location: loc,
            ty,
        };
        self.bind(name.to_string(), var.clone())?;
        Ok(var)
    }

    fn bind(&mut self, name: String, var: Variable) -> Result<(), CompileError> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name) {
                return Err(CompileError::new("Variable already exists"));
            }
            scope.insert(name, var);
        }
        Ok(())
    }

    fn alloc_local(&mut self, loc: &Operand, ty: &ConcreteType) -> Result<(), CompileError> {
        let m = ty.metrics();
        let op = match m.align {
            0..=4 => "alloc4",
            5..=8 => "alloc8",
            9..=16 => "alloc16",
            _ => return Err(CompileError::new("Invalid alignment")),
        };
        self.insn(Some((loc, "l")), op, &[Operand::Const(m.size as i64)]);
        Ok(())
    }

    /// Resolves a name: function scopes innermost-first, then globals under
    /// each enclosing namespace prefix, longest first, then bare globals.
    pub(crate) fn variable(&self, name: &str) -> Result<Variable, CompileError> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| CompileError::new("Undefined variable"))
    }

    fn lookup(&self, name: &str) -> Option<&Variable> {
        for scope in self.scopes.iter().rev() {
            if let Some(var) = scope.get(name) {
                return Some(var);
            }
        }
        for i in (1..=self.prefix.len()).rev() {
            let key = format!("{}.{}", self.prefix[..i].join("."), name);
            if let Some(var) = self.scopes[0].get(&key) {
                return Some(var);
            }
        }
        None
    }

    /// Resolves a fully-qualified global, bypassing namespace search.
    pub(crate) fn global(&self, qualified: &str) -> Option<&Variable> {
        self.scopes[0].get(qualified)
    }

    pub(crate) fn define_type(
        &mut self,
        name: &str,
        ty: ConcreteType,
    ) -> Result<(), CompileError> {
        let qualified = self.qualify(name);
        let named = ConcreteType::Named {
            name: qualified.clone(),
            inner: Box::new(ty),
        };
        self.install_type(qualified, named)
    }

    pub(crate) fn alias_type(&mut self, name: &str, ty: ConcreteType) -> Result<(), CompileError> {
        self.install_type(self.qualify(name), ty)
    }

    fn install_type(&mut self, name: String, ty: ConcreteType) -> Result<(), CompileError> {
        if self.types.contains_key(&name) {
            return Err(CompileError::new("Type already exists"));
        }
        self.types.insert(name, ty);
        Ok(())
    }

    pub(crate) fn type_by_name(&self, name: &str) -> Result<ConcreteType, CompileError> {
        for i in (0..=self.prefix.len()).rev() {
            let key = if i == 0 {
                name.to_string()
            } else {
                format!("{}.{}", self.prefix[..i].join("."), name)
            };
            if let Some(ty) = self.types.get(&key) {
                return Ok(ty.clone());
            }
        }
        Err(CompileError::new("Undefined type"))
    }

    /// Returns the global holding the given string payload, adding a new
    /// `$strN` entry for payloads not seen before.
    pub(crate) fn intern_string(&mut self, bytes: &[u8]) -> Operand {
        let index = match self.string_index.get(bytes) {
            Some(index) => *index,
            None => {
                let index = self.strings.len();
                self.strings.push(bytes.to_vec());
                self.string_index.insert(bytes.to_vec(), index);
                index
            }
        };
        Operand::Global(format!("str{}", index))
    }

    /// Records an aggregate layout, keeping the table sorted by identifier;
    /// identical layouts share one entry. Returns the `:name`.
    pub(crate) fn intern_composite(&mut self, layout: CompositeLayout) -> String {
        let ident = layout.ident();
        match self
            .composites
            .binary_search_by(|existing| existing.ident().cmp(&ident))
        {
            Ok(_) => {}
            Err(pos) => self.composites.insert(pos, layout),
        }
        ident
    }

    /// Flushes interned strings and aggregate type declarations and hands
    /// back the complete IR text.
    pub(crate) fn finish(mut self) -> String {
        for (i, bytes) in self.strings.iter().enumerate() {
            self.out
                .push_str(&format!("data $str{} = {}\n", i, format_data(bytes)));
        }
        for layout in &self.composites {
            self.out.push_str(&layout.decl());
            self.out.push('\n');
        }
        self.out
    }
}

/// Formats a string payload as an IR data definition body: printable ASCII
/// runs quoted, everything else (plus '"' and '\\', which would break the
/// quoting) as numeric bytes, with a terminating zero.
fn format_data(bytes: &[u8]) -> String {
    let mut out = String::from("{");
    let mut in_str = false;
    let mut first = true;
    for &b in bytes.iter().chain(std::iter::once(&0)) {
        if (b' '..=b'~').contains(&b) && b != b'"' && b != b'\\' {
            if !in_str {
                if !first {
                    out.push(',');
                }
                out.push_str(" b \"");
                in_str = true;
            }
            out.push(b as char);
        } else {
            if in_str {
                out.push('"');
                in_str = false;
            }
            if !first {
                out.push(',');
            }
            out.push_str(&format!(" b {}", b));
        }
        first = false;
    }
    if in_str {
        out.push('"');
    }
    out.push_str(" }");
    out
}
