use std::fmt;

/// The type of an expression: either concrete, or one of the two literal
/// types that coerce into a concrete type at first use.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    IntLit,
    FloatLit,
    Concrete(ConcreteType),
}

impl Type {
    pub fn is_concrete(&self) -> bool {
        matches!(self, Type::Concrete(_))
    }

    /// The concrete type this type resolves to when nothing else fixes one:
    /// integer literals widen to I64, float literals to F64.
    pub fn concrete(&self) -> ConcreteType {
        match self {
            Type::IntLit => ConcreteType::Primitive(Primitive::I64),
            Type::FloatLit => ConcreteType::Primitive(Primitive::F64),
            Type::Concrete(ty) => ty.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::IntLit => write!(f, "integer literal"),
            Type::FloatLit => write!(f, "float literal"),
            Type::Concrete(ty) => write!(f, "{}", ty),
        }
    }
}

/// Equality plus literal coercion: a literal type is interchangeable with
/// the other literal type and with every primitive.
pub fn compatible(a: &Type, b: &Type) -> bool {
    if a == b {
        return true;
    }
    matches!(
        (a, b),
        (Type::IntLit | Type::FloatLit, Type::IntLit | Type::FloatLit)
            | (
                Type::IntLit | Type::FloatLit,
                Type::Concrete(ConcreteType::Primitive(_))
            )
            | (
                Type::Concrete(ConcreteType::Primitive(_)),
                Type::IntLit | Type::FloatLit
            )
    )
}

#[derive(Debug, Clone)]
pub enum ConcreteType {
    Primitive(Primitive),
    /// `None` is the generic pointer `[]`.
    Pointer(Option<Box<ConcreteType>>),
    Func(FuncType),
    /// Nominal wrapper: compares by name only.
    Named {
        name: String,
        inner: Box<ConcreteType>,
    },
    Struct(Composite),
    Union(Composite),
    Array {
        elem: Box<ConcreteType>,
        len: u64,
    },
}

impl PartialEq for ConcreteType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConcreteType::Primitive(a), ConcreteType::Primitive(b)) => a == b,
            // The generic pointer is equal to every pointer type.
            (ConcreteType::Pointer(a), ConcreteType::Pointer(b)) => match (a, b) {
                (None, _) | (_, None) => true,
                (Some(a), Some(b)) => a == b,
            },
            (ConcreteType::Func(a), ConcreteType::Func(b)) => a == b,
            (ConcreteType::Named { name: a, .. }, ConcreteType::Named { name: b, .. }) => a == b,
            (ConcreteType::Struct(a), ConcreteType::Struct(b)) => a == b,
            (ConcreteType::Union(a), ConcreteType::Union(b)) => a == b,
            (
                ConcreteType::Array { elem: a, len: n },
                ConcreteType::Array { elem: b, len: m },
            ) => n == m && a == b,
            _ => false,
        }
    }
}

impl ConcreteType {
    pub fn pointer_to(inner: ConcreteType) -> ConcreteType {
        ConcreteType::Pointer(Some(Box::new(inner)))
    }

    /// Strips nominal wrappers.
    pub fn unwrapped(&self) -> &ConcreteType {
        match self {
            ConcreteType::Named { inner, .. } => inner.unwrapped(),
            other => other,
        }
    }

    /// Numeric types are the ones that fit in a register: primitives and
    /// pointers. Only these can be loaded, stored and operated on directly.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.unwrapped(),
            ConcreteType::Primitive(_) | ConcreteType::Pointer(_)
        )
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self.unwrapped(),
            ConcreteType::Struct(_) | ConcreteType::Union(_) | ConcreteType::Array { .. }
        )
    }

    pub fn is_signed(&self) -> bool {
        match self.unwrapped() {
            ConcreteType::Primitive(p) => p.signed(),
            _ => false,
        }
    }

    pub fn metrics(&self) -> Metrics {
        match self {
            ConcreteType::Primitive(p) => p.metrics(),
            ConcreteType::Pointer(_) => Metrics { size: 8, align: 8 },
            // A value of function type cannot be created.
            ConcreteType::Func(_) => Metrics { size: 0, align: 0 },
            ConcreteType::Named { inner, .. } => inner.metrics(),
            ConcreteType::Struct(c) => c.struct_metrics(),
            ConcreteType::Union(c) => match c.largest_field() {
                Some(field) => field.ty.metrics(),
                None => Metrics { size: 0, align: 0 },
            },
            ConcreteType::Array { elem, len } => {
                let m = elem.metrics();
                Metrics {
                    size: m.size * len,
                    align: m.align,
                }
            }
        }
    }

    /// The IR name this type is written as in parameter lists, call
    /// argument tags and load/store suffixes: a base or extended type
    /// letter for register-sized types, an interned `:name` for aggregates.
    pub fn ir_type_name(&self) -> String {
        match self.unwrapped() {
            ConcreteType::Primitive(p) => p.ir_name().to_string(),
            ConcreteType::Pointer(_) | ConcreteType::Func(_) => "l".to_string(),
            ConcreteType::Struct(_) | ConcreteType::Union(_) | ConcreteType::Array { .. } => {
                self.layout().ident()
            }
            ConcreteType::Named { .. } => unreachable!(),
        }
    }

    /// The base type letter of the register an instruction producing this
    /// type assigns to. Sub-word integers promote to 'w'; aggregates have
    /// no base type.
    pub fn ir_base_type(&self) -> Option<char> {
        match self.unwrapped() {
            ConcreteType::Primitive(p) => Some(p.ir_base()),
            ConcreteType::Pointer(_) => Some('l'),
            _ => None,
        }
    }

    /// Looks up a field by name, returning its byte offset and type.
    pub fn field(&self, name: &str) -> Option<(u64, ConcreteType)> {
        match self.unwrapped() {
            ConcreteType::Struct(c) => c
                .offsets()
                .into_iter()
                .find(|(_, field)| field.name == name)
                .map(|(offset, field)| (offset, field.ty.clone())),
            ConcreteType::Union(c) => c
                .fields
                .iter()
                .find(|field| field.name == name)
                .map(|field| (0, field.ty.clone())),
            _ => None,
        }
    }

    /// The aggregate layout of this type, used both for `type :name = …`
    /// declarations and for deterministic interning.
    pub fn layout(&self) -> CompositeLayout {
        let mut entries: Vec<LayoutEntry> = Vec::new();
        let mut push = |ty: String, n: u64| {
            if let Some(last) = entries.last_mut() {
                if last.ty == ty {
                    last.n += n;
                    return;
                }
            }
            entries.push(LayoutEntry { ty, n });
        };

        match self.unwrapped() {
            ConcreteType::Struct(c) => {
                for field in &c.fields {
                    match field.ty.unwrapped() {
                        // Array fields flatten into a repeat count.
                        ConcreteType::Array { elem, len } => push(elem.ir_type_name(), *len),
                        other => push(other.ir_type_name(), 1),
                    }
                }
            }
            ConcreteType::Union(c) => match c.largest_field() {
                Some(field) => return field.ty.layout(),
                None => {}
            },
            ConcreteType::Array { elem, len } => push(elem.ir_type_name(), *len),
            other => push(other.ir_type_name(), 1),
        }

        CompositeLayout(entries)
    }
}

impl fmt::Display for ConcreteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcreteType::Primitive(p) => f.write_str(p.name()),
            ConcreteType::Pointer(None) => f.write_str("[]"),
            ConcreteType::Pointer(Some(inner)) => write!(f, "[{}]", inner),
            ConcreteType::Func(func) => write!(f, "{}", func),
            ConcreteType::Named { name, .. } => f.write_str(name),
            ConcreteType::Struct(c) => write!(f, "struct {}", c),
            ConcreteType::Union(c) => write!(f, "union {}", c),
            ConcreteType::Array { elem, len } => write!(f, "[{} {}]", elem, len),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub variadic: bool,
    pub params: Vec<ConcreteType>,
    pub ret: Option<Box<ConcreteType>>,
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            f.write_str("variadic ")?;
        }
        f.write_str("fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        if let Some(ret) = &self.ret {
            write!(f, " {}", ret)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: ConcreteType,
}

impl Composite {
    /// Struct layout: every field offset is rounded up to the field's
    /// alignment, and the total size up to the struct's alignment so that
    /// arrays of the struct pack correctly.
    pub fn offsets(&self) -> Vec<(u64, &Field)> {
        let mut out = Vec::with_capacity(self.fields.len());
        let mut offset = 0;
        for field in &self.fields {
            let m = field.ty.metrics();
            offset = round_up(offset, m.align);
            out.push((offset, field));
            offset += m.size;
        }
        out
    }

    fn struct_metrics(&self) -> Metrics {
        let mut offset = 0;
        let mut align = 1;
        for field in &self.fields {
            let m = field.ty.metrics();
            offset = round_up(offset, m.align);
            offset += m.size;
            align = align.max(m.align);
        }
        Metrics {
            size: round_up(offset, align),
            align,
        }
    }

    pub fn largest_field(&self) -> Option<&Field> {
        self.fields
            .iter()
            .max_by_key(|field| field.ty.metrics().size)
    }
}

impl fmt::Display for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", field.name, field.ty)?;
        }
        f.write_str("}")
    }
}

/// Size and alignment in bytes. A zero-sized type cannot have values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub size: u64,
    pub align: u64,
}

fn round_up(n: u64, align: u64) -> u64 {
    if align == 0 {
        n
    } else {
        n.div_ceil(align) * align
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    I64,
    I32,
    I16,
    I8,
    U64,
    U32,
    U16,
    U8,
    F64,
    F32,
    Bool,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::I64 => "I64",
            Primitive::I32 => "I32",
            Primitive::I16 => "I16",
            Primitive::I8 => "I8",
            Primitive::U64 => "U64",
            Primitive::U32 => "U32",
            Primitive::U16 => "U16",
            Primitive::U8 => "U8",
            Primitive::F64 => "F64",
            Primitive::F32 => "F32",
            Primitive::Bool => "Bool",
        }
    }

    pub fn metrics(self) -> Metrics {
        let size = match self {
            Primitive::I64 | Primitive::U64 | Primitive::F64 => 8,
            Primitive::I32 | Primitive::U32 | Primitive::F32 => 4,
            Primitive::I16 | Primitive::U16 => 2,
            Primitive::I8 | Primitive::U8 | Primitive::Bool => 1,
        };
        Metrics { size, align: size }
    }

    pub fn signed(self) -> bool {
        matches!(
            self,
            Primitive::I64
                | Primitive::I32
                | Primitive::I16
                | Primitive::I8
                | Primitive::F64
                | Primitive::F32
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Primitive::F64 | Primitive::F32)
    }

    /// The extended type letter: distinguishes sub-word widths for loads
    /// and stores.
    pub fn ir_name(self) -> &'static str {
        match self {
            Primitive::I64 | Primitive::U64 => "l",
            Primitive::I32 | Primitive::U32 => "w",
            Primitive::I16 | Primitive::U16 => "h",
            Primitive::I8 | Primitive::U8 | Primitive::Bool => "b",
            Primitive::F64 => "d",
            Primitive::F32 => "s",
        }
    }

    /// The base type letter: what a temporary holding this value is typed
    /// as. Everything below 32 bits computes as 'w'.
    pub fn ir_base(self) -> char {
        match self {
            Primitive::I64 | Primitive::U64 => 'l',
            Primitive::F64 => 'd',
            Primitive::F32 => 's',
            _ => 'w',
        }
    }
}

/// An aggregate IR layout: extended-type letters (or nested aggregate
/// names) with repeat counts, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeLayout(pub Vec<LayoutEntry>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub ty: String,
    pub n: u64,
}

impl CompositeLayout {
    /// Stable identifier: entry names concatenated with repeat counts,
    /// multi-character names wrapped in X…Y so the encoding stays
    /// unambiguous.
    pub fn ident(&self) -> String {
        let mut out = String::from(":");
        for entry in &self.0 {
            if entry.ty.len() > 1 {
                out.push('X');
                out.push_str(&entry.ty);
                out.push('Y');
            } else {
                out.push_str(&entry.ty);
            }
            if entry.n > 1 {
                out.push_str(&entry.n.to_string());
            }
        }
        out
    }

    /// The IR type declaration line for this layout.
    pub fn decl(&self) -> String {
        let mut fields = String::new();
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                fields.push_str(", ");
            }
            fields.push_str(&entry.ty);
            if entry.n > 1 {
                fields.push(' ');
                fields.push_str(&entry.n.to_string());
            }
        }
        format!("type {} = {{ {} }}", self.ident(), fields)
    }
}
