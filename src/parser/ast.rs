pub type Program = Vec<Toplevel>;

#[derive(Debug, Clone, PartialEq)]
pub enum Toplevel {
    Function {
        public: bool,
        name: String,
        params: Vec<VarDecl>,
        ret: Option<TypeExpr>,
        body: Vec<Stmt>,
    },
    Vars(VarsDecl),
    /// Nominal definition: the new name is a distinct type.
    TypeDef { name: String, ty: TypeExpr },
    /// Transparent alias: the new name is the inner type.
    TypeAlias { name: String, ty: TypeExpr },
    Namespace { name: String, body: Vec<Toplevel> },
}

/// One or more names sharing a type, as in `var a, b I32`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarsDecl {
    pub external: bool,
    pub names: Vec<String>,
    pub ty: TypeExpr,
}

impl VarsDecl {
    pub fn decls(&self) -> impl Iterator<Item = VarDecl> + '_ {
        self.names.iter().map(|name| VarDecl {
            name: name.clone(),
            ty: self.ty.clone(),
        })
    }
}

/// A single name/type pair: a parameter or a composite field.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Vars(VarsDecl),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        els: Vec<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    LValue(LValue),
    Ref(LValue),
    Assign {
        target: LValue,
        value: Box<Expr>,
    },
    Mutate {
        op: BinaryOp,
        target: LValue,
        value: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Cast {
        value: Box<Expr>,
        ty: TypeExpr,
    },
    Prefix {
        op: PrefixOp,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Boolean {
        op: BooleanOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    IntLit(String),
    FloatLit(String),
    StringLit(Vec<u8>),
    RuneLit(char),
}

impl Expr {
    /// Narrows an expression to the lvalue subset, handing the expression
    /// back unchanged when it does not denote a memory location.
    pub fn into_lvalue(self) -> Result<LValue, Expr> {
        match self {
            Expr::LValue(lv) => Ok(lv),
            other => Err(other),
        }
    }
}

/// Expressions that denote a memory location.
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    Var(String),
    Deref(Box<Expr>),
    Access { base: Box<LValue>, field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Not,
    Inv,
    Neg,
    Pos,
}

impl PrefixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PrefixOp::Not => "!",
            PrefixOp::Inv => "^",
            PrefixOp::Neg => "-",
            PrefixOp::Pos => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Or,
    Xor,
    And,
    Shl,
    Shr,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::And => "&",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BooleanOp::And => "&&",
            BooleanOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(String),
    /// Dotted path through namespaces, ending in a type name.
    Namespaced(Vec<String>),
    /// `[T]`, or the generic pointer `[]` when no pointee is given.
    Pointer(Option<Box<TypeExpr>>),
    Array {
        elem: Box<TypeExpr>,
        len: u64,
    },
    Func {
        variadic: bool,
        params: Vec<TypeExpr>,
        ret: Option<Box<TypeExpr>>,
    },
    Struct(Vec<VarDecl>),
    Union(Vec<VarDecl>),
}
