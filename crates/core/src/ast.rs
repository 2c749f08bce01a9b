//! Shared AST types for `.bind` sample files.
//!
//! Produced by the parser, consumed by alias resolution and the checker.

use crate::shape::TemplatePart;

// ──────────────────────────────────────────────
// Raw types (before alias resolution)
// ──────────────────────────────────────────────

/// A type as written, before alias references are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum RawType {
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    Symbol,
    Unknown,
    Any,
    Never,
    Object,
    /// `() => void` or the `function` keyword
    Function,
    StrLit(String),
    NumLit(f64),
    BoolLit(bool),
    Template(Vec<TemplatePart>),
    Record(Vec<RawMember>),
    Array(Box<RawType>),
    Tuple(Vec<RawType>),
    Union(Vec<RawType>),
    Intersection(Vec<RawType>),
    /// Named alias reference, resolved against the file's `type` declarations
    Ref { name: String, line: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMember {
    pub name: String,
    pub optional: bool,
    pub ty: RawType,
    pub line: u32,
}

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Str(String),
    Num(f64),
    /// Backtick value; a template with holes has no literal value
    Template(Vec<TemplatePart>),
    Bool(bool),
    Null,
    Undefined,
    Object(Vec<ObjectEntry>),
    Array(Vec<Expr>),
    /// `() => {}`
    Arrow,
    /// `new Alias()`
    New(String),
    /// Free call such as `model<T>(data)` or `Symbol("s")`
    Call {
        callee: String,
        type_arg: Option<RawType>,
        args: Vec<Expr>,
    },
    /// `receiver.method(args)`
    Method {
        receiver: String,
        method: String,
        args: Vec<Expr>,
    },
    Ident(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub value: Expr,
    pub line: u32,
}

// ──────────────────────────────────────────────
// Statements
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    TypeAlias {
        name: String,
        ty: RawType,
        line: u32,
    },
    /// `const` (mutable = false) or `let` (mutable = true)
    Binding {
        name: String,
        mutable: bool,
        annotation: Option<RawType>,
        value: Expr,
        line: u32,
    },
    Assign {
        name: String,
        value: Expr,
        line: u32,
    },
    Expr(Expr),
}

impl Stmt {
    pub fn line(&self) -> u32 {
        match self {
            Stmt::TypeAlias { line, .. } | Stmt::Binding { line, .. } | Stmt::Assign { line, .. } => {
                *line
            }
            Stmt::Expr(e) => e.line,
        }
    }
}
