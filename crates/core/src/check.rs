//! Static checker for `.bind` sample files.
//!
//! Walks the statements of one file, tracks the shape of every binding and
//! reports each call that the typing surface rejects as a [`Diagnostic`].
//! Paths handed to model and context methods must be string literals (or
//! `const` bindings holding one); they are resolved with the same resolver
//! the runtime model uses.

use std::collections::HashMap;

use tracing::debug;

use crate::assign::{explain_mismatch, member_target, Mismatch};
use crate::ast::{Expr, ExprKind, RawType, Stmt};
use crate::error::{codes, Diagnostic};
use crate::lexer::lex;
use crate::parser::parse;
use crate::path::{AbsolutePath, RelativePath};
use crate::resolve::{resolve_absolute, resolve_relative, Limits, Resolution, ResolveError};
use crate::shape::{Member, RecordShape, Shape, TemplatePart};
use crate::types::{build_type_env, TypeEnv};

/// Check one source file. Lexing and parse errors stop the file with a
/// single diagnostic; everything else is collected.
pub fn check_source(src: &str, file: &str, limits: &Limits) -> Vec<Diagnostic> {
    let tokens = match lex(src, file) {
        Ok(t) => t,
        Err(d) => return vec![d],
    };
    let stmts = match parse(&tokens, file) {
        Ok(s) => s,
        Err(d) => return vec![d],
    };
    let (env, mut diags) = build_type_env(&stmts, file);
    let mut checker = Checker {
        file,
        env,
        limits,
        vars: HashMap::new(),
        diags: Vec::new(),
    };
    for stmt in &stmts {
        checker.stmt(stmt);
    }
    diags.append(&mut checker.diags);
    diags.sort_by_key(|d| d.line);
    debug!(file, statements = stmts.len(), diagnostics = diags.len(), "checked");
    diags
}

// ──────────────────────────────────────────────
// Values
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct ModelTy {
    shape: Shape,
}

#[derive(Debug, Clone, PartialEq)]
struct ContextTy {
    shape: Shape,
    root: AbsolutePath,
}

/// An evaluated expression. Literal syntax keeps its structure so that
/// mismatches can be reported at the offending member.
#[derive(Debug, Clone)]
enum Typed {
    /// Primitive literal expression, widened when bound with `let`
    Lit(Shape),
    Leaf(Shape),
    Object(Vec<(String, u32, Typed)>),
    Array(Vec<(u32, Typed)>),
}

impl Typed {
    fn shape(&self) -> Shape {
        match self {
            Typed::Lit(s) | Typed::Leaf(s) => s.clone(),
            Typed::Object(entries) => Shape::record(entries.iter().fold(RecordShape::new(), |r, (k, _, t)| {
                r.with(k.clone(), Member::required(t.shape()))
            })),
            Typed::Array(items) => Shape::array(Shape::union(items.iter().map(|(_, t)| t.shape()))),
        }
    }

    /// The shape a mutable binding of this value gets.
    fn widened(&self) -> Shape {
        match self {
            Typed::Lit(s) => s.widen(),
            Typed::Leaf(s) => s.clone(),
            Typed::Object(entries) => Shape::record(entries.iter().fold(RecordShape::new(), |r, (k, _, t)| {
                r.with(k.clone(), Member::required(t.widened()))
            })),
            Typed::Array(items) => Shape::array(Shape::union(items.iter().map(|(_, t)| t.widened()))),
        }
    }

    fn path_literal(&self) -> Option<&str> {
        match self {
            Typed::Lit(Shape::StrLit(s)) | Typed::Leaf(Shape::StrLit(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Value {
    Data(Typed),
    Model(ModelTy),
    Context(ContextTy),
}

impl Value {
    fn any() -> Value {
        Value::Data(Typed::Leaf(Shape::Any))
    }

    fn leaf(shape: Shape) -> Value {
        Value::Data(Typed::Leaf(shape))
    }

    fn describe(&self) -> String {
        match self {
            Value::Data(t) => t.shape().to_string(),
            Value::Model(m) => format!("TypedJsonModel<{}>", m.shape),
            Value::Context(c) => format!("TypedContext<\"{}\">", c.root),
        }
    }

    fn into_typed(self) -> Typed {
        match self {
            Value::Data(t) => t,
            Value::Model(_) | Value::Context(_) => Typed::Leaf(Shape::Object),
        }
    }
}

/// What a binding holds.
#[derive(Debug, Clone)]
enum Slot {
    Data(Shape),
    Model(ModelTy),
    Context(ContextTy),
}

#[derive(Debug, Clone)]
struct Var {
    slot: Slot,
    mutable: bool,
}

/// Why a value does not fit a target shape.
enum Fault {
    /// The value as a whole; the caller picks the code.
    TopLevel(Mismatch),
    /// Member-level diagnostics, already located.
    Nested(Vec<Diagnostic>),
}

/// Why a path argument was rejected.
struct PathFault {
    code: u32,
    message: String,
}

impl PathFault {
    fn argument(message: impl Into<String>) -> Self {
        PathFault {
            code: codes::ARGUMENT_NOT_ASSIGNABLE,
            message: message.into(),
        }
    }

    fn resolve(err: ResolveError) -> Self {
        match err {
            ResolveError::TooComplex { .. } => PathFault {
                code: codes::TOO_COMPLEX,
                message: format!("Expression produces a union type that is too complex to represent: {}", err),
            },
            other => PathFault::argument(format!("Path is not valid for this data: {}", other)),
        }
    }
}

// ──────────────────────────────────────────────
// Checker
// ──────────────────────────────────────────────

struct Checker<'a> {
    file: &'a str,
    env: TypeEnv,
    limits: &'a Limits,
    vars: HashMap<String, Var>,
    diags: Vec<Diagnostic>,
}

impl Checker<'_> {
    fn push(&mut self, line: u32, code: u32, message: impl Into<String>) {
        self.diags.push(Diagnostic::new(self.file, line, code, message));
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::TypeAlias { .. } => {}
            Stmt::Binding {
                name,
                mutable,
                annotation,
                value,
                line,
            } => {
                let v = self.eval(value);
                if self.vars.contains_key(name) {
                    self.push(
                        *line,
                        codes::REDECLARED_VARIABLE,
                        format!("Cannot redeclare block-scoped variable '{}'.", name),
                    );
                }
                let slot = match annotation {
                    Some(raw) => {
                        let target = self.env.lower(raw, self.file, &mut self.diags);
                        match v {
                            Value::Data(t) => self.assign_check(&t, &target, *line),
                            other => self.push(
                                *line,
                                codes::NOT_ASSIGNABLE,
                                format!("Type '{}' is not assignable to type '{}'.", other.describe(), target),
                            ),
                        }
                        Slot::Data(target)
                    }
                    None => match v {
                        Value::Data(Typed::Lit(s)) if !*mutable => Slot::Data(s),
                        Value::Data(t) => Slot::Data(t.widened()),
                        Value::Model(m) => Slot::Model(m),
                        Value::Context(c) => Slot::Context(c),
                    },
                };
                self.vars.insert(
                    name.clone(),
                    Var {
                        slot,
                        mutable: *mutable,
                    },
                );
            }
            Stmt::Assign { name, value, line } => {
                let v = self.eval(value);
                let Some(var) = self.vars.get(name).cloned() else {
                    self.push(*line, codes::CANNOT_FIND_NAME, format!("Cannot find name '{}'.", name));
                    return;
                };
                if !var.mutable {
                    self.push(
                        *line,
                        codes::ASSIGN_TO_CONST,
                        format!("Cannot assign to '{}' because it is a constant.", name),
                    );
                    return;
                }
                match (&var.slot, v) {
                    (Slot::Data(target), Value::Data(t)) => self.assign_check(&t, target, *line),
                    (Slot::Model(a), Value::Model(b)) if *a == b => {}
                    (Slot::Context(a), Value::Context(b)) if *a == b => {}
                    (_, other) => self.push(
                        *line,
                        codes::NOT_ASSIGNABLE,
                        format!("Type '{}' is not assignable to the type of '{}'.", other.describe(), name),
                    ),
                }
            }
            Stmt::Expr(e) => {
                self.eval(e);
            }
        }
    }

    /// `let`/assignment check: top-level mismatches use the assignment codes.
    fn assign_check(&mut self, value: &Typed, target: &Shape, line: u32) {
        match self.fit(value, target) {
            Ok(()) => {}
            Err(Fault::TopLevel(m)) => {
                let d = self.mismatch_diag(&m, line, &value.shape(), target);
                self.diags.push(d);
            }
            Err(Fault::Nested(mut ds)) => self.diags.append(&mut ds),
        }
    }

    /// Argument check: a top-level mismatch is reported with `code` at
    /// `line`, member-level ones where they occur.
    fn argument_check(&mut self, value: &Typed, target: &Shape, line: u32, code: u32) {
        match self.fit(value, target) {
            Ok(()) => {}
            Err(Fault::TopLevel(_)) => self.push(
                line,
                code,
                format!(
                    "Argument of type '{}' is not assignable to parameter of type '{}'.",
                    value.shape(),
                    target
                ),
            ),
            Err(Fault::Nested(mut ds)) => self.diags.append(&mut ds),
        }
    }

    fn mismatch_diag(&self, m: &Mismatch, line: u32, source: &Shape, target: &Shape) -> Diagnostic {
        match m {
            Mismatch::MissingMembers(names) if names.len() == 1 => Diagnostic::new(
                self.file,
                line,
                codes::MISSING_MEMBER,
                format!(
                    "Property '{}' is missing in type '{}' but required in type '{}'.",
                    names[0], source, target
                ),
            ),
            Mismatch::MissingMembers(names) => Diagnostic::new(
                self.file,
                line,
                codes::MISSING_MEMBERS,
                format!(
                    "Type '{}' is missing the following properties from type '{}': {}",
                    source,
                    target,
                    names.join(", ")
                ),
            ),
            Mismatch::Incompatible => Diagnostic::new(
                self.file,
                line,
                codes::NOT_ASSIGNABLE,
                format!("Type '{}' is not assignable to type '{}'.", source, target),
            ),
        }
    }

    /// Structural fit of an evaluated expression against a target shape.
    /// Object and array literals are elaborated member by member.
    fn fit(&self, value: &Typed, target: &Shape) -> Result<(), Fault> {
        if matches!(target, Shape::Any | Shape::Unknown) {
            return Ok(());
        }
        if matches!(value, Typed::Object(_) | Typed::Array(_)) {
            if let Shape::Union(members) = target {
                if members.iter().any(|m| self.fit(value, m).is_ok()) {
                    return Ok(());
                }
                let structural: Vec<&Shape> = members.iter().filter(|m| !m.is_nullish()).collect();
                return match structural.as_slice() {
                    [only] => self.fit(value, only),
                    _ => Err(Fault::TopLevel(Mismatch::Incompatible)),
                };
            }
        }
        match (value, target) {
            (Typed::Object(_) | Typed::Array(_), Shape::Object) => Ok(()),
            (Typed::Object(entries), Shape::Record(record)) => {
                let missing: Vec<String> = record
                    .required_keys()
                    .filter(|k| !entries.iter().any(|(key, _, _)| key.as_str() == *k))
                    .map(str::to_owned)
                    .collect();
                if !missing.is_empty() {
                    return Err(Fault::TopLevel(Mismatch::MissingMembers(missing)));
                }
                if let Some((key, line, _)) = entries.iter().find(|(k, _, _)| !record.members.contains_key(k)) {
                    return Err(Fault::Nested(vec![Diagnostic::new(
                        self.file,
                        *line,
                        codes::UNKNOWN_LITERAL_MEMBER,
                        format!(
                            "Object literal may only specify known properties, and '{}' does not exist in type '{}'.",
                            key, target
                        ),
                    )]));
                }
                let mut diags = Vec::new();
                for (key, line, member_value) in entries {
                    if let Some(m) = record.members.get(key) {
                        self.collect_nested(member_value, &member_target(m), *line, &mut diags);
                    }
                }
                if diags.is_empty() {
                    Ok(())
                } else {
                    Err(Fault::Nested(diags))
                }
            }
            (Typed::Array(items), Shape::Tuple(slots)) => {
                if items.len() != slots.len() {
                    return Err(Fault::TopLevel(Mismatch::Incompatible));
                }
                let mut diags = Vec::new();
                for ((line, item), slot) in items.iter().zip(slots.iter()) {
                    self.collect_nested(item, slot, *line, &mut diags);
                }
                if diags.is_empty() {
                    Ok(())
                } else {
                    Err(Fault::Nested(diags))
                }
            }
            (Typed::Array(items), Shape::Array(element)) => {
                let mut diags = Vec::new();
                for (line, item) in items {
                    self.collect_nested(item, element, *line, &mut diags);
                }
                if diags.is_empty() {
                    Ok(())
                } else {
                    Err(Fault::Nested(diags))
                }
            }
            _ => match explain_mismatch(&value.shape(), target) {
                None => Ok(()),
                Some(m) => Err(Fault::TopLevel(m)),
            },
        }
    }

    /// Fit a member or element; its own top-level mismatch becomes a
    /// located diagnostic.
    fn collect_nested(&self, value: &Typed, target: &Shape, line: u32, out: &mut Vec<Diagnostic>) {
        match self.fit(value, target) {
            Ok(()) => {}
            Err(Fault::TopLevel(m)) => out.push(self.mismatch_diag(&m, line, &value.shape(), target)),
            Err(Fault::Nested(mut ds)) => out.append(&mut ds),
        }
    }

    // -- Expressions --------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Value {
        match &expr.kind {
            ExprKind::Str(s) => Value::Data(Typed::Lit(Shape::StrLit(s.clone()))),
            ExprKind::Num(n) => Value::Data(Typed::Lit(Shape::NumLit(*n))),
            ExprKind::Bool(b) => Value::Data(Typed::Lit(Shape::BoolLit(*b))),
            ExprKind::Template(parts) => {
                let text: Option<String> = parts
                    .iter()
                    .map(|p| match p {
                        TemplatePart::Text(t) => Some(t.as_str()),
                        _ => None,
                    })
                    .collect();
                match text {
                    Some(t) => Value::Data(Typed::Lit(Shape::StrLit(t))),
                    None => Value::leaf(Shape::String),
                }
            }
            ExprKind::Null => Value::Data(Typed::Lit(Shape::Null)),
            ExprKind::Undefined => Value::Data(Typed::Lit(Shape::Undefined)),
            ExprKind::Object(entries) => {
                let typed = entries
                    .iter()
                    .map(|e| (e.key.clone(), e.line, self.eval(&e.value).into_typed()))
                    .collect();
                Value::Data(Typed::Object(typed))
            }
            ExprKind::Array(items) => {
                let typed = items
                    .iter()
                    .map(|i| (i.line, self.eval(i).into_typed()))
                    .collect();
                Value::Data(Typed::Array(typed))
            }
            ExprKind::Arrow => Value::leaf(Shape::Function),
            ExprKind::New(name) => match self.env.get(name) {
                Some(s) => Value::leaf(s.clone()),
                None => {
                    self.push(expr.line, codes::CANNOT_FIND_NAME, format!("Cannot find name '{}'.", name));
                    Value::any()
                }
            },
            ExprKind::Ident(name) => match self.vars.get(name) {
                Some(var) => match &var.slot {
                    Slot::Data(s) => Value::leaf(s.clone()),
                    Slot::Model(m) => Value::Model(m.clone()),
                    Slot::Context(c) => Value::Context(c.clone()),
                },
                None => {
                    self.push(expr.line, codes::CANNOT_FIND_NAME, format!("Cannot find name '{}'.", name));
                    Value::any()
                }
            },
            ExprKind::Call {
                callee,
                type_arg,
                args,
            } => self.call(expr.line, callee, type_arg.as_ref(), args),
            ExprKind::Method {
                receiver,
                method,
                args,
            } => self.method(expr.line, receiver, method, args),
        }
    }

    fn arity(&mut self, line: u32, got: usize, min: usize, max: usize) -> bool {
        if (min..=max).contains(&got) {
            return true;
        }
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{}-{}", min, max)
        };
        self.push(
            line,
            codes::ARGUMENT_COUNT,
            format!("Expected {} arguments, but got {}.", expected, got),
        );
        false
    }

    fn call(&mut self, line: u32, callee: &str, type_arg: Option<&RawType>, args: &[Expr]) -> Value {
        let vals: Vec<Value> = args.iter().map(|a| self.eval(a)).collect();
        match callee {
            "model" => {
                if !self.arity(line, vals.len(), 0, 1) {
                    return Value::any();
                }
                let data = vals.into_iter().next().map(Value::into_typed);
                let shape = match type_arg {
                    Some(raw) => {
                        let shape = self.env.lower(raw, self.file, &mut self.diags);
                        if let (Some(d), Some(arg)) = (&data, args.first()) {
                            self.argument_check(d, &shape, arg.line, codes::ARGUMENT_NOT_ASSIGNABLE);
                        }
                        shape
                    }
                    None => match (&data, args.first()) {
                        (Some(d), Some(arg)) => {
                            let shape = d.widened();
                            let object_like = shape
                                .members()
                                .into_iter()
                                .all(|s| matches!(s, Shape::Record(_) | Shape::Array(_) | Shape::Tuple(_) | Shape::Object | Shape::Any));
                            if !object_like {
                                self.push(
                                    arg.line,
                                    codes::ARGUMENT_NOT_ASSIGNABLE,
                                    format!(
                                        "Argument of type '{}' is not assignable to parameter of type 'object'.",
                                        shape
                                    ),
                                );
                            }
                            shape
                        }
                        _ => Shape::Object,
                    },
                };
                Value::Model(ModelTy { shape })
            }
            "Symbol" => {
                self.arity(line, vals.len(), 0, 1);
                Value::leaf(Shape::Symbol)
            }
            other if self.vars.contains_key(other) => {
                self.push(
                    line,
                    codes::NOT_CALLABLE,
                    format!("This expression is not callable: '{}' is not a function.", other),
                );
                Value::any()
            }
            other => {
                self.push(line, codes::CANNOT_FIND_NAME, format!("Cannot find name '{}'.", other));
                Value::any()
            }
        }
    }

    fn method(&mut self, line: u32, receiver: &str, method: &str, args: &[Expr]) -> Value {
        let vals: Vec<Value> = args.iter().map(|a| self.eval(a)).collect();
        let Some(var) = self.vars.get(receiver) else {
            self.push(line, codes::CANNOT_FIND_NAME, format!("Cannot find name '{}'.", receiver));
            return Value::any();
        };
        match var.slot.clone() {
            Slot::Model(m) => self.model_method(line, &m, method, args, vals),
            Slot::Context(c) => self.context_method(line, &c, method, args, vals),
            Slot::Data(Shape::Any) => Value::any(),
            Slot::Data(s) => {
                self.push(
                    line,
                    codes::NO_SUCH_METHOD,
                    format!("Property '{}' does not exist on type '{}'.", method, s),
                );
                Value::any()
            }
        }
    }

    fn absolute(&self, v: &Value) -> Result<AbsolutePath, PathFault> {
        let literal = match v {
            Value::Data(t) => t.path_literal(),
            _ => None,
        };
        let Some(text) = literal else {
            return Err(PathFault::argument(format!(
                "Argument of type '{}' is not assignable to parameter of type 'AbsolutePath': paths must be string literals.",
                v.describe()
            )));
        };
        AbsolutePath::parse(text).map_err(|e| {
            PathFault::argument(format!(
                "Argument of type '\"{}\"' is not assignable to parameter of type 'AbsolutePath': {}",
                text, e
            ))
        })
    }

    fn relative(&self, v: &Value) -> Result<RelativePath, PathFault> {
        let literal = match v {
            Value::Data(t) => t.path_literal(),
            _ => None,
        };
        let Some(text) = literal else {
            return Err(PathFault::argument(format!(
                "Argument of type '{}' is not assignable to parameter of type 'RelativePath': paths must be string literals.",
                v.describe()
            )));
        };
        RelativePath::parse(text).map_err(|e| {
            PathFault::argument(format!(
                "Argument of type '\"{}\"' is not assignable to parameter of type 'RelativePath': {}",
                text, e
            ))
        })
    }

    /// Resolve a path argument, against `ctx` when one is given.
    fn resolve_arg(
        &self,
        shape: &Shape,
        path: &Value,
        ctx: Option<&ContextTy>,
        variant: Resolution,
    ) -> Result<Shape, PathFault> {
        match ctx {
            None => {
                let abs = self.absolute(path)?;
                resolve_absolute(shape, &abs, variant, self.limits).map_err(PathFault::resolve)
            }
            Some(c) => {
                let rel = self.relative(path)?;
                resolve_relative(shape, &c.root, &rel, variant, self.limits).map_err(PathFault::resolve)
            }
        }
    }

    /// The context argument of a model call, if it belongs to this model's
    /// data shape.
    fn context_arg<'v>(&self, m: &ModelTy, v: &'v Value) -> Option<&'v ContextTy> {
        match v {
            Value::Context(c) if c.shape == m.shape => Some(c),
            _ => None,
        }
    }

    fn model_method(&mut self, line: u32, m: &ModelTy, method: &str, args: &[Expr], vals: Vec<Value>) -> Value {
        match method {
            "get" | "getOriginal" => {
                if !self.arity(line, vals.len(), 1, 2) {
                    return Value::any();
                }
                let variant = if method == "get" {
                    Resolution::Declared
                } else {
                    Resolution::Original
                };
                let ctx = match vals.get(1) {
                    None => None,
                    Some(v) => match self.context_arg(m, v) {
                        Some(c) => Some(c),
                        None => {
                            self.push(
                                args[1].line,
                                codes::ARGUMENT_NOT_ASSIGNABLE,
                                format!(
                                    "Argument of type '{}' is not assignable to parameter of type 'TypedContext<{}>'.",
                                    v.describe(),
                                    m.shape
                                ),
                            );
                            return Value::any();
                        }
                    },
                };
                match self.resolve_arg(&m.shape, &vals[0], ctx, variant) {
                    Ok(s) => Value::leaf(s),
                    Err(f) => {
                        self.push(args[0].line, f.code, f.message);
                        Value::any()
                    }
                }
            }
            "set" => {
                if !self.arity(line, vals.len(), 2, 3) {
                    return Value::leaf(Shape::Boolean);
                }
                let value = vals[1].clone().into_typed();
                match vals.get(2) {
                    None | Some(Value::Data(Typed::Lit(Shape::Undefined))) => {
                        match self.resolve_arg(&m.shape, &vals[0], None, Resolution::Declared) {
                            Ok(target) => {
                                self.argument_check(&value, &target, args[1].line, codes::ARGUMENT_NOT_ASSIGNABLE)
                            }
                            Err(f) => self.push(args[0].line, f.code, f.message),
                        }
                    }
                    Some(v) => {
                        // Relative writes go through an overloaded signature:
                        // any failure is a single "no overload" diagnostic.
                        let outcome = match self.context_arg(m, v) {
                            None => Err(None),
                            Some(c) => match self.resolve_arg(&m.shape, &vals[0], Some(c), Resolution::Declared) {
                                Ok(target) if self.fit(&value, &target).is_ok() => Ok(()),
                                Ok(_) => Err(None),
                                Err(f) if f.code == codes::TOO_COMPLEX => Err(Some(f)),
                                Err(_) => Err(None),
                            },
                        };
                        match outcome {
                            Ok(()) => {}
                            Err(Some(f)) => self.push(args[0].line, f.code, f.message),
                            Err(None) => self.push(line, codes::NO_OVERLOAD_MATCHES, "No overload matches this call."),
                        }
                    }
                }
                Value::leaf(Shape::Boolean)
            }
            "getData" => {
                if !self.arity(line, vals.len(), 0, 0) {
                    return Value::any();
                }
                Value::leaf(m.shape.clone())
            }
            "setData" => {
                if self.arity(line, vals.len(), 1, 1) {
                    let value = vals[0].clone().into_typed();
                    self.argument_check(&value, &m.shape, args[0].line, codes::ARGUMENT_NOT_ASSIGNABLE);
                }
                Value::leaf(Shape::Undefined)
            }
            "bindList" => {
                if !self.arity(line, vals.len(), 1, 2) {
                    return Value::any();
                }
                let ctx = match vals.get(1) {
                    None => None,
                    Some(v) => match self.context_arg(m, v) {
                        Some(c) => Some(c),
                        None => {
                            self.push(
                                args[1].line,
                                codes::ARGUMENT_NOT_ASSIGNABLE,
                                format!(
                                    "Argument of type '{}' is not assignable to parameter of type 'TypedContext<{}>'.",
                                    v.describe(),
                                    m.shape
                                ),
                            );
                            return Value::any();
                        }
                    },
                };
                match self.resolve_arg(&m.shape, &vals[0], ctx, Resolution::Declared) {
                    Ok(s) if s.is_list() => Value::leaf(Shape::Object),
                    Ok(s) => {
                        self.push(
                            args[0].line,
                            codes::ARGUMENT_NOT_ASSIGNABLE,
                            format!("Path resolves to '{}', which cannot be bound as a list.", s),
                        );
                        Value::any()
                    }
                    Err(f) => {
                        self.push(args[0].line, f.code, f.message);
                        Value::any()
                    }
                }
            }
            "createContext" => {
                if !self.arity(line, vals.len(), 1, 1) {
                    return Value::any();
                }
                let checked = self.absolute(&vals[0]).and_then(|root| {
                    resolve_absolute(&m.shape, &root, Resolution::Declared, self.limits)
                        .map(|_| root)
                        .map_err(PathFault::resolve)
                });
                match checked {
                    Ok(root) => Value::Context(ContextTy {
                        shape: m.shape.clone(),
                        root,
                    }),
                    Err(f) => {
                        self.push(args[0].line, f.code, f.message);
                        Value::any()
                    }
                }
            }
            other => {
                self.push(
                    line,
                    codes::NO_SUCH_METHOD,
                    format!("Property '{}' does not exist on type 'TypedJsonModel<{}>'.", other, m.shape),
                );
                Value::any()
            }
        }
    }

    fn context_method(&mut self, line: u32, c: &ContextTy, method: &str, args: &[Expr], vals: Vec<Value>) -> Value {
        match method {
            "get" => {
                if !self.arity(line, vals.len(), 1, 1) {
                    return Value::any();
                }
                match self.resolve_arg(&c.shape, &vals[0], Some(c), Resolution::Declared) {
                    Ok(s) => Value::leaf(s),
                    Err(f) => {
                        self.push(args[0].line, f.code, f.message);
                        Value::any()
                    }
                }
            }
            "getPath" => {
                self.arity(line, vals.len(), 0, 0);
                Value::leaf(Shape::StrLit(c.root.to_string()))
            }
            "getModel" => {
                self.arity(line, vals.len(), 0, 0);
                Value::Model(ModelTy { shape: c.shape.clone() })
            }
            other => {
                self.push(
                    line,
                    codes::NO_SUCH_METHOD,
                    format!("Property '{}' does not exist on type 'TypedContext<\"{}\">'.", other, c.root),
                );
                Value::any()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPANY: &str = r#"
type Employee = { id: number; name: string; position: string }
type Company = {
  company: {
    name: string;
    address: { street: string; houseNumber: number; city: string };
    employees: Employee[];
  };
}
const m = model<Company>();
const ctx = m.createContext("/company/address");
"#;

    /// (line, code) pairs for `body` appended after the company preamble,
    /// with lines counted from the first line of `body`.
    fn diags_after_preamble(body: &str) -> Vec<(u32, u32)> {
        let offset = COMPANY.lines().count() as u32;
        let src = format!("{}{}", COMPANY, body);
        check_source(&src, "t.bind", &Limits::default())
            .into_iter()
            .map(|d| (d.line - offset, d.code))
            .collect()
    }

    fn codes_of(src: &str) -> Vec<(u32, u32)> {
        check_source(src, "t.bind", &Limits::default())
            .into_iter()
            .map(|d| (d.line, d.code))
            .collect()
    }

    #[test]
    fn preamble_is_clean() {
        assert!(diags_after_preamble("").is_empty());
    }

    #[test]
    fn absolute_and_relative_reads() {
        let found = diags_after_preamble(
            "let n: number = m.get(\"/company/address/houseNumber\")\n\
             n = m.get(\"houseNumber\", ctx)\n\
             n = ctx.get(\"houseNumber\")\n\
             let s: string = m.get(\"/company/address/houseNumber\")\n\
             m.get(\"/company/nope\")\n\
             m.get(\"company\")\n\
             m.get(\"/company\", ctx)\n",
        );
        assert_eq!(
            found,
            vec![
                (4, codes::NOT_ASSIGNABLE),
                (5, codes::ARGUMENT_NOT_ASSIGNABLE),
                (6, codes::ARGUMENT_NOT_ASSIGNABLE),
                (7, codes::ARGUMENT_NOT_ASSIGNABLE),
            ]
        );
    }

    #[test]
    fn writes_are_checked_against_the_resolved_shape() {
        let found = diags_after_preamble(
            "m.set(\"/company/address/city\", \"Berlin\")\n\
             m.set(\"/company/address/city\", 123)\n\
             m.set(\"city\", 123, ctx)\n\
             m.set(\"nope\", \"x\", ctx)\n\
             m.set(\"/company/employees/0\", { id: 1, name: \"a\", position: \"b\" })\n\
             m.set(\"/company/employees/0\", { id: 1 })\n\
             m.set(\"/company/employees/0\", { id: \"1\", name: \"a\", position: \"b\" })\n\
             m.set(\"/company/employees/0\", { id: 1, name: \"a\", position: \"b\", extra: true })\n",
        );
        assert_eq!(
            found,
            vec![
                (2, codes::ARGUMENT_NOT_ASSIGNABLE),
                (3, codes::NO_OVERLOAD_MATCHES),
                (4, codes::NO_OVERLOAD_MATCHES),
                (6, codes::ARGUMENT_NOT_ASSIGNABLE),
                (7, codes::NOT_ASSIGNABLE),
                (8, codes::UNKNOWN_LITERAL_MEMBER),
            ]
        );
    }

    #[test]
    fn bind_list_requires_a_sequence() {
        let found = diags_after_preamble(
            "m.bindList(\"/company/employees\")\n\
             m.bindList(\"/company/address\")\n\
             m.bindList(\"/company/name\")\n",
        );
        assert_eq!(
            found,
            vec![(2, codes::ARGUMENT_NOT_ASSIGNABLE), (3, codes::ARGUMENT_NOT_ASSIGNABLE)]
        );
    }

    #[test]
    fn missing_members_on_assignment() {
        let found = codes_of(
            "type P = { a: string; b: number }\n\
             let p: P = { a: \"x\", b: 1 }\n\
             p = { a: \"x\" }\n\
             p = {}\n\
             const q = 1\n\
             q = 2\n",
        );
        assert_eq!(
            found,
            vec![
                (3, codes::MISSING_MEMBER),
                (4, codes::MISSING_MEMBERS),
                (6, codes::ASSIGN_TO_CONST),
            ]
        );
    }

    #[test]
    fn let_widens_and_const_keeps_literals() {
        let found = codes_of(
            "type T = { kind: \"a\" | \"b\" }\n\
             const m = model<T>()\n\
             const k = \"a\"\n\
             let w = \"a\"\n\
             m.set(\"/kind\", k)\n\
             m.set(\"/kind\", w)\n",
        );
        assert_eq!(found, vec![(6, codes::ARGUMENT_NOT_ASSIGNABLE)]);
    }

    #[test]
    fn names_methods_and_arity() {
        let found = codes_of(
            "const m = model({ a: 1 })\n\
             missing.get(\"/a\")\n\
             m.nope()\n\
             m.get()\n\
             const x = 1\n\
             x.get(\"/a\")\n\
             const x = 2\n",
        );
        assert_eq!(
            found,
            vec![
                (2, codes::CANNOT_FIND_NAME),
                (3, codes::NO_SUCH_METHOD),
                (4, codes::ARGUMENT_COUNT),
                (6, codes::NO_SUCH_METHOD),
                (7, codes::REDECLARED_VARIABLE),
            ]
        );
    }

    #[test]
    fn parse_errors_stop_the_file() {
        let found = codes_of("const a = 1\nconst b = {\nconst c = 2\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, codes::TOKEN_EXPECTED);
    }

    #[test]
    fn non_literal_paths_are_rejected() {
        let found = codes_of(
            "const m = model({ a: 1 })\n\
             const p = \"/a\"\n\
             let q = \"/a\"\n\
             m.get(p)\n\
             m.get(q)\n",
        );
        assert_eq!(found, vec![(5, codes::ARGUMENT_NOT_ASSIGNABLE)]);
    }
}
