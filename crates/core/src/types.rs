//! Type environment construction: resolve `type` aliases to [`Shape`]s,
//! detect cycles and lower annotations written against the aliases.
//!
//! Aliases are hoisted, so a declaration may reference aliases declared
//! later in the file. Data shapes must be finite, so every alias cycle is
//! rejected, including cycles that pass through record members.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use crate::assign::is_assignable;
use crate::ast::{RawMember, RawType, Stmt};
use crate::error::{codes, Diagnostic};
use crate::shape::{Member, RecordShape, Shape};

#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    shapes: HashMap<String, Shape>,
}

impl TypeEnv {
    pub fn get(&self, name: &str) -> Option<&Shape> {
        self.shapes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    /// Lower an annotation. Unknown alias names report `2304` and lower to
    /// `any` so that one typo does not cascade.
    pub fn lower(&self, raw: &RawType, file: &str, diags: &mut Vec<Diagnostic>) -> Shape {
        lower_with(raw, &mut |name: &str, line: u32| match self.shapes.get(name) {
            Some(s) => s.clone(),
            None => {
                diags.push(cannot_find(file, line, name));
                Shape::Any
            }
        })
    }
}

/// Build the alias environment of one file.
pub fn build_type_env(stmts: &[Stmt], file: &str) -> (TypeEnv, Vec<Diagnostic>) {
    let mut diags = Vec::new();
    let mut decls: IndexMap<String, (RawType, u32)> = IndexMap::new();
    for stmt in stmts {
        if let Stmt::TypeAlias { name, ty, line } = stmt {
            if decls.contains_key(name) {
                diags.push(Diagnostic::new(
                    file,
                    *line,
                    codes::DUPLICATE_IDENTIFIER,
                    format!("Duplicate identifier '{}'.", name),
                ));
                continue;
            }
            decls.insert(name.clone(), (ty.clone(), *line));
        }
    }

    let mut builder = Builder {
        file,
        decls: &decls,
        done: HashMap::new(),
        in_stack: Vec::new(),
        reported: HashSet::new(),
        diags: &mut diags,
    };
    for name in decls.keys() {
        builder.alias(name);
    }
    let shapes = builder.done;
    (TypeEnv { shapes }, diags)
}

struct Builder<'a> {
    file: &'a str,
    decls: &'a IndexMap<String, (RawType, u32)>,
    done: HashMap<String, Shape>,
    in_stack: Vec<String>,
    reported: HashSet<String>,
    diags: &'a mut Vec<Diagnostic>,
}

impl Builder<'_> {
    fn alias(&mut self, name: &str) -> Shape {
        if let Some(s) = self.done.get(name) {
            return s.clone();
        }
        if let Some(pos) = self.in_stack.iter().position(|n| n == name) {
            let cycle: Vec<String> = self.in_stack[pos..].to_vec();
            for member in cycle {
                if self.reported.insert(member.clone()) {
                    let line = self.decls.get(&member).map(|(_, l)| *l).unwrap_or(0);
                    self.diags.push(Diagnostic::new(
                        self.file,
                        line,
                        codes::CIRCULAR_ALIAS,
                        format!("Type alias '{}' circularly references itself.", member),
                    ));
                }
            }
            return Shape::Any;
        }
        let decls = self.decls;
        let Some((raw, _)) = decls.get(name) else {
            return Shape::Any;
        };

        self.in_stack.push(name.to_owned());
        let lowered = {
            let file = self.file;
            let mut lookup = |n: &str, line: u32| -> Shape {
                if decls.contains_key(n) {
                    self.alias(n)
                } else {
                    self.diags.push(cannot_find(file, line, n));
                    Shape::Any
                }
            };
            lower_with(raw, &mut lookup)
        };
        self.in_stack.pop();

        let shape = if self.reported.contains(name) {
            Shape::Any
        } else {
            name_record(lowered, name)
        };
        self.done.insert(name.to_owned(), shape.clone());
        shape
    }
}

fn cannot_find(file: &str, line: u32, name: &str) -> Diagnostic {
    Diagnostic::new(
        file,
        line,
        codes::CANNOT_FIND_NAME,
        format!("Cannot find name '{}'.", name),
    )
}

/// Attach the alias name to an anonymous record so messages can use it.
fn name_record(shape: Shape, name: &str) -> Shape {
    match shape {
        Shape::Record(r) if r.name.is_none() => {
            let mut named = (*r).clone();
            named.name = Some(name.to_owned());
            Shape::record(named)
        }
        other => other,
    }
}

fn lower_with(raw: &RawType, lookup: &mut dyn FnMut(&str, u32) -> Shape) -> Shape {
    match raw {
        RawType::String => Shape::String,
        RawType::Number => Shape::Number,
        RawType::Boolean => Shape::Boolean,
        RawType::Null => Shape::Null,
        RawType::Undefined => Shape::Undefined,
        RawType::Symbol => Shape::Symbol,
        RawType::Unknown => Shape::Unknown,
        RawType::Any => Shape::Any,
        RawType::Never => Shape::Never,
        RawType::Object => Shape::Object,
        RawType::Function => Shape::Function,
        RawType::StrLit(s) => Shape::StrLit(s.clone()),
        RawType::NumLit(n) => Shape::NumLit(*n),
        RawType::BoolLit(b) => Shape::BoolLit(*b),
        RawType::Template(parts) => Shape::Template(parts.clone()),
        RawType::Record(members) => Shape::record(lower_members(members, lookup)),
        RawType::Array(e) => Shape::array(lower_with(e, lookup)),
        RawType::Tuple(items) => Shape::tuple(items.iter().map(|t| lower_with(t, lookup)).collect()),
        RawType::Union(ms) => Shape::union(ms.iter().map(|t| lower_with(t, lookup)).collect::<Vec<_>>()),
        RawType::Intersection(parts) => {
            let lowered: Vec<Shape> = parts.iter().map(|t| lower_with(t, lookup)).collect();
            intersect(lowered)
        }
        RawType::Ref { name, line } => lookup(name, *line),
    }
}

fn lower_members(members: &[RawMember], lookup: &mut dyn FnMut(&str, u32) -> Shape) -> RecordShape {
    let mut out = RecordShape::new();
    for m in members {
        let shape = lower_with(&m.ty, lookup);
        out.members.insert(
            m.name.clone(),
            Member {
                shape,
                optional: m.optional,
            },
        );
    }
    out
}

/// Intersection of lowered shapes. Records merge member-wise; anything else
/// only intersects with an identical shape and is `never` otherwise.
pub fn intersect(parts: Vec<Shape>) -> Shape {
    let mut iter = parts.into_iter();
    let Some(first) = iter.next() else {
        return Shape::Unknown;
    };
    iter.fold(first, |acc, next| match (&acc, &next) {
        (Shape::Any, _) | (_, Shape::Unknown) => acc,
        (Shape::Unknown, _) | (_, Shape::Any) => next,
        (Shape::Record(a), Shape::Record(b)) => {
            let mut merged = RecordShape::new();
            for (k, m) in a.members.iter() {
                merged.members.insert(k.clone(), m.clone());
            }
            for (k, m) in b.members.iter() {
                let combined = match merged.members.get(k) {
                    Some(existing) => Member {
                        shape: narrower(&existing.shape, &m.shape),
                        optional: existing.optional && m.optional,
                    },
                    None => m.clone(),
                };
                merged.members.insert(k.clone(), combined);
            }
            Shape::record(merged)
        }
        _ if acc == next => acc,
        _ => Shape::Never,
    })
}

fn narrower(a: &Shape, b: &Shape) -> Shape {
    if is_assignable(a, b) {
        a.clone()
    } else if is_assignable(b, a) {
        b.clone()
    } else if matches!((a, b), (Shape::Record(_), Shape::Record(_))) {
        intersect(vec![a.clone(), b.clone()])
    } else {
        Shape::Never
    }
}
