//! Data Shapes: structural descriptions of JSON-like values.
//!
//! A [`Shape`] is what the resolver walks. Heavy variants are `Arc`-shared so
//! that expanding an alias which is referenced many times (wide nested
//! records) costs one allocation, not one copy per reference.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    Symbol,
    /// Opaque callable member; never JSON-safe.
    Function,
    Unknown,
    Any,
    Never,
    /// The `object` keyword: some non-primitive value.
    Object,
    StrLit(String),
    NumLit(f64),
    BoolLit(bool),
    Template(Vec<TemplatePart>),
    Record(Arc<RecordShape>),
    Array(Arc<Shape>),
    Tuple(Arc<[Shape]>),
    Union(Arc<[Shape]>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordShape {
    /// Alias name when the record was declared through `type Name = {...}`.
    pub name: Option<String>,
    pub members: IndexMap<String, Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub shape: Shape,
    pub optional: bool,
}

impl Member {
    pub fn required(shape: Shape) -> Self {
        Member {
            shape,
            optional: false,
        }
    }

    pub fn optional(shape: Shape) -> Self {
        Member {
            shape,
            optional: true,
        }
    }
}

impl RecordShape {
    pub fn new() -> Self {
        RecordShape::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        RecordShape {
            name: Some(name.into()),
            members: IndexMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, member: Member) -> Self {
        self.members.insert(key.into(), member);
        self
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|(_, m)| !m.optional)
            .map(|(k, _)| k.as_str())
    }
}

impl Shape {
    pub fn record(record: RecordShape) -> Shape {
        Shape::Record(Arc::new(record))
    }

    pub fn array(element: Shape) -> Shape {
        Shape::Array(Arc::new(element))
    }

    pub fn tuple(items: Vec<Shape>) -> Shape {
        Shape::Tuple(items.into())
    }

    /// Build a normalised union: nested unions are flattened, `never` is
    /// dropped, duplicates are removed and `any` absorbs everything.
    pub fn union(members: impl IntoIterator<Item = Shape>) -> Shape {
        let mut flat: Vec<Shape> = Vec::new();
        for m in members {
            match m {
                Shape::Union(inner) => {
                    for s in inner.iter() {
                        push_unique(&mut flat, s.clone());
                    }
                }
                Shape::Never => {}
                other => push_unique(&mut flat, other),
            }
        }
        if flat.iter().any(|s| matches!(s, Shape::Any)) {
            return Shape::Any;
        }
        match flat.len() {
            0 => Shape::Never,
            1 => flat.remove(0),
            _ => Shape::Union(flat.into()),
        }
    }

    /// Members of a union, or the shape itself.
    pub fn members(&self) -> Vec<&Shape> {
        match self {
            Shape::Union(ms) => ms.iter().collect(),
            other => vec![other],
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Shape::Null | Shape::Undefined)
    }

    pub fn contains_nullish(&self) -> bool {
        self.members().into_iter().any(Shape::is_nullish)
    }

    /// The shape with `null` and `undefined` removed.
    pub fn without_nullish(&self) -> Shape {
        Shape::union(
            self.members()
                .into_iter()
                .filter(|s| !s.is_nullish())
                .cloned(),
        )
    }

    /// True when a JSON value may omit a member of this shape: `undefined`,
    /// `symbol` and function members never appear in serialised data.
    pub fn may_be_absent(&self) -> bool {
        self.members()
            .into_iter()
            .any(|s| matches!(s, Shape::Undefined | Shape::Symbol | Shape::Function))
    }

    /// True for shapes that cannot be descended into by a path segment.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Shape::Record(_) | Shape::Array(_) | Shape::Tuple(_) | Shape::Union(_)
        )
    }

    /// True for array and tuple shapes (after stripping nullish members).
    pub fn is_list(&self) -> bool {
        let stripped = self.without_nullish();
        let ms = stripped.members();
        !ms.is_empty()
            && ms
                .into_iter()
                .all(|s| matches!(s, Shape::Array(_) | Shape::Tuple(_)))
    }

    /// The widened form of a literal: `"a"` becomes `string`, `1` becomes
    /// `number`, records and arrays are widened member-wise.
    pub fn widen(&self) -> Shape {
        match self {
            Shape::StrLit(_) | Shape::Template(_) => Shape::String,
            Shape::NumLit(_) => Shape::Number,
            Shape::BoolLit(_) => Shape::Boolean,
            Shape::Record(r) => {
                let mut out = RecordShape {
                    name: r.name.clone(),
                    members: IndexMap::new(),
                };
                for (k, m) in &r.members {
                    out.members.insert(
                        k.clone(),
                        Member {
                            shape: m.shape.widen(),
                            optional: m.optional,
                        },
                    );
                }
                Shape::record(out)
            }
            Shape::Array(e) => Shape::array(e.widen()),
            Shape::Union(ms) => Shape::union(ms.iter().map(Shape::widen)),
            other => other.clone(),
        }
    }

    /// Run-time conformance of a JSON value to this shape.
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            Shape::Any | Shape::Unknown => true,
            Shape::Never | Shape::Undefined | Shape::Symbol | Shape::Function => false,
            Shape::String => value.is_string(),
            Shape::Number => value.is_number(),
            Shape::Boolean => value.is_boolean(),
            Shape::Null => value.is_null(),
            Shape::Object => value.is_object() || value.is_array(),
            Shape::StrLit(s) => value.as_str() == Some(s.as_str()),
            Shape::NumLit(n) => value.as_f64() == Some(*n),
            Shape::BoolLit(b) => value.as_bool() == Some(*b),
            Shape::Template(parts) => value
                .as_str()
                .is_some_and(|s| template_matches(parts, s)),
            Shape::Record(r) => match value {
                Value::Object(map) => r.members.iter().all(|(k, m)| match map.get(k) {
                    Some(v) => m.shape.admits(v),
                    None => m.optional || m.shape.may_be_absent(),
                }),
                _ => false,
            },
            Shape::Array(e) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| e.admits(v))),
            Shape::Tuple(items) => value.as_array().is_some_and(|vs| {
                vs.len() == items.len() && items.iter().zip(vs).all(|(s, v)| s.admits(v))
            }),
            Shape::Union(ms) => ms.iter().any(|s| s.admits(value)),
        }
    }

    /// Export as a JSON Schema document describing the same JSON values.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Shape::Any | Shape::Unknown => json!({}),
            Shape::Never | Shape::Undefined | Shape::Symbol | Shape::Function => json!(false),
            Shape::String => json!({ "type": "string" }),
            Shape::Number => json!({ "type": "number" }),
            Shape::Boolean => json!({ "type": "boolean" }),
            Shape::Null => json!({ "type": "null" }),
            Shape::Object => json!({ "type": ["object", "array"] }),
            Shape::StrLit(s) => json!({ "const": s }),
            Shape::NumLit(n) => json!({ "const": n }),
            Shape::BoolLit(b) => json!({ "const": b }),
            Shape::Template(parts) => {
                json!({ "type": "string", "pattern": template_regex(parts) })
            }
            Shape::Record(r) => {
                let mut props = Map::new();
                let mut required = Vec::new();
                for (k, m) in &r.members {
                    let undefined_ok = m.shape.may_be_absent();
                    let member_shape = if undefined_ok {
                        m.shape.without_nullish_undefined()
                    } else {
                        m.shape.clone()
                    };
                    props.insert(k.clone(), member_shape.to_json_schema());
                    if !m.optional && !undefined_ok {
                        required.push(Value::String(k.clone()));
                    }
                }
                json!({ "type": "object", "properties": props, "required": required })
            }
            Shape::Array(e) => json!({ "type": "array", "items": e.to_json_schema() }),
            Shape::Tuple(items) => json!({
                "type": "array",
                "prefixItems": items.iter().map(Shape::to_json_schema).collect::<Vec<_>>(),
                "minItems": items.len(),
                "maxItems": items.len(),
            }),
            Shape::Union(ms) => {
                json!({ "anyOf": ms.iter().map(Shape::to_json_schema).collect::<Vec<_>>() })
            }
        }
    }

    fn without_nullish_undefined(&self) -> Shape {
        Shape::union(
            self.members()
                .into_iter()
                .filter(|s| !matches!(s, Shape::Undefined))
                .cloned(),
        )
    }
}

fn push_unique(acc: &mut Vec<Shape>, s: Shape) {
    if !acc.contains(&s) {
        acc.push(s);
    }
}

/// Match a string against template parts such as `PO-${string}`.
pub fn template_matches(parts: &[TemplatePart], s: &str) -> bool {
    match parts.split_first() {
        None => s.is_empty(),
        Some((TemplatePart::Text(t), rest)) => s
            .strip_prefix(t.as_str())
            .is_some_and(|tail| template_matches(rest, tail)),
        Some((TemplatePart::String, rest)) => {
            (0..=s.len()).any(|i| s.is_char_boundary(i) && template_matches(rest, &s[i..]))
        }
        Some((TemplatePart::Number, rest)) => (1..=s.len()).any(|i| {
            s.is_char_boundary(i) && s[..i].parse::<f64>().is_ok() && template_matches(rest, &s[i..])
        }),
    }
}

fn template_regex(parts: &[TemplatePart]) -> String {
    let mut out = String::from("^");
    for p in parts {
        match p {
            TemplatePart::Text(t) => out.push_str(&regex::escape(t)),
            TemplatePart::String => out.push_str(".*"),
            TemplatePart::Number => out.push_str(r"-?[0-9]+(\.[0-9]+)?"),
        }
    }
    out.push('$');
    out
}

fn fmt_num(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::String => write!(f, "string"),
            Shape::Number => write!(f, "number"),
            Shape::Boolean => write!(f, "boolean"),
            Shape::Null => write!(f, "null"),
            Shape::Undefined => write!(f, "undefined"),
            Shape::Symbol => write!(f, "symbol"),
            Shape::Function => write!(f, "function"),
            Shape::Unknown => write!(f, "unknown"),
            Shape::Any => write!(f, "any"),
            Shape::Never => write!(f, "never"),
            Shape::Object => write!(f, "object"),
            Shape::StrLit(s) => write!(f, "{:?}", s),
            Shape::NumLit(n) => write!(f, "{}", fmt_num(*n)),
            Shape::BoolLit(b) => write!(f, "{}", b),
            Shape::Template(parts) => {
                write!(f, "`")?;
                for p in parts {
                    match p {
                        TemplatePart::Text(t) => write!(f, "{}", t)?,
                        TemplatePart::String => write!(f, "${{string}}")?,
                        TemplatePart::Number => write!(f, "${{number}}")?,
                    }
                }
                write!(f, "`")
            }
            Shape::Record(r) => {
                if let Some(name) = &r.name {
                    return write!(f, "{}", name);
                }
                if r.members.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (k, m)) in r.members.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    let opt = if m.optional { "?" } else { "" };
                    write!(f, "{}{}: {}", k, opt, m.shape)?;
                }
                write!(f, " }}")
            }
            Shape::Array(e) => match e.as_ref() {
                Shape::Union(_) => write!(f, "({})[]", e),
                _ => write!(f, "{}[]", e),
            },
            Shape::Tuple(items) => {
                write!(f, "[")?;
                for (i, s) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", s)?;
                }
                write!(f, "]")
            }
            Shape::Union(ms) => {
                for (i, s) in ms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", s)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Shape {
        Shape::record(
            RecordShape::new()
                .with("street", Member::required(Shape::String))
                .with("houseNumber", Member::required(Shape::Number))
                .with("city", Member::required(Shape::String)),
        )
    }

    #[test]
    fn union_flattens_and_dedupes() {
        let u = Shape::union(vec![
            Shape::String,
            Shape::union(vec![Shape::Number, Shape::String]),
            Shape::Never,
        ]);
        assert_eq!(u, Shape::Union(vec![Shape::String, Shape::Number].into()));
        assert_eq!(Shape::union(vec![Shape::Null]), Shape::Null);
        assert_eq!(Shape::union(Vec::new()), Shape::Never);
        assert_eq!(Shape::union(vec![Shape::Any, Shape::Null]), Shape::Any);
    }

    #[test]
    fn display_renders_structural_notation() {
        assert_eq!(
            address().to_string(),
            "{ street: string; houseNumber: number; city: string }"
        );
        let arr = Shape::array(Shape::union(vec![Shape::String, Shape::Number]));
        assert_eq!(arr.to_string(), "(string | number)[]");
        let tpl = Shape::Template(vec![
            TemplatePart::Text("PO-".into()),
            TemplatePart::String,
        ]);
        assert_eq!(tpl.to_string(), "`PO-${string}`");
        assert_eq!(Shape::record(RecordShape::named("Placeholder")).to_string(), "Placeholder");
    }

    #[test]
    fn template_matching() {
        let parts = vec![TemplatePart::Text("PO-".into()), TemplatePart::String];
        assert!(template_matches(&parts, "PO-2025-0042"));
        assert!(template_matches(&parts, "PO-"));
        assert!(!template_matches(&parts, "SO-1"));
        let num = vec![TemplatePart::Text("v".into()), TemplatePart::Number];
        assert!(template_matches(&num, "v12"));
        assert!(!template_matches(&num, "vx"));
    }

    #[test]
    fn admits_checks_json_values() {
        let shape = address();
        assert!(shape.admits(&json!({"street": "Main", "houseNumber": 4, "city": "X"})));
        assert!(!shape.admits(&json!({"street": "Main", "houseNumber": "4", "city": "X"})));
        assert!(!shape.admits(&json!({"street": "Main"})));
        let tuple = Shape::tuple(vec![Shape::String, Shape::Number]);
        assert!(tuple.admits(&json!(["a", 1])));
        assert!(!tuple.admits(&json!(["a", 1, 2])));
        assert!(!Shape::Symbol.admits(&json!(null)));
    }

    #[test]
    fn function_and_symbol_members_may_be_absent() {
        let placeholder = Shape::record(
            RecordShape::named("Placeholder")
                .with("placeholderString", Member::required(Shape::String))
                .with("placeholderFunction", Member::required(Shape::Function))
                .with("placeholderSymbol", Member::required(Shape::Symbol)),
        );
        assert!(placeholder.admits(&json!({"placeholderString": "x"})));
        assert!(!placeholder.admits(&json!({"placeholderString": "x", "placeholderFunction": 1})));
        assert!(!placeholder.admits(&json!({})));
        assert_eq!(
            placeholder.to_json_schema()["required"],
            json!(["placeholderString"])
        );
    }

    #[test]
    fn widen_drops_literals() {
        let r = Shape::record(
            RecordShape::new().with("id", Member::required(Shape::StrLit("x".into()))),
        );
        let widened = r.widen();
        match widened {
            Shape::Record(r) => assert_eq!(r.members["id"].shape, Shape::String),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn is_list_strips_nullish() {
        let s = Shape::union(vec![Shape::array(Shape::Number), Shape::Undefined]);
        assert!(s.is_list());
        assert!(!address().is_list());
        assert!(!Shape::Undefined.is_list());
    }
}
