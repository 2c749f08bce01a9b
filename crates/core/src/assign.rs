//! Structural assignability between shapes.
//!
//! A value of shape `source` may be stored where `target` is expected iff
//! [`is_assignable`] holds. This is ordinary structural compatibility, not
//! identity: an object literal with the right members satisfies a named
//! record, while literals only substitute for members of the same union.

use crate::shape::{template_matches, Member, RecordShape, Shape};

/// Why an assignment failed, used to pick a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The source is record-like but lacks required members of the target.
    MissingMembers(Vec<String>),
    Incompatible,
}

pub fn is_assignable(source: &Shape, target: &Shape) -> bool {
    if source == target {
        return true;
    }
    match (source, target) {
        (_, Shape::Any) | (_, Shape::Unknown) => true,
        (Shape::Any, t) => !matches!(t, Shape::Never),
        (Shape::Never, _) => true,
        (Shape::Union(ms), t) => ms.iter().all(|s| is_assignable(s, t)),
        (Shape::Boolean, Shape::Union(ts)) => {
            ts.iter().any(|t| is_assignable(&Shape::Boolean, t))
                || (ts.contains(&Shape::BoolLit(true)) && ts.contains(&Shape::BoolLit(false)))
        }
        (s, Shape::Union(ts)) => ts.iter().any(|t| is_assignable(s, t)),

        (Shape::StrLit(_) | Shape::Template(_), Shape::String) => true,
        (Shape::StrLit(s), Shape::Template(parts)) => template_matches(parts, s),
        (Shape::NumLit(_), Shape::Number) => true,
        (Shape::BoolLit(_), Shape::Boolean) => true,

        (
            Shape::Record(_) | Shape::Array(_) | Shape::Tuple(_) | Shape::Function,
            Shape::Object,
        ) => true,
        (Shape::Record(s), Shape::Record(t)) => record_assignable(s, t),
        (Shape::Array(s), Shape::Array(t)) => is_assignable(s, t),
        (Shape::Tuple(ss), Shape::Array(t)) => ss.iter().all(|s| is_assignable(s, t)),
        (Shape::Tuple(ss), Shape::Tuple(ts)) => {
            ss.len() == ts.len() && ss.iter().zip(ts.iter()).all(|(s, t)| is_assignable(s, t))
        }
        _ => false,
    }
}

/// The shape a member accepts: optional members also accept `undefined`.
pub fn member_target(m: &Member) -> Shape {
    if m.optional {
        Shape::union(vec![m.shape.clone(), Shape::Undefined])
    } else {
        m.shape.clone()
    }
}

fn record_assignable(source: &RecordShape, target: &RecordShape) -> bool {
    target.members.iter().all(|(k, tm)| match source.members.get(k) {
        Some(sm) => (tm.optional || !sm.optional) && is_assignable(&member_target(sm), &member_target(tm)),
        None => tm.optional,
    })
}

/// Required members of `target` that `source` does not provide, when both are
/// record-like. `object` as a source provides no members at all.
pub fn missing_members(source: &Shape, target: &Shape) -> Vec<String> {
    let Shape::Record(t) = target else {
        return Vec::new();
    };
    match source {
        Shape::Record(s) => t
            .required_keys()
            .filter(|k| !s.members.contains_key(*k))
            .map(str::to_owned)
            .collect(),
        Shape::Object => t.required_keys().map(str::to_owned).collect(),
        _ => Vec::new(),
    }
}

/// `None` when assignable, otherwise the reason it is not.
pub fn explain_mismatch(source: &Shape, target: &Shape) -> Option<Mismatch> {
    if is_assignable(source, target) {
        return None;
    }
    let missing = missing_members(source, target);
    if missing.is_empty() {
        Some(Mismatch::Incompatible)
    } else {
        Some(Mismatch::MissingMembers(missing))
    }
}
