//! Path resolution: walk a [`Shape`] one segment at a time and compute the
//! shape found at the end of the path.
//!
//! Two resolution variants exist. [`Resolution::Declared`] keeps the
//! possibly-absent nature of optional members and nullable parents visible
//! (`T | undefined`); [`Resolution::Original`] reports the member shape as
//! declared. They agree on every path that crosses only required,
//! non-nullable members.

use thiserror::Error;

use crate::path::{is_index, next_segments, AbsolutePath, PatternSegment, RelativePath};
use crate::shape::Shape;

/// Default ceiling on the number of valid paths a shape may expose.
pub const DEFAULT_MAX_UNION_MEMBERS: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Declared,
    Original,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_union_members: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_union_members: DEFAULT_MAX_UNION_MEMBERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("'{segment}' is not a member of {shape} at '{at}'; expected one of: {expected}")]
    UnknownMember {
        segment: String,
        at: String,
        shape: String,
        expected: String,
    },
    #[error("'{segment}' is not an index into {shape} at '{at}'")]
    NotAnIndex {
        segment: String,
        at: String,
        shape: String,
    },
    #[error("index {index} is out of bounds for {shape} of length {len} at '{at}'")]
    IndexOutOfBounds {
        index: String,
        len: usize,
        at: String,
        shape: String,
    },
    #[error("cannot descend into {shape} with '{segment}' at '{at}'")]
    NotTraversable {
        segment: String,
        at: String,
        shape: String,
    },
    #[error("shape exposes {count} paths, more than the limit of {limit}: too complex to represent")]
    TooComplex { count: u64, limit: u64 },
}

/// Number of valid absolute paths (excluding the root), saturating just
/// past `cap` so that huge shapes are not walked in full.
pub fn count_paths(shape: &Shape, cap: u64) -> u64 {
    fn go(shape: &Shape, cap: u64, acc: &mut u64) {
        if *acc > cap {
            return;
        }
        match shape {
            Shape::Record(r) => {
                for m in r.members.values() {
                    *acc = acc.saturating_add(1);
                    go(&m.shape, cap, acc);
                    if *acc > cap {
                        return;
                    }
                }
            }
            Shape::Array(e) => {
                *acc = acc.saturating_add(1);
                go(e, cap, acc);
            }
            Shape::Tuple(items) => {
                for s in items.iter() {
                    *acc = acc.saturating_add(1);
                    go(s, cap, acc);
                    if *acc > cap {
                        return;
                    }
                }
            }
            Shape::Union(ms) => {
                for s in ms.iter() {
                    go(s, cap, acc);
                }
            }
            _ => {}
        }
    }
    let mut acc = 0u64;
    go(shape, cap, &mut acc);
    acc
}

/// Reject shapes whose path set exceeds the ceiling.
pub fn check_complexity(shape: &Shape, limits: &Limits) -> Result<(), ResolveError> {
    let count = count_paths(shape, limits.max_union_members);
    if count > limits.max_union_members {
        return Err(ResolveError::TooComplex {
            count,
            limit: limits.max_union_members,
        });
    }
    Ok(())
}

/// Resolve `segments` from the root of `shape`.
pub fn resolve(
    shape: &Shape,
    segments: &[String],
    variant: Resolution,
    limits: &Limits,
) -> Result<Shape, ResolveError> {
    check_complexity(shape, limits)?;
    let mut current = shape.clone();
    let mut at = String::new();
    for segment in segments {
        current = step(&current, segment, variant, &at)?;
        at.push('/');
        at.push_str(segment);
    }
    Ok(json_projection(current))
}

pub fn resolve_absolute(
    shape: &Shape,
    path: &AbsolutePath,
    variant: Resolution,
    limits: &Limits,
) -> Result<Shape, ResolveError> {
    resolve(shape, path.segments(), variant, limits)
}

/// Resolve a relative path against a fixed root. Equivalent to resolving the
/// joined absolute path.
pub fn resolve_relative(
    shape: &Shape,
    root: &AbsolutePath,
    rel: &RelativePath,
    variant: Resolution,
    limits: &Limits,
) -> Result<Shape, ResolveError> {
    resolve(shape, root.join(rel).segments(), variant, limits)
}

/// Shape rendering for messages, cut short for wide shapes.
fn brief(shape: &Shape) -> String {
    const MAX: usize = 80;
    let full = shape.to_string();
    if full.len() <= MAX {
        return full;
    }
    let mut end = MAX;
    while !full.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &full[..end])
}

fn display_at(at: &str) -> String {
    if at.is_empty() {
        "/".to_owned()
    } else {
        at.to_owned()
    }
}

fn expected_list(shape: &Shape) -> String {
    let segs = next_segments(shape);
    if segs.is_empty() {
        return "(none)".to_owned();
    }
    segs.iter()
        .map(PatternSegment::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn step(shape: &Shape, segment: &str, variant: Resolution, at: &str) -> Result<Shape, ResolveError> {
    match shape {
        Shape::Record(r) => match r.members.get(segment) {
            Some(m) if m.optional && variant == Resolution::Declared => {
                Ok(Shape::union(vec![m.shape.clone(), Shape::Undefined]))
            }
            Some(m) => Ok(m.shape.clone()),
            None => Err(ResolveError::UnknownMember {
                segment: segment.to_owned(),
                at: display_at(at),
                shape: brief(shape),
                expected: expected_list(shape),
            }),
        },
        Shape::Array(e) => {
            if is_index(segment) {
                Ok(e.as_ref().clone())
            } else {
                Err(ResolveError::NotAnIndex {
                    segment: segment.to_owned(),
                    at: display_at(at),
                    shape: brief(shape),
                })
            }
        }
        Shape::Tuple(items) => {
            if !is_index(segment) {
                return Err(ResolveError::NotAnIndex {
                    segment: segment.to_owned(),
                    at: display_at(at),
                    shape: brief(shape),
                });
            }
            match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(s) => Ok(s.clone()),
                None => Err(ResolveError::IndexOutOfBounds {
                    index: segment.to_owned(),
                    len: items.len(),
                    at: display_at(at),
                    shape: brief(shape),
                }),
            }
        }
        Shape::Union(members) => step_union(shape, members, segment, variant, at),
        _ => Err(ResolveError::NotTraversable {
            segment: segment.to_owned(),
            at: display_at(at),
            shape: brief(shape),
        }),
    }
}

fn step_union(
    shape: &Shape,
    members: &[Shape],
    segment: &str,
    variant: Resolution,
    at: &str,
) -> Result<Shape, ResolveError> {
    let nullable = members.iter().any(Shape::is_nullish);
    let candidates: Vec<&Shape> = members.iter().filter(|s| !s.is_nullish()).collect();
    // A primitive among the candidates has no key-value structure; the whole
    // step fails rather than resolving through the structured members only.
    if candidates.is_empty() || candidates.iter().any(|s| s.is_terminal()) {
        return Err(ResolveError::NotTraversable {
            segment: segment.to_owned(),
            at: display_at(at),
            shape: brief(shape),
        });
    }

    let mut found = Vec::new();
    let mut missing_member = false;
    let mut first_err = None;
    for c in candidates {
        match step(c, segment, variant, at) {
            Ok(s) => found.push(s),
            Err(e) => {
                if matches!(e, ResolveError::UnknownMember { .. }) && matches!(c, Shape::Record(_)) {
                    missing_member = true;
                }
                first_err.get_or_insert(e);
            }
        }
    }
    if found.is_empty() {
        return Err(first_err.unwrap_or_else(|| ResolveError::NotTraversable {
            segment: segment.to_owned(),
            at: display_at(at),
            shape: brief(shape),
        }));
    }
    if variant == Resolution::Declared && (nullable || missing_member) {
        found.push(Shape::Undefined);
    }
    Ok(Shape::union(found))
}

/// Symbols and functions do not survive JSON serialisation; a path ending on
/// one reads back as `undefined`.
fn json_projection(shape: Shape) -> Shape {
    match shape {
        Shape::Symbol | Shape::Function => Shape::Undefined,
        Shape::Union(ms) => Shape::union(ms.iter().cloned().map(json_projection)),
        other => other,
    }
}
