//! Binding path grammar.
//!
//! Absolute paths start at the data root and carry the `/` prefix; relative
//! paths are resolved against a context's fixed root and must not. Whether a
//! syntactically well-formed path is *valid* depends on the shape it is
//! applied to, see [`crate::resolve`].

use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::resolve::{count_paths, Limits, ResolveError};
use crate::shape::Shape;

pub const DELIMITER: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("absolute path '{0}' must start with '/'")]
    NotAbsolute(String),
    #[error("relative path '{0}' must not start with '/'")]
    NotRelative(String),
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AbsolutePath {
    segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RelativePath {
    segments: Vec<String>,
}

/// Either flavour, as written by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingPath {
    Absolute(AbsolutePath),
    Relative(RelativePath),
}

fn split_segments(body: &str, original: &str) -> Result<Vec<String>, PathError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    body.split(DELIMITER)
        .map(|s| {
            if s.is_empty() {
                Err(PathError::EmptySegment(original.to_owned()))
            } else {
                Ok(s.to_owned())
            }
        })
        .collect()
}

impl AbsolutePath {
    /// The data root, written `/`.
    pub fn root() -> Self {
        AbsolutePath::default()
    }

    pub fn parse(text: &str) -> Result<Self, PathError> {
        let body = text
            .strip_prefix(DELIMITER)
            .ok_or_else(|| PathError::NotAbsolute(text.to_owned()))?;
        Ok(AbsolutePath {
            segments: split_segments(body, text)?,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn join(&self, rel: &RelativePath) -> AbsolutePath {
        let mut segments = self.segments.clone();
        segments.extend(rel.segments.iter().cloned());
        AbsolutePath { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl RelativePath {
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.starts_with(DELIMITER) {
            return Err(PathError::NotRelative(text.to_owned()));
        }
        Ok(RelativePath {
            segments: split_segments(text, text)?,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl BindingPath {
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.starts_with(DELIMITER) {
            AbsolutePath::parse(text).map(BindingPath::Absolute)
        } else {
            RelativePath::parse(text).map(BindingPath::Relative)
        }
    }
}

impl fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for s in &self.segments {
            write!(f, "/{}", s)?;
        }
        Ok(())
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// True when `segment` is a non-negative integer literal usable as an index.
pub fn is_index(segment: &str) -> bool {
    !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'))
}

// ──────────────────────────────────────────────
// Grammar enumeration
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    Key(String),
    Index(usize),
    /// Any non-negative integer: arrays are not length-checked.
    AnyIndex,
}

impl PatternSegment {
    fn matches(&self, concrete: &str) -> bool {
        match self {
            PatternSegment::Key(k) => k == concrete,
            PatternSegment::Index(i) => concrete == i.to_string(),
            PatternSegment::AnyIndex => is_index(concrete),
        }
    }
}

impl fmt::Display for PatternSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSegment::Key(k) => write!(f, "{}", k),
            PatternSegment::Index(i) => write!(f, "{}", i),
            PatternSegment::AnyIndex => write!(f, "<index>"),
        }
    }
}

/// A valid path into a shape, with array positions left open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    pub segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Match `root` as a prefix and return the remaining suffix.
    pub fn strip_prefix(&self, root: &AbsolutePath) -> Option<PathPattern> {
        let rs = root.segments();
        if rs.len() > self.segments.len() {
            return None;
        }
        if !self.segments.iter().zip(rs).all(|(p, c)| p.matches(c)) {
            return None;
        }
        Some(PathPattern {
            segments: self.segments[rs.len()..].to_vec(),
        })
    }

    pub fn as_absolute(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_owned();
        }
        self.segments.iter().map(|s| format!("/{}", s)).collect()
    }

    pub fn as_relative(&self) -> String {
        self.segments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// The members a path step descends through. Nullish members are skipped;
/// a primitive among the rest makes the whole shape a leaf, as in the
/// resolver.
fn traversable(shape: &Shape) -> Vec<&Shape> {
    let candidates: Vec<&Shape> = shape
        .members()
        .into_iter()
        .filter(|s| !s.is_nullish())
        .collect();
    if candidates.iter().any(|s| s.is_terminal()) {
        return Vec::new();
    }
    candidates
}

/// Valid next segments below `shape`. Nullish union members are skipped,
/// primitives contribute nothing.
pub fn next_segments(shape: &Shape) -> Vec<PatternSegment> {
    let mut out: Vec<PatternSegment> = Vec::new();
    let mut push = |seg: PatternSegment| {
        if !out.contains(&seg) {
            out.push(seg);
        }
    };
    for member in traversable(shape) {
        match member {
            Shape::Record(r) => r.members.keys().for_each(|k| push(PatternSegment::Key(k.clone()))),
            Shape::Array(_) => push(PatternSegment::AnyIndex),
            Shape::Tuple(items) => (0..items.len()).for_each(|i| push(PatternSegment::Index(i))),
            _ => {}
        }
    }
    out
}

fn children(shape: &Shape) -> Vec<(PatternSegment, Shape)> {
    let mut out = Vec::new();
    for member in traversable(shape) {
        match member {
            Shape::Record(r) => {
                for (k, m) in &r.members {
                    out.push((PatternSegment::Key(k.clone()), m.shape.clone()));
                }
            }
            Shape::Array(e) => out.push((PatternSegment::AnyIndex, e.as_ref().clone())),
            Shape::Tuple(items) => {
                for (i, s) in items.iter().enumerate() {
                    out.push((PatternSegment::Index(i), s.clone()));
                }
            }
            _ => {}
        }
    }
    out
}

/// Every valid absolute path pattern of `shape`, the root included.
/// Fails closed when the path count exceeds the configured ceiling.
pub fn enumerate_paths(shape: &Shape, limits: &Limits) -> Result<Vec<PathPattern>, ResolveError> {
    let count = count_paths(shape, limits.max_union_members);
    if count > limits.max_union_members {
        return Err(ResolveError::TooComplex {
            count,
            limit: limits.max_union_members,
        });
    }
    let root = PathPattern {
        segments: Vec::new(),
    };
    let mut seen = HashSet::from([root.clone()]);
    let mut out = vec![root];
    let mut prefix = Vec::new();
    walk(shape, &mut prefix, &mut seen, &mut out);
    Ok(out)
}

fn walk(
    shape: &Shape,
    prefix: &mut Vec<PatternSegment>,
    seen: &mut HashSet<PathPattern>,
    out: &mut Vec<PathPattern>,
) {
    for (seg, child) in children(shape) {
        prefix.push(seg);
        let pattern = PathPattern {
            segments: prefix.clone(),
        };
        if seen.insert(pattern.clone()) {
            out.push(pattern);
        }
        walk(&child, prefix, seen, out);
        prefix.pop();
    }
}

/// Valid relative paths below `root`: the absolute patterns that start with
/// `root`, with that prefix stripped. The empty suffix denotes the root.
pub fn enumerate_relative(
    shape: &Shape,
    root: &AbsolutePath,
    limits: &Limits,
) -> Result<Vec<PathPattern>, ResolveError> {
    Ok(enumerate_paths(shape, limits)?
        .iter()
        .filter_map(|p| p.strip_prefix(root))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Member, RecordShape};

    #[test]
    fn parse_absolute_paths() {
        let p = AbsolutePath::parse("/company/address/city").unwrap();
        assert_eq!(p.segments(), ["company", "address", "city"]);
        assert_eq!(p.to_string(), "/company/address/city");
        assert!(AbsolutePath::parse("/").unwrap().is_root());
        assert_eq!(
            AbsolutePath::parse("company"),
            Err(PathError::NotAbsolute("company".into()))
        );
        assert_eq!(
            AbsolutePath::parse("/a//b"),
            Err(PathError::EmptySegment("/a//b".into()))
        );
        assert!(AbsolutePath::parse("/a/").is_err());
    }

    #[test]
    fn parse_relative_paths() {
        let p = RelativePath::parse("items/0/description").unwrap();
        assert_eq!(p.segments().len(), 3);
        assert!(RelativePath::parse("").unwrap().segments().is_empty());
        assert_eq!(
            RelativePath::parse("/order"),
            Err(PathError::NotRelative("/order".into()))
        );
    }

    #[test]
    fn binding_path_dispatches_on_leading_slash() {
        assert!(matches!(
            BindingPath::parse("/order/items"),
            Ok(BindingPath::Absolute(_))
        ));
        assert!(matches!(
            BindingPath::parse("items/0"),
            Ok(BindingPath::Relative(_))
        ));
        assert!(BindingPath::parse("a//b").is_err());
    }

    #[test]
    fn join_concatenates_segments() {
        let root = AbsolutePath::parse("/company/address").unwrap();
        let rel = RelativePath::parse("houseNumber").unwrap();
        assert_eq!(root.join(&rel).to_string(), "/company/address/houseNumber");
        assert_eq!(
            root.join(&RelativePath::parse("").unwrap()),
            root
        );
    }

    #[test]
    fn index_literals() {
        assert!(is_index("0"));
        assert!(is_index("42"));
        assert!(!is_index("01"));
        assert!(!is_index("-1"));
        assert!(!is_index("x"));
        assert!(!is_index(""));
    }

    fn sample() -> Shape {
        Shape::record(
            RecordShape::new()
                .with("name", Member::required(Shape::String))
                .with(
                    "tags",
                    Member::required(Shape::array(Shape::String)),
                )
                .with(
                    "pair",
                    Member::required(Shape::tuple(vec![Shape::String, Shape::Number])),
                ),
        )
    }

    #[test]
    fn enumerate_lists_every_pattern() {
        let paths: Vec<String> = enumerate_paths(&sample(), &Limits::default())
            .unwrap()
            .iter()
            .map(PathPattern::as_absolute)
            .collect();
        assert_eq!(
            paths,
            vec!["/", "/name", "/tags", "/tags/<index>", "/pair", "/pair/0", "/pair/1"]
        );
    }

    #[test]
    fn enumerate_relative_strips_root() {
        let root = AbsolutePath::parse("/pair").unwrap();
        let rel: Vec<String> = enumerate_relative(&sample(), &root, &Limits::default())
            .unwrap()
            .iter()
            .map(PathPattern::as_relative)
            .collect();
        assert_eq!(rel, vec!["", "0", "1"]);

        let concrete = AbsolutePath::parse("/tags/3").unwrap();
        let rel: Vec<String> = enumerate_relative(&sample(), &concrete, &Limits::default())
            .unwrap()
            .iter()
            .map(PathPattern::as_relative)
            .collect();
        assert_eq!(rel, vec![""]);
    }

    #[test]
    fn enumerate_fails_closed_past_ceiling() {
        let limits = Limits {
            max_union_members: 3,
        };
        assert!(matches!(
            enumerate_paths(&sample(), &limits),
            Err(ResolveError::TooComplex { .. })
        ));
    }

    #[test]
    fn next_segments_by_shape() {
        let segs = next_segments(&sample());
        assert_eq!(segs.len(), 3);
        assert!(next_segments(&Shape::String).is_empty());
        assert_eq!(
            next_segments(&Shape::array(Shape::Number)),
            vec![PatternSegment::AnyIndex]
        );
        let nested = Shape::record(RecordShape::new().with("a", Member::required(Shape::Number)));
        assert_eq!(
            next_segments(&Shape::union(vec![nested.clone(), Shape::Null])),
            vec![PatternSegment::Key("a".into())]
        );
        assert!(next_segments(&Shape::union(vec![Shape::String, nested])).is_empty());
    }
}
