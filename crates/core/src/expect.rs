//! Expectation annotations and their evaluation against an oracle's
//! diagnostics.
//!
//! A sample marks the line under test with `/** @expect <token> */`, where
//! the token is `ok`, `error` or `ts<code>`. Annotations are all parsed up
//! front; a malformed one aborts the run before any oracle is consulted.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::DiagnosticSet;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("{file}:{line}: malformed expectation '{token}' (expected ok, error or ts<code>)")]
    Malformed {
        file: String,
        line: u32,
        token: String,
    },
}

/// What a sample line is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Ok,
    Error,
    Code(u32),
}

impl Expectation {
    /// Parse an annotation token. Returns `None` for anything that is not
    /// `ok`, `error` or `ts` followed by a positive number.
    pub fn parse(token: &str) -> Option<Expectation> {
        match token {
            "ok" => Some(Expectation::Ok),
            "error" => Some(Expectation::Error),
            _ => {
                let digits = token.strip_prefix("ts")?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                match digits.parse::<u32>() {
                    Ok(code) if code > 0 => Some(Expectation::Code(code)),
                    _ => None,
                }
            }
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Ok => write!(f, "ok"),
            Expectation::Error => write!(f, "error"),
            Expectation::Code(c) => write!(f, "ts{}", c),
        }
    }
}

/// One `@expect` marker found in a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub file: String,
    /// 1-based line the marker starts on.
    pub line: u32,
    pub expectation: Expectation,
}

fn annotation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/\*\*\s*@expect\s+([a-zA-Z0-9_]+)\s*\*/")
            .unwrap_or_else(|e| unreachable!("annotation pattern is valid: {e}"))
    })
}

/// Collect every annotation in `content`, failing on the first malformed one.
pub fn collect_annotations(file: &str, content: &str) -> Result<Vec<Annotation>, AnnotationError> {
    let mut out = Vec::new();
    for caps in annotation_pattern().captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let line = 1 + content[..whole.start()].matches('\n').count() as u32;
        let token = &caps[1];
        let expectation = Expectation::parse(token).ok_or_else(|| AnnotationError::Malformed {
            file: file.to_owned(),
            line,
            token: token.to_owned(),
        })?;
        out.push(Annotation {
            file: file.to_owned(),
            line,
            expectation,
        });
    }
    Ok(out)
}

/// Outcome of one expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Zero-based position in the annotation list.
    pub seq: usize,
    pub expected: String,
    pub found: String,
    pub passed: bool,
    pub file: String,
    pub line: u32,
}

/// Match annotations against the diagnostics, in annotation order.
pub fn evaluate(annotations: &[Annotation], diagnostics: &DiagnosticSet) -> Vec<TestResult> {
    annotations
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let has_line = diagnostics.has_line(&a.file, a.line);
            let (found, passed) = match a.expectation {
                Expectation::Ok => (found_label(has_line), !has_line),
                Expectation::Error => (found_label(has_line), has_line),
                Expectation::Code(code) => {
                    if diagnostics.has_code(&a.file, a.line, code) {
                        (a.expectation.label(), true)
                    } else {
                        (found_label(has_line), false)
                    }
                }
            };
            TestResult {
                seq: i,
                expected: a.expectation.label(),
                found,
                passed,
                file: a.file.clone(),
                line: a.line,
            }
        })
        .collect()
}

fn found_label(has_line: bool) -> String {
    if has_line { "error" } else { "ok" }.to_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Success,
    Failure,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "SUCCESS"),
            Status::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Aggregate of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub total_expectations: usize,
    pub passed_expectations: usize,
    pub failed_expectations: usize,
    pub status: Status,
    pub status_code: i32,
}

impl Digest {
    pub fn from_results(results: &[TestResult]) -> Digest {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        let status = if failed == 0 {
            Status::Success
        } else {
            Status::Failure
        };
        Digest {
            total_expectations: total,
            passed_expectations: passed,
            failed_expectations: failed,
            status,
            status_code: if failed == 0 { 0 } else { 1 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostic;

    #[test]
    fn tokens() {
        assert_eq!(Expectation::parse("ok"), Some(Expectation::Ok));
        assert_eq!(Expectation::parse("error"), Some(Expectation::Error));
        assert_eq!(Expectation::parse("ts2345"), Some(Expectation::Code(2345)));
        assert_eq!(Expectation::parse("ts"), None);
        assert_eq!(Expectation::parse("tsabc"), None);
        assert_eq!(Expectation::parse("ts0"), None);
        assert_eq!(Expectation::parse("warning"), None);
    }

    #[test]
    fn annotations_carry_their_own_line() {
        let src = "type D = { a: string }\n\
                   /** @expect ok */ const x = 1\n\
                   \n\
                   /**   @expect ts2322   */ const y: string = 2\n";
        let found = collect_annotations("s.bind", src).unwrap();
        let lines: Vec<_> = found.iter().map(|a| (a.line, a.expectation)).collect();
        assert_eq!(lines, vec![(2, Expectation::Ok), (4, Expectation::Code(2322))]);
    }

    #[test]
    fn malformed_annotation_fails_fast() {
        let src = "/** @expect ok */ a\n/** @expect ts12x */ b\n/** @expect nope */ c\n";
        let err = collect_annotations("s.bind", src).unwrap_err();
        assert_eq!(
            err,
            AnnotationError::Malformed {
                file: "s.bind".into(),
                line: 2,
                token: "ts12x".into(),
            }
        );
    }

    #[test]
    fn matching_rules_and_digest() {
        let set = DiagnosticSet::new(&[
            Diagnostic::new("f", 1, 2322, "x"),
            Diagnostic::new("f", 2, 2345, "y"),
        ]);
        let ann = |line, expectation| Annotation {
            file: "f".into(),
            line,
            expectation,
        };
        let results = evaluate(
            &[
                ann(1, Expectation::Code(2322)),
                ann(2, Expectation::Code(2322)),
                ann(3, Expectation::Code(2322)),
                ann(1, Expectation::Error),
                ann(3, Expectation::Ok),
                ann(2, Expectation::Ok),
            ],
            &set,
        );
        let summary: Vec<_> = results
            .iter()
            .map(|r| (r.seq, r.found.as_str(), r.passed))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "ts2322", true),
                (1, "error", false),
                (2, "ok", false),
                (3, "error", true),
                (4, "ok", true),
                (5, "error", false),
            ]
        );

        let digest = Digest::from_results(&results);
        assert_eq!(digest.total_expectations, 6);
        assert_eq!(digest.passed_expectations, 3);
        assert_eq!(digest.failed_expectations, 3);
        assert_eq!(digest.status, Status::Failure);
        assert_eq!(digest.status_code, 1);
        assert_eq!(
            serde_json::to_value(&digest).unwrap()["status"],
            serde_json::json!("FAILURE")
        );
    }

    #[test]
    fn empty_run_succeeds() {
        let digest = Digest::from_results(&[]);
        assert_eq!(digest.status, Status::Success);
        assert_eq!(digest.status_code, 0);
    }
}
