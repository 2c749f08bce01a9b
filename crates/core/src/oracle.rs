//! Diagnostic oracles: black boxes that report every static error in a set
//! of files.
//!
//! The expectation runner never looks inside an oracle. It only asks for
//! `(file, line, code)` triples and matches them against annotations, so
//! the built-in `.bind` checker and an external `tsc` are interchangeable.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::check::check_source;
use crate::error::Diagnostic;
use crate::resolve::Limits;
use crate::source::SourceProvider;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' failed ({status}) without reporting diagnostics: {output}")]
    Failed {
        program: String,
        status: String,
        output: String,
    },
}

/// Anything that can diagnose a set of files in one call.
pub trait DiagnosticOracle {
    fn diagnose(&self, files: &[PathBuf]) -> Result<Vec<Diagnostic>, OracleError>;
}

/// The built-in oracle: checks `.bind` samples with [`check_source`].
#[derive(Debug, Clone)]
pub struct ShapeCheckOracle<P: SourceProvider> {
    provider: P,
    limits: Limits,
}

impl<P: SourceProvider> ShapeCheckOracle<P> {
    pub fn new(provider: P) -> Self {
        Self::with_limits(provider, Limits::default())
    }

    pub fn with_limits(provider: P, limits: Limits) -> Self {
        ShapeCheckOracle { provider, limits }
    }
}

impl<P: SourceProvider> DiagnosticOracle for ShapeCheckOracle<P> {
    fn diagnose(&self, files: &[PathBuf]) -> Result<Vec<Diagnostic>, OracleError> {
        let mut out = Vec::new();
        for path in files {
            let name = path.display().to_string();
            let src = self
                .provider
                .read_source(path)
                .map_err(|source| OracleError::Io {
                    path: name.clone(),
                    source,
                })?;
            let diags = check_source(&src, &name, &self.limits);
            debug!(file = %name, diagnostics = diags.len(), "checked sample");
            out.extend(diags);
        }
        info!(files = files.len(), diagnostics = out.len(), "built-in check finished");
        Ok(out)
    }
}

/// Runs an external `tsc` once over the requested files.
#[derive(Debug, Clone)]
pub struct TscOracle {
    program: String,
    project: Option<PathBuf>,
}

impl Default for TscOracle {
    fn default() -> Self {
        TscOracle {
            program: "tsc".to_owned(),
            project: None,
        }
    }
}

impl TscOracle {
    pub fn new(program: impl Into<String>, project: Option<PathBuf>) -> Self {
        TscOracle {
            program: program.into(),
            project,
        }
    }

    fn command(&self, files: &[PathBuf]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--noEmit").arg("--pretty").arg("false");
        match &self.project {
            Some(project) => {
                cmd.arg("-p").arg(project);
            }
            None => {
                cmd.args(files);
            }
        }
        cmd
    }
}

impl DiagnosticOracle for TscOracle {
    fn diagnose(&self, files: &[PathBuf]) -> Result<Vec<Diagnostic>, OracleError> {
        info!(program = %self.program, files = files.len(), "running tsc");
        let output = self
            .command(files)
            .output()
            .map_err(|source| OracleError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // tsc writes diagnostics to stdout and exits non-zero when any exist.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed = parse_tsc_output(&stdout);
        // A failing run with nothing parsable is a configuration or global error.
        if !output.status.success() && parsed.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status.code(), "tsc failed without reporting diagnostics");
            return Err(OracleError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                output: [stdout.trim(), stderr.trim()]
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
            });
        }

        let by_canonical: HashMap<PathBuf, String> = files
            .iter()
            .filter_map(|p| {
                let canon = p.canonicalize().ok()?;
                Some((canon, p.display().to_string()))
            })
            .collect();
        Ok(parsed
            .into_iter()
            .map(|mut d| {
                if let Some(requested) = Path::new(&d.file)
                    .canonicalize()
                    .ok()
                    .and_then(|c| by_canonical.get(&c))
                {
                    d.file = requested.clone();
                }
                d
            })
            .collect())
    }
}

fn tsc_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.+?)\((\d+),(\d+)\): error TS(\d+): (.*)$").unwrap_or_else(|e| {
            unreachable!("tsc diagnostic pattern is valid: {e}")
        })
    })
}

/// Parse `file(line,col): error TS<code>: message` lines. Continuation
/// lines of multi-line messages and anything else are ignored.
pub fn parse_tsc_output(stdout: &str) -> Vec<Diagnostic> {
    stdout
        .lines()
        .filter_map(|line| {
            let caps = tsc_line().captures(line.trim_end())?;
            let line_no = caps[2].parse().ok()?;
            let code = caps[4].parse().ok()?;
            Some(Diagnostic::new(&caps[1], line_no, code, &caps[5]))
        })
        .collect()
}

/// Set-membership view over a diagnostic list. Both `"<file> <line>"` and
/// `"<file> <line> ts<code>"` keys are stored for every diagnostic.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSet {
    keys: HashSet<String>,
    count: usize,
}

impl DiagnosticSet {
    pub fn new(diagnostics: &[Diagnostic]) -> Self {
        let mut keys = HashSet::new();
        for d in diagnostics {
            keys.insert(line_key(&d.file, d.line));
            keys.insert(code_key(&d.file, d.line, d.code));
        }
        DiagnosticSet {
            keys,
            count: diagnostics.len(),
        }
    }

    /// Some diagnostic, of any code, is reported on this line.
    pub fn has_line(&self, file: &str, line: u32) -> bool {
        self.keys.contains(&line_key(file, line))
    }

    pub fn has_code(&self, file: &str, line: u32, code: u32) -> bool {
        self.keys.contains(&code_key(file, line, code))
    }

    /// Number of diagnostics the set was built from.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

fn line_key(file: &str, line: u32) -> String {
    format!("{} {}", file, line)
}

fn code_key(file: &str, line: u32, code: u32) -> String {
    format!("{} {} ts{}", file, line, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use crate::source::InMemoryProvider;

    #[test]
    fn builtin_oracle_reports_against_the_requested_name() {
        let mut provider = InMemoryProvider::default();
        provider.insert(
            "/s/a.bind",
            "type D = { n: number }\nconst m = model<D>()\nm.set(\"/n\", \"x\")\n",
        );
        provider.insert("/s/b.bind", "const x: string = \"ok\"\n");
        let oracle = ShapeCheckOracle::new(provider);
        let files = vec![PathBuf::from("/s/a.bind"), PathBuf::from("/s/b.bind")];
        let diags = oracle.diagnose(&files).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file, "/s/a.bind");
        assert_eq!(diags[0].line, 3);
        assert_eq!(diags[0].code, codes::ARGUMENT_NOT_ASSIGNABLE);
    }

    #[test]
    fn builtin_oracle_fails_on_unreadable_files() {
        let oracle = ShapeCheckOracle::new(InMemoryProvider::default());
        let err = oracle.diagnose(&[PathBuf::from("/nope.bind")]).unwrap_err();
        assert!(matches!(err, OracleError::Io { .. }));
    }

    #[test]
    fn tsc_output_lines_are_parsed() {
        let out = "src/a.ts(12,5): error TS2345: Argument of type 'number' is not assignable.\n  \
                   Type 'number' is not assignable to type 'string'.\n\
                   src/b.ts(3,1): error TS2590: Expression produces a union type that is too complex to represent.\n\
                   Found 2 errors.\n";
        let diags = parse_tsc_output(out);
        assert_eq!(diags.len(), 2);
        assert_eq!((diags[0].file.as_str(), diags[0].line, diags[0].code), ("src/a.ts", 12, 2345));
        assert_eq!((diags[1].file.as_str(), diags[1].line, diags[1].code), ("src/b.ts", 3, 2590));
    }

    #[test]
    fn missing_tsc_is_a_spawn_error() {
        let oracle = TscOracle::new("bindpath-no-such-program", None);
        let err = oracle.diagnose(&[]).unwrap_err();
        assert!(matches!(err, OracleError::Spawn { .. }));
    }

    #[cfg(unix)]
    fn fake_tsc(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn tsc_failure_without_diagnostics_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_tsc(
            dir.path(),
            "bad-project-tsc",
            "echo \"error TS5058: The specified path does not exist: 'tsconfig.json'.\"\nexit 1",
        );
        let oracle = TscOracle::new(program, Some(PathBuf::from("tsconfig.json")));
        let err = oracle.diagnose(&[]).unwrap_err();
        match err {
            OracleError::Failed { output, .. } => assert!(output.contains("TS5058")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn tsc_failure_with_diagnostics_is_a_normal_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_tsc(
            dir.path(),
            "failing-tsc",
            "echo \"a.ts(2,1): error TS2322: Type 'number' is not assignable to type 'string'.\"\nexit 2",
        );
        let diags = TscOracle::new(program, None).diagnose(&[]).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!((diags[0].line, diags[0].code), (2, 2322));

        let quiet = fake_tsc(dir.path(), "clean-tsc", "exit 0");
        assert!(TscOracle::new(quiet, None).diagnose(&[]).unwrap().is_empty());
    }

    #[test]
    fn diagnostic_set_answers_both_key_forms() {
        let set = DiagnosticSet::new(&[Diagnostic::new("a.bind", 4, 2322, "x")]);
        assert!(set.has_line("a.bind", 4));
        assert!(set.has_code("a.bind", 4, 2322));
        assert!(!set.has_code("a.bind", 4, 2345));
        assert!(!set.has_line("a.bind", 5));
        assert!(!set.has_line("b.bind", 4));
        assert_eq!(set.len(), 1);
    }
}
