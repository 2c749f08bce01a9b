use std::path::{Path, PathBuf};

use bindpath_core::{
    collect_annotations, evaluate, AnnotationError, DiagnosticOracle, DiagnosticSet, Digest,
    OracleError, TestResult,
};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Expectation runner.
///
/// One pass collects and validates every annotation, one oracle call
/// diagnoses the whole file set, and a final pass matches the two.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot scan samples: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error("oracle failed: {0}")]
    Oracle(#[from] OracleError),
}

pub struct RunOutcome {
    pub files: usize,
    pub diagnostics: usize,
    pub results: Vec<TestResult>,
    pub digest: Digest,
}

impl RunOutcome {
    pub fn failed(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Every file under `dir` whose extension is one of `extensions`, sorted.
pub fn discover(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|want| want == e));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

pub fn run(files: &[PathBuf], oracle: &dyn DiagnosticOracle) -> Result<RunOutcome, RunError> {
    let mut annotations = Vec::new();
    for path in files {
        let name = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| RunError::Read {
            path: name.clone(),
            source,
        })?;
        let found = collect_annotations(&name, &content)?;
        debug!(file = %name, annotations = found.len(), "collected expectations");
        annotations.extend(found);
    }
    info!(files = files.len(), expectations = annotations.len(), "running oracle");

    let diagnostics = oracle.diagnose(files)?;
    let set = DiagnosticSet::new(&diagnostics);
    let results = evaluate(&annotations, &set);
    let digest = Digest::from_results(&results);
    info!(status = %digest.status, failed = digest.failed_expectations, "expectations evaluated");

    Ok(RunOutcome {
        files: files.len(),
        diagnostics: set.len(),
        results,
        digest,
    })
}
