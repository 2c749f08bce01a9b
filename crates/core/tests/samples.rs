//! Runs the shipped `samples/` corpus through the built-in oracle and the
//! expectation runner. Every annotation in every sample must hold.

use std::path::{Path, PathBuf};

use bindpath_core::{
    collect_annotations, evaluate, DiagnosticOracle, DiagnosticSet, Digest, FileSystemProvider,
    ShapeCheckOracle, Status,
};

fn samples_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../samples")
}

fn sample_files() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(samples_dir())
        .unwrap_or_else(|e| panic!("cannot read {}: {}", samples_dir().display(), e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "bind"))
        .collect();
    files.sort();
    files
}

#[test]
fn every_sample_expectation_holds() {
    let files = sample_files();
    assert!(!files.is_empty(), "no samples found");

    let mut annotations = Vec::new();
    for path in &files {
        let content = std::fs::read_to_string(path).unwrap();
        let found = collect_annotations(&path.display().to_string(), &content).unwrap();
        assert!(!found.is_empty(), "{} has no expectations", path.display());
        annotations.extend(found);
    }

    let oracle = ShapeCheckOracle::new(FileSystemProvider);
    let diagnostics = oracle.diagnose(&files).unwrap();
    let set = DiagnosticSet::new(&diagnostics);
    let results = evaluate(&annotations, &set);
    let digest = Digest::from_results(&results);

    let failures: Vec<String> = results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| {
            let reported: Vec<String> = diagnostics
                .iter()
                .filter(|d| d.file == r.file && d.line == r.line)
                .map(|d| d.to_string())
                .collect();
            format!(
                "{}:{} expected {}, found {} {:?}",
                r.file, r.line, r.expected, r.found, reported
            )
        })
        .collect();
    assert!(failures.is_empty(), "failed expectations:\n{}", failures.join("\n"));
    assert_eq!(digest.status, Status::Success);
}

#[test]
fn no_diagnostic_lands_on_an_unannotated_line() {
    let files = sample_files();
    let oracle = ShapeCheckOracle::new(FileSystemProvider);
    let diagnostics = oracle.diagnose(&files).unwrap();
    for d in &diagnostics {
        let content = std::fs::read_to_string(&d.file).unwrap();
        let annotated = collect_annotations(&d.file, &content)
            .unwrap()
            .iter()
            .any(|a| a.line == d.line);
        assert!(annotated, "unexpected diagnostic {}", d);
    }
}
