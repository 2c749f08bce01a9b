use std::fmt;

use bindpath_core::{Digest, TestResult};
use serde_json::json;

use crate::runner::RunOutcome;

const HEAVY_RULE: &str = "============================================";
const LIGHT_RULE: &str = "--------------------------------------------";

/// Human-readable rendering: the failures first, the digest last.
pub struct TextReport<'a>(pub &'a RunOutcome);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = self.0;
        writeln!(f, "{}", HEAVY_RULE)?;
        writeln!(
            f,
            "Checked {} file(s); {} diagnostic(s) reported.",
            outcome.files, outcome.diagnostics
        )?;
        writeln!(f, "{}", HEAVY_RULE)?;

        let failed: Vec<&TestResult> = outcome.failed().collect();
        if failed.is_empty() {
            writeln!(f, "All expectations passed.")?;
        } else {
            writeln!(f, "Failed expectations:")?;
            for r in failed {
                writeln!(f, "{}", LIGHT_RULE)?;
                writeln!(f, "  #:        {}", r.seq)?;
                writeln!(f, "  File:     {}:{}", r.file, r.line)?;
                writeln!(f, "  Expected: {}", r.expected)?;
                writeln!(f, "  Found:    {}", r.found)?;
                writeln!(f, "  Passed:   {}", r.passed)?;
            }
            writeln!(f, "{}", LIGHT_RULE)?;
        }

        writeln!(f, "{}", HEAVY_RULE)?;
        writeln!(f, "Results:")?;
        write_digest(f, &outcome.digest)?;
        writeln!(f, "{}", HEAVY_RULE)
    }
}

fn write_digest(f: &mut fmt::Formatter<'_>, digest: &Digest) -> fmt::Result {
    writeln!(f, "  Total expectations:  {}", digest.total_expectations)?;
    writeln!(f, "  Passed expectations: {}", digest.passed_expectations)?;
    writeln!(f, "  Failed expectations: {}", digest.failed_expectations)?;
    writeln!(f, "  Status:              {}", digest.status)?;
    writeln!(f, "  Status code:         {}", digest.status_code)
}

pub fn render_json(outcome: &RunOutcome) -> serde_json::Value {
    let failed: Vec<&TestResult> = outcome.failed().collect();
    json!({
        "failed": failed,
        "digest": outcome.digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindpath_core::Status;

    fn outcome(results: Vec<TestResult>) -> RunOutcome {
        let digest = Digest::from_results(&results);
        RunOutcome {
            files: 1,
            diagnostics: 1,
            results,
            digest,
        }
    }

    fn result(seq: usize, passed: bool) -> TestResult {
        TestResult {
            seq,
            expected: "ts2322".into(),
            found: if passed { "ts2322" } else { "ok" }.into(),
            passed,
            file: "s.bind".into(),
            line: seq as u32,
        }
    }

    #[test]
    fn passing_run() {
        let text = TextReport(&outcome(vec![result(1, true)])).to_string();
        assert!(text.contains("All expectations passed."));
        assert!(text.contains("Status:              SUCCESS"));
        assert!(!text.contains("Failed expectations:\n"));
    }

    #[test]
    fn failing_run_lists_each_failure() {
        let o = outcome(vec![result(1, true), result(2, false)]);
        let text = TextReport(&o).to_string();
        assert!(text.contains("Failed expectations:"));
        assert!(text.contains("File:     s.bind:2"));
        assert!(!text.contains("File:     s.bind:1"));
        assert!(text.contains("Status code:         1"));

        let value = render_json(&o);
        assert_eq!(value["failed"].as_array().unwrap().len(), 1);
        assert_eq!(value["digest"]["status"], "FAILURE");
        assert_eq!(o.digest.status, Status::Failure);
    }
}
