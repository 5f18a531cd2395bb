use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    /// Set when the gate skipped the whole suite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracer_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_prefix: Option<String>,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn count(&self, status: CaseStatus) -> usize {
        self.cases.iter().filter(|c| c.status == status).count()
    }

    /// 0 unless some case failed; a skipped suite is not a failure.
    pub fn exit_code(&self) -> i32 {
        if self.count(CaseStatus::Failed) > 0 {
            1
        } else {
            0
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(reason) = &self.skipped {
            let _ = writeln!(out, "SKIPPED: {}", reason);
            return out;
        }
        if let Some(version) = &self.tracer_version {
            let _ = writeln!(out, "tracer: {}", version);
        }
        if let Some(prefix) = &self.probe_prefix {
            let _ = writeln!(out, "probe prefix: {}", prefix);
        }
        for case in &self.cases {
            let label = match case.status {
                CaseStatus::Passed => "ok",
                CaseStatus::Failed => "FAILED",
                CaseStatus::Skipped => "skipped",
            };
            let _ = write!(out, "{:<20} {} ({} ms)", case.name, label, case.duration_ms);
            if let Some(detail) = &case.detail {
                let _ = write!(out, ": {}", detail);
            }
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "\n{} passed, {} failed, {} skipped",
            self.count(CaseStatus::Passed),
            self.count(CaseStatus::Failed),
            self.count(CaseStatus::Skipped)
        );
        out
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(name: &str, status: CaseStatus, detail: Option<&str>) -> CaseReport {
        CaseReport {
            name: name.to_string(),
            status,
            detail: detail.map(str::to_string),
            duration_ms: 3,
        }
    }

    #[test]
    fn skipped_suite_exits_zero() {
        let report = SuiteReport::skipped("Couldn't find stap on the path");
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.render_text(), "SKIPPED: Couldn't find stap on the path\n");

        let json: serde_json::Value =
            serde_json::from_str(&report.render_json().unwrap()).unwrap();
        assert_eq!(json["skipped"], "Couldn't find stap on the path");
        assert_eq!(json["cases"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn any_failure_exits_one() {
        let report = SuiteReport {
            cases: vec![
                case("invoking_runtime", CaseStatus::Passed, None),
                case("function_entry", CaseStatus::Failed, Some("missing marker")),
                case("filename_encoding", CaseStatus::Skipped, Some("ascii")),
            ],
            ..SuiteReport::default()
        };
        assert_eq!(report.exit_code(), 1);

        let text = report.render_text();
        assert!(text.contains("function_entry       FAILED (3 ms): missing marker"));
        assert!(text.contains("1 passed, 1 failed, 1 skipped"));

        let json: serde_json::Value =
            serde_json::from_str(&report.render_json().unwrap()).unwrap();
        assert_eq!(json["cases"][1]["status"], "failed");
        assert!(json["cases"][0].get("detail").is_none());
    }
}
