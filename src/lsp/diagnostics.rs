//! Diagnostics for pinned versions carrying blocking advisories

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

use crate::lsp::evaluator::DependencyEvaluation;
use crate::version::overlay::VulnerabilitySummary;
use crate::version::types::Severity;

const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Diagnostics for every evaluation whose pinned version is blocked at `audit`
///
/// Returns nothing when auditing is disabled.
pub fn generate_diagnostics(
    evaluations: &[DependencyEvaluation],
    audit: Option<Severity>,
) -> Vec<Diagnostic> {
    let Some(max_severity) = audit else {
        return vec![];
    };

    evaluations
        .iter()
        .filter_map(|evaluation| create_diagnostic(evaluation, max_severity))
        .collect()
}

/// Returns None if no advisory on the pinned version exceeds `max_severity`
fn create_diagnostic(evaluation: &DependencyEvaluation, max_severity: Severity) -> Option<Diagnostic> {
    let blocking: Vec<_> = evaluation
        .current_vulnerabilities
        .iter()
        .filter(|vuln| vuln.severity.exceeds(max_severity))
        .cloned()
        .collect();
    if blocking.is_empty() {
        return None;
    }

    let package = &evaluation.package;
    let summary = VulnerabilitySummary::new(&blocking);
    let mut message = format!(
        "{}@{} has known vulnerabilities: {}",
        package.name, evaluation.current_version, summary
    );
    for vuln in &blocking {
        message.push_str(&format!("\n- [{}] {}", vuln.severity.label(), vuln.title));
    }

    let range = Range {
        start: Position {
            line: package.line as u32,
            character: package.column as u32,
        },
        end: Position {
            line: package.line as u32,
            character: (package.column + package.end_offset - package.start_offset) as u32,
        },
    };

    Some(Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::WARNING),
        code: Some(NumberOrString::String("vulnerable-version".to_string())),
        message,
        source: Some(PACKAGE_NAME.to_string()),
        ..Default::default()
    })
}
