//! Code actions listing every classified version of a dependency

use std::collections::HashMap;

use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, Position, Range, TextEdit, Url, WorkspaceEdit,
};

use crate::lsp::evaluator::DependencyEvaluation;
use crate::parser::types::PackageInfo;
use crate::version::overlay::{SafetyStatus, VulnerabilitySummary};
use crate::version::types::{SafeVersion, Severity};

/// Index of evaluations grouped by line number for efficient lookup
pub struct EvaluationIndex<'a> {
    by_line: HashMap<u32, Vec<&'a DependencyEvaluation>>,
}

impl<'a> EvaluationIndex<'a> {
    /// Build an index from a slice of evaluations
    pub fn new(evaluations: &'a [DependencyEvaluation]) -> Self {
        let mut by_line: HashMap<u32, Vec<&'a DependencyEvaluation>> = HashMap::new();
        for evaluation in evaluations {
            by_line
                .entry(evaluation.package.line as u32)
                .or_default()
                .push(evaluation);
        }
        Self { by_line }
    }

    /// Evaluations whose line falls inside `range`
    pub fn in_range(&self, range: Range) -> Vec<&'a DependencyEvaluation> {
        let mut found: Vec<_> = (range.start.line..=range.end.line)
            .filter_map(|line| self.by_line.get(&line))
            .flatten()
            .copied()
            .collect();
        found.sort_by_key(|e| (e.package.line, e.package.column));
        found
    }
}

/// Extract version prefix (^, ~, >=, <=, >, <, =) from a version string
pub fn extract_version_prefix(version: &str) -> &str {
    if version.starts_with(">=") {
        ">="
    } else if version.starts_with("<=") {
        "<="
    } else if version.starts_with('>') {
        ">"
    } else if version.starts_with('<') {
        "<"
    } else if version.starts_with('=') {
        "="
    } else if version.starts_with('^') {
        "^"
    } else if version.starts_with('~') {
        "~"
    } else {
        ""
    }
}

/// One quick fix per classified version, newest first, skipping the pinned one
///
/// The title carries the safety status, the advisory counts, the publish time
/// and the quarantine reason so the list doubles as a version picker.
/// The same-major recommendation is marked preferred.
pub fn generate_version_actions(
    evaluation: &DependencyEvaluation,
    audit: Option<Severity>,
    uri: &Url,
) -> Vec<CodeAction> {
    let package = &evaluation.package;
    let prefix = extract_version_prefix(&package.version);
    let preferred = evaluation
        .recommendation
        .same_major
        .as_ref()
        .map(|v| v.version.as_str());

    evaluation
        .versions
        .iter()
        .filter(|v| v.version != evaluation.current_version)
        .map(|v| {
            let new_version = format!("{prefix}{}", v.version);
            let mut action = create_bump_action(
                &version_title(&package.name, &new_version, v, audit),
                &new_version,
                package,
                uri,
            );
            if preferred == Some(v.version.as_str()) {
                action.is_preferred = Some(true);
            }
            action
        })
        .collect()
}

/// `Set next to ^16.1.0 (⚠ In quarantine | ⛔ 1 Critical) - Published 2025-01-02 03:04 UTC - Released 5 minutes ago (quarantine: 7 days)`
fn version_title(
    name: &str,
    new_version: &str,
    version: &SafeVersion,
    audit: Option<Severity>,
) -> String {
    let status = SafetyStatus::of(version, audit);
    let summary = VulnerabilitySummary::new(&version.vulnerabilities);
    let mut title = if summary.is_empty() {
        format!("Set {name} to {new_version} ({status})")
    } else {
        format!("Set {name} to {new_version} ({status} | {summary})")
    };

    title.push_str(&format!(
        " - Published {}",
        version.published_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if let Some(reason) = &version.reason {
        title.push_str(&format!(" - {reason}"));
    }
    title
}

/// Range covering the version text of `package`
pub fn version_range(package: &PackageInfo) -> Range {
    let start = Position {
        line: package.line as u32,
        character: package.column as u32,
    };
    let end = Position {
        line: package.line as u32,
        character: package.column as u32 + package.version.len() as u32,
    };
    Range { start, end }
}

/// Workspace edit replacing the version text of `package` with `new_version`
pub fn version_edit(new_version: &str, package: &PackageInfo, uri: &Url) -> WorkspaceEdit {
    let text_edit = TextEdit {
        range: version_range(package),
        new_text: new_version.to_string(),
    };

    let mut changes = HashMap::new();
    changes.insert(uri.clone(), vec![text_edit]);

    WorkspaceEdit {
        changes: Some(changes),
        ..Default::default()
    }
}

fn create_bump_action(
    title: &str,
    new_version: &str,
    package: &PackageInfo,
    uri: &Url,
) -> CodeAction {
    CodeAction {
        title: title.to_string(),
        kind: Some(CodeActionKind::QUICKFIX),
        edit: Some(version_edit(new_version, package, uri)),
        ..Default::default()
    }
}
