//! Code lenses shown above each evaluated dependency

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{CodeLens, Command, Url};

use crate::lsp::code_action::{extract_version_prefix, version_range};
use crate::lsp::evaluator::DependencyEvaluation;
use crate::parser::types::DependencySection;
use crate::version::overlay::highest_severity;
use crate::version::types::{SafeVersion, Vulnerability};

pub const APPLY_VERSION_COMMAND: &str = "saferVersion.applyVersion";
pub const REFRESH_COMMAND: &str = "saferVersion.refresh";
pub const SHOW_VULNERABILITIES_COMMAND: &str = "saferVersion.showVulnerabilities";
pub const SHOW_CONFIG_COMMAND: &str = "saferVersion.showConfig";

/// Argument of [`APPLY_VERSION_COMMAND`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyVersionArgs {
    pub uri: Url,
    pub name: String,
    pub section: String,
    /// Replacement text for the version, range prefix included
    pub version: String,
}

/// Argument of [`SHOW_VULNERABILITIES_COMMAND`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowVulnerabilitiesArgs {
    pub name: String,
    pub version: String,
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Optional argument of [`SHOW_CONFIG_COMMAND`]; without a manifest the first
/// workspace folder is described
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowConfigArgs {
    #[serde(default)]
    pub uri: Option<Url>,
}

/// Lenses for one dependency, in display order
///
/// - vulnerability warning when the pinned version has advisories
/// - `↑` best version in the current major
/// - `🚀` best version in the newest major
pub fn generate_code_lenses(evaluation: &DependencyEvaluation, uri: &Url) -> Vec<CodeLens> {
    let mut lenses = Vec::new();

    if let Some(lens) = vulnerability_lens(evaluation) {
        lenses.push(lens);
    }
    if let Some(target) = &evaluation.recommendation.same_major {
        lenses.push(apply_lens("↑", target, evaluation, uri));
    }
    if let Some(target) = &evaluation.recommendation.latest_major {
        lenses.push(apply_lens("🚀", target, evaluation, uri));
    }

    lenses
}

fn vulnerability_lens(evaluation: &DependencyEvaluation) -> Option<CodeLens> {
    let vulns = &evaluation.current_vulnerabilities;
    let severity = highest_severity(vulns)?;
    let noun = if vulns.len() == 1 {
        "vulnerability"
    } else {
        "vulnerabilities"
    };

    let args = ShowVulnerabilitiesArgs {
        name: evaluation.package.name.clone(),
        version: evaluation.current_version.clone(),
        vulnerabilities: vulns.clone(),
    };

    Some(CodeLens {
        range: version_range(&evaluation.package),
        command: Some(Command {
            title: format!("{} {} {}", severity.icon(), vulns.len(), noun),
            command: SHOW_VULNERABILITIES_COMMAND.to_string(),
            arguments: serde_json::to_value(args).ok().map(|v| vec![v]),
        }),
        data: None,
    })
}

fn apply_lens(
    icon: &str,
    target: &SafeVersion,
    evaluation: &DependencyEvaluation,
    uri: &Url,
) -> CodeLens {
    let package = &evaluation.package;
    let args = ApplyVersionArgs {
        uri: uri.clone(),
        name: package.name.clone(),
        section: package.section.to_string(),
        version: replacement_text(package.section, &package.version, &target.version),
    };

    CodeLens {
        range: version_range(package),
        command: Some(Command {
            title: format!("{} {}", icon, target.version),
            command: APPLY_VERSION_COMMAND.to_string(),
            arguments: serde_json::to_value(args).ok().map(|v| vec![v]),
        }),
        data: None,
    }
}

/// New version text keeping the range operator of `current`
pub fn replacement_text(section: DependencySection, current: &str, target: &str) -> String {
    match section {
        DependencySection::PackageManager => target.to_string(),
        _ => format!("{}{}", extract_version_prefix(current), target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::PackageInfo;
    use crate::version::selection::Recommendation;
    use crate::version::types::Severity;
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    fn safe(v: &str) -> SafeVersion {
        SafeVersion {
            version: v.to_string(),
            published_at: DateTime::<Utc>::UNIX_EPOCH,
            is_safe: true,
            reason: None,
            vulnerabilities: Vec::new(),
        }
    }

    fn vuln(id: u64, severity: Severity) -> Vulnerability {
        Vulnerability {
            id,
            title: format!("advisory {id}"),
            severity,
            url: String::new(),
            vulnerable_versions: "<15.2.3".to_string(),
            module_name: "next".to_string(),
        }
    }

    fn make_evaluation(
        vulns: Vec<Vulnerability>,
        same_major: Option<&str>,
        latest_major: Option<&str>,
    ) -> DependencyEvaluation {
        DependencyEvaluation {
            package: PackageInfo {
                name: "next".to_string(),
                version: "^15.1.0".to_string(),
                section: DependencySection::Dependencies,
                start_offset: 40,
                end_offset: 47,
                line: 4,
                column: 13,
            },
            current_version: "15.1.0".to_string(),
            versions: vec![],
            current_vulnerabilities: vulns,
            recommendation: Recommendation {
                same_major: same_major.map(safe),
                latest_major: latest_major.map(safe),
            },
        }
    }

    fn uri() -> Url {
        Url::parse("file:///project/package.json").unwrap()
    }

    fn titles(lenses: &[CodeLens]) -> Vec<&str> {
        lenses
            .iter()
            .filter_map(|lens| lens.command.as_ref())
            .map(|command| command.title.as_str())
            .collect()
    }

    #[test]
    fn generate_code_lenses_orders_warning_then_upgrades() {
        let evaluation = make_evaluation(
            vec![vuln(1, Severity::Low), vuln(2, Severity::High)],
            Some("15.5.4"),
            Some("16.0.1"),
        );

        let lenses = generate_code_lenses(&evaluation, &uri());

        assert_eq!(
            titles(&lenses),
            vec!["🔴 2 vulnerabilities", "↑ 15.5.4", "🚀 16.0.1"]
        );
        assert!(lenses.iter().all(|lens| lens.range.start.line == 4));
    }

    #[test]
    fn vulnerability_lens_uses_singular_for_one_advisory() {
        let evaluation = make_evaluation(vec![vuln(1, Severity::Critical)], None, None);

        let lenses = generate_code_lenses(&evaluation, &uri());

        assert_eq!(titles(&lenses), vec!["⛔ 1 vulnerability"]);
        let command = lenses[0].command.as_ref().unwrap();
        assert_eq!(command.command, SHOW_VULNERABILITIES_COMMAND);
        let args: ShowVulnerabilitiesArgs =
            serde_json::from_value(command.arguments.as_ref().unwrap()[0].clone()).unwrap();
        assert_eq!(args.name, "next");
        assert_eq!(args.version, "15.1.0");
        assert_eq!(args.vulnerabilities.len(), 1);
    }

    #[test]
    fn apply_lens_carries_prefixed_version() {
        let evaluation = make_evaluation(vec![], Some("15.5.4"), None);

        let lenses = generate_code_lenses(&evaluation, &uri());

        let command = lenses[0].command.as_ref().unwrap();
        assert_eq!(command.command, APPLY_VERSION_COMMAND);
        let args: ApplyVersionArgs =
            serde_json::from_value(command.arguments.as_ref().unwrap()[0].clone()).unwrap();
        assert_eq!(
            args,
            ApplyVersionArgs {
                uri: uri(),
                name: "next".to_string(),
                section: "dependencies".to_string(),
                version: "^15.5.4".to_string(),
            }
        );
    }

    #[test]
    fn generate_code_lenses_is_empty_for_clean_up_to_date_dependency() {
        let evaluation = make_evaluation(vec![], None, None);

        assert!(generate_code_lenses(&evaluation, &uri()).is_empty());
    }

    #[rstest]
    #[case(DependencySection::Dependencies, "^1.0.0", "1.2.0", "^1.2.0")]
    #[case(DependencySection::DevDependencies, "~1.0.0", "1.0.5", "~1.0.5")]
    #[case(DependencySection::PeerDependencies, "1.0.0", "2.0.0", "2.0.0")]
    #[case(DependencySection::PackageManager, "10.25.0", "10.26.1", "10.26.1")]
    fn replacement_text_keeps_range_operator(
        #[case] section: DependencySection,
        #[case] current: &str,
        #[case] target: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(replacement_text(section, current, target), expected);
    }
}
