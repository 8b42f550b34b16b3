//! package.json parser

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::{DependencySection, PackageInfo};
use tracing::{debug, warn};

/// Parser for package.json files
pub struct PackageJsonParser;

impl PackageJsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PackageJsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PackageJsonParser {
    fn parse(&self, content: &str) -> Result<Vec<PackageInfo>, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_json::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set JSON language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse JSON content");
            ParseError::ParseFailed("Failed to parse JSON".to_string())
        })?;

        let root = tree.root_node();
        let mut results = Vec::new();

        // Find the root object
        if let Some(document) = root.child(0)
            && document.kind() == "object"
        {
            self.extract_dependencies(document, content, &mut results);
        }

        Ok(results)
    }
}

impl PackageJsonParser {
    /// Dependency field names to extract
    const DEPENDENCY_FIELDS: [DependencySection; 3] = [
        DependencySection::Dependencies,
        DependencySection::DevDependencies,
        DependencySection::PeerDependencies,
    ];

    /// Version specs that do not come from the registry
    const LOCAL_PROTOCOLS: [&'static str; 4] = ["workspace:", "file:", "link:", "git:"];

    fn is_local_spec(version: &str) -> bool {
        Self::LOCAL_PROTOCOLS
            .iter()
            .any(|protocol| version.starts_with(protocol))
    }

    /// Parse npm alias format: npm:package@version or npm:@scope/package@version
    /// Returns (actual_package_name, version), or `None` for the version when it is omitted
    fn parse_npm_alias(value: &str) -> Option<(&str, Option<&str>)> {
        let rest = value.strip_prefix("npm:")?;

        // Scoped names contain an `@` at position 0, so search after it
        let search_from = usize::from(rest.starts_with('@'));
        match rest[search_from..].find('@') {
            Some(at_pos) => {
                let at_pos = search_from + at_pos;
                Some((&rest[..at_pos], Some(&rest[at_pos + 1..])))
            }
            None => Some((rest, None)),
        }
    }

    /// Parse the packageManager field: `pnpm@10.25.0`
    /// Returns (package_name, version) only for a plain numeric version
    fn parse_package_manager(value: &str) -> Option<(&str, &str)> {
        let (name, version) = value.split_once('@')?;
        let is_plain = !version.is_empty() && version.chars().all(|c| c.is_ascii_digit() || c == '.');
        (!name.is_empty() && is_plain).then_some((name, version))
    }

    /// Extract dependencies and the packageManager field from the root object
    fn extract_dependencies(
        &self,
        object_node: tree_sitter::Node,
        content: &str,
        results: &mut Vec<PackageInfo>,
    ) {
        let mut cursor = object_node.walk();

        for child in object_node.children(&mut cursor) {
            if child.kind() != "pair" {
                continue;
            }

            let Some(key_node) = child.child_by_field_name("key") else {
                continue;
            };

            let Some(value_node) = child.child_by_field_name("value") else {
                continue;
            };

            let Ok(section) = self.get_string_value(key_node, content).parse::<DependencySection>()
            else {
                continue;
            };

            if section == DependencySection::PackageManager {
                if value_node.kind() == "string"
                    && let Some(info) = self.package_manager_entry(value_node, content)
                {
                    results.push(info);
                }
            } else if Self::DEPENDENCY_FIELDS.contains(&section) && value_node.kind() == "object" {
                self.extract_packages_from_object(value_node, content, section, results);
            }
        }
    }

    fn package_manager_entry(&self, value_node: tree_sitter::Node, content: &str) -> Option<PackageInfo> {
        let spec = self.get_string_value(value_node, content);
        let Some((name, version)) = Self::parse_package_manager(&spec) else {
            debug!("Skipping packageManager field: {}", spec);
            return None;
        };

        // Skip the opening quote and `name@`
        let skip = 1 + name.len() + 1;
        Some(self.package_info(
            value_node,
            name,
            version,
            DependencySection::PackageManager,
            skip,
        ))
    }

    /// Extract packages from a dependency object (e.g., "dependencies": { ... })
    fn extract_packages_from_object(
        &self,
        object_node: tree_sitter::Node,
        content: &str,
        section: DependencySection,
        results: &mut Vec<PackageInfo>,
    ) {
        let mut cursor = object_node.walk();

        for child in object_node.children(&mut cursor) {
            if child.kind() != "pair" {
                continue;
            }

            let Some(key_node) = child.child_by_field_name("key") else {
                continue;
            };

            let Some(value_node) = child.child_by_field_name("value") else {
                continue;
            };

            if value_node.kind() != "string" {
                continue;
            }

            let key_name = self.get_string_value(key_node, content);
            let raw_version = self.get_string_value(value_node, content);

            if Self::is_local_spec(&raw_version) {
                debug!("Skipping local dependency {}: {}", key_name, raw_version);
                continue;
            }

            // Check for npm alias format: npm:package@version
            let info = match Self::parse_npm_alias(&raw_version) {
                Some((name, Some(version))) => {
                    // Only the version part after the alias is editable
                    let skip = 1 + raw_version.len() - version.len();
                    self.package_info(value_node, name, version, section, skip)
                }
                Some((name, None)) => {
                    debug!("Skipping unversioned alias {} -> {}", key_name, name);
                    continue;
                }
                None => self.package_info(value_node, &key_name, &raw_version, section, 1),
            };

            results.push(info);
        }
    }

    /// Build a PackageInfo whose offsets cover `version`, which starts `skip` bytes into the string node
    fn package_info(
        &self,
        value_node: tree_sitter::Node,
        name: &str,
        version: &str,
        section: DependencySection,
        skip: usize,
    ) -> PackageInfo {
        let start_point = value_node.start_position();
        let start_offset = value_node.start_byte() + skip;

        PackageInfo {
            name: name.to_string(),
            version: version.to_string(),
            section,
            start_offset,
            end_offset: start_offset + version.len(),
            line: start_point.row,
            column: start_point.column + skip,
        }
    }

    /// Get the string value from a string node (removes quotes)
    fn get_string_value(&self, node: tree_sitter::Node, content: &str) -> String {
        let text = &content[node.byte_range()];
        // Remove surrounding quotes
        text.trim()
            .trim_start_matches('"')
            .trim_end_matches('"')
            .to_string()
    }
}
