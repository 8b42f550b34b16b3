//! Top-level scalar lookup in YAML config files

use tracing::warn;

use crate::package_manager::error::ConfigError;

/// Value of a top-level `key: value` pair, with surrounding quotes removed
pub(crate) fn top_level_scalar(
    content: &str,
    key: &str,
    file: &'static str,
) -> Result<Option<String>, ConfigError> {
    let mut parser = tree_sitter::Parser::new();
    let language = tree_sitter_yaml::LANGUAGE;
    parser.set_language(&language.into()).map_err(|e| {
        warn!("Failed to set YAML language for tree-sitter: {}", e);
        ConfigError::Parse {
            file,
            message: e.to_string(),
        }
    })?;

    let tree = parser.parse(content, None).ok_or_else(|| ConfigError::Parse {
        file,
        message: "Failed to parse YAML".to_string(),
    })?;

    Ok(find_pair(tree.root_node(), content, key))
}

/// Depth-first search that never descends into a pair's value, so only top-level keys match
fn find_pair(node: tree_sitter::Node, content: &str, key: &str) -> Option<String> {
    if node.kind() == "block_mapping_pair" {
        let key_node = node.child_by_field_name("key")?;
        if unquote(&content[key_node.byte_range()]) != key {
            return None;
        }
        let value_node = node.child_by_field_name("value")?;
        let value = unquote(&content[value_node.byte_range()]);
        return (!value.is_empty()).then(|| value.to_string());
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(value) = find_pair(child, content, key) {
            return Some(value);
        }
    }
    None
}

fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("minimumReleaseAge: 10080\n", Some("10080"))]
    #[case("packages:\n  - 'packages/*'\nminimumReleaseAge: 60\n", Some("60"))]
    #[case("minimumReleaseAge: \"1440\"\n", Some("1440"))]
    #[case("# minimumReleaseAge: 10\n", None)]
    #[case("catalog:\n  minimumReleaseAge: 99\n", None)]
    #[case("", None)]
    fn top_level_scalar_finds_only_top_level_keys(
        #[case] content: &str,
        #[case] expected: Option<&str>,
    ) {
        let result = top_level_scalar(content, "minimumReleaseAge", "test.yaml").unwrap();

        assert_eq!(result.as_deref(), expected);
    }
}
