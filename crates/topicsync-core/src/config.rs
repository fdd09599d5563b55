//! Desired-state file loading and validation
//!
//! The file lists topics in order:
//!
//! ```yaml
//! topics:
//!   - name: orders
//!     partitions: 6
//!     replication_factor: 3
//!     description: Order lifecycle events
//!   - name: audit
//!     partitions: ${AUDIT_PARTITIONS:-1}
//!     replication_factor: 1
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are expanded from the environment before
//! parsing. Declaration order is preserved all the way to the broker calls.

use crate::error::{Error, Result};
use crate::types::TopicSpec;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use validator::{Validate, ValidationErrors};

static ENV_VAR_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var pattern is valid")
});

/// Parsed desired-state file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicsFile {
    /// Topics in declaration order
    #[serde(default)]
    pub topics: Vec<TopicSpec>,
}

impl TopicsFile {
    /// Load and validate a desired-state file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&content).map_err(|e| match e {
            Error::Yaml { source, .. } => Error::Yaml {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate desired state from a YAML string
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);

        let file: Self = serde_yaml::from_str(&expanded).map_err(|source| Error::Yaml {
            path: "<inline>".to_string(),
            source,
        })?;

        validate_specs(&file.topics)?;
        Ok(file)
    }

    /// Consume the file, yielding the topic specs in declaration order
    pub fn into_specs(self) -> Vec<TopicSpec> {
        self.topics
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references
fn expand_env_vars(content: &str) -> String {
    ENV_VAR_REGEX
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map(|m| m.as_str());

            std::env::var(var_name).unwrap_or_else(|_| default.unwrap_or("").to_string())
        })
        .to_string()
}

/// Reject malformed or duplicate topic specs before any broker call
pub fn validate_specs(specs: &[TopicSpec]) -> Result<()> {
    let mut seen = HashSet::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        if let Err(errors) = spec.validate() {
            let label = if spec.name.is_empty() {
                format!("topic #{}", index + 1)
            } else {
                format!("topic '{}'", spec.name)
            };
            return Err(Error::InvalidInput(format!(
                "{}: {}",
                label,
                describe_errors(&errors)
            )));
        }

        if !seen.insert(spec.name.as_str()) {
            return Err(Error::InvalidInput(format!(
                "topic '{}' is declared more than once",
                spec.name
            )));
        }
    }

    Ok(())
}

fn describe_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_preserves_order() {
        let yaml = r#"
topics:
  - name: orders
    partitions: 6
    replication_factor: 3
    description: Order lifecycle events
  - name: audit
    partitions: 1
    replication_factor: 1
"#;
        let file = TopicsFile::parse(yaml).unwrap();
        let specs = file.into_specs();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "orders");
        assert_eq!(specs[0].partitions, 6);
        assert_eq!(specs[0].replication_factor, 3);
        assert_eq!(specs[0].description.as_deref(), Some("Order lifecycle events"));
        assert_eq!(specs[1].name, "audit");
        assert!(specs[1].description.is_none());
    }

    #[test]
    fn test_empty_file_has_no_topics() {
        let file = TopicsFile::parse("topics: []").unwrap();
        assert!(file.topics.is_empty());
    }

    #[test]
    fn test_env_var_expansion_with_default() {
        let yaml = r#"
topics:
  - name: payments
    partitions: ${TOPICSYNC_TEST_UNSET_PARTITIONS:-4}
    replication_factor: 1
"#;
        let file = TopicsFile::parse(yaml).unwrap();
        assert_eq!(file.topics[0].partitions, 4);
    }

    #[test]
    fn test_rejects_empty_name() {
        let specs = vec![TopicSpec::new("", 1, 1)];
        let err = validate_specs(&specs).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("topic #1"));
        assert!(err.to_string().contains("topic name cannot be empty"));
    }

    #[test]
    fn test_rejects_non_positive_counts() {
        let err = validate_specs(&[TopicSpec::new("orders", 0, 1)]).unwrap_err();
        assert!(err.to_string().contains("orders"));
        assert!(err.to_string().contains("at least 1 partition"));

        let err = validate_specs(&[TopicSpec::new("orders", 3, -1)]).unwrap_err();
        assert!(err.to_string().contains("replication factor"));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let specs = vec![TopicSpec::new("orders", 1, 1), TopicSpec::new("orders", 2, 1)];
        let err = validate_specs(&specs).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "topics:\n  - name: events\n    partitions: 3\n    replication_factor: 2"
        )
        .unwrap();

        let parsed = TopicsFile::from_file(file.path()).unwrap();
        assert_eq!(parsed.topics, vec![TopicSpec::new("events", 3, 2)]);
    }

    #[test]
    fn test_from_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "topics: [not, a, topic]").unwrap();

        let err = TopicsFile::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Yaml { .. }));
        assert!(err
            .to_string()
            .contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_file() {
        let err = TopicsFile::from_file("/nonexistent/topics.yaml").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
