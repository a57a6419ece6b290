use std::fmt;

/// One violated constraint, addressed by a JSON-path-like location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issues(Vec<Issue>);

impl Issues {
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(Issue {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn require_non_empty(&mut self, path: impl Into<String>, value: &str) {
        if value.trim().is_empty() {
            self.push(path, "must not be empty");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.0.iter()
    }
}

impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Constraints a deserialized payload must satisfy beyond its serde shape.
pub trait Validate {
    fn collect_issues(&self, issues: &mut Issues);

    fn validate(&self) -> Result<(), Issues> {
        let mut issues = Issues::default();
        self.collect_issues(&mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

impl Validate for serde_json::Value {
    fn collect_issues(&self, _issues: &mut Issues) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(String);

    impl Validate for Named {
        fn collect_issues(&self, issues: &mut Issues) {
            issues.require_non_empty("name", &self.0);
        }
    }

    #[test]
    fn test_issues_display() {
        let err = Named("  ".into()).validate().unwrap_err();
        assert_eq!(err.to_string(), "name: must not be empty");
        assert!(Named("x".into()).validate().is_ok());
    }
}
