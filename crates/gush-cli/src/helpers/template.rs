use std::path::Path;

use gush_core::error::GushError;
use tera::{Context, Tera};

const DEFAULT: &str = "{{ description }}\n";

const TABLE: &str = r#"| Q             | A
| ------------- | ---
| Bug fix?      | {{ bug_fix | default(value="no") }}
| New feature?  | {{ new_feature | default(value="no") }}
| BC breaks?    | {{ bc_breaks | default(value="no") }}
| Deprecations? | {{ deprecations | default(value="no") }}
| Tests pass?   | {{ tests_pass | default(value="yes") }}
| Fixed tickets | {{ fixed_tickets | default(value="") }}
| License       | {{ license | default(value="MIT") }}

{{ description }}
"#;

const MERGE: &str = "Merge pull request #{{ number }} from {{ head }}\n\n{{ title }}\n";

const RELEASE: &str = "{% for commit in commits %}* {{ commit }}\n{% endfor %}";

/// Named body templates: built-ins plus `*.tera` files from the user's
/// template directory, which replace built-ins of the same name.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new(user_dir: Option<&Path>) -> Result<Self, GushError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("default", DEFAULT),
            ("table", TABLE),
            ("merge", MERGE),
            ("release", RELEASE),
        ])
        .map_err(template_error)?;

        if let Some(dir) = user_dir.filter(|d| d.is_dir()) {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("tera") {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let content = std::fs::read_to_string(&path)?;
                tera.add_raw_template(name, &content).map_err(template_error)?;
                tracing::debug!("loaded template {name} from {}", path.display());
            }
        }

        Ok(Self { tera })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String, GushError> {
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(GushError::Template {
                message: format!(
                    "unknown template \"{name}\" (available: {})",
                    self.names().join(", ")
                ),
            });
        }
        self.tera.render(name, context).map_err(template_error)
    }
}

fn template_error(e: tera::Error) -> GushError {
    use std::error::Error;
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    GushError::Template { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_template_defaults() {
        let templates = Templates::new(None).unwrap();
        let mut ctx = Context::new();
        ctx.insert("description", "Adds Jira support");
        ctx.insert("bug_fix", "yes");
        let body = templates.render("table", &ctx).unwrap();
        assert!(body.contains("| Bug fix?      | yes"));
        assert!(body.contains("| License       | MIT"));
        assert!(body.ends_with("Adds Jira support\n"));
    }

    #[test]
    fn test_release_template_lists_commits() {
        let templates = Templates::new(None).unwrap();
        let mut ctx = Context::new();
        ctx.insert("commits", &vec!["abc123 Fix typo", "def456 Add release:create"]);
        assert_eq!(
            templates.render("release", &ctx).unwrap(),
            "* abc123 Fix typo\n* def456 Add release:create\n"
        );
    }

    #[test]
    fn test_user_templates_override_builtins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.tera"), "Custom: {{ description }}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let templates = Templates::new(Some(dir.path())).unwrap();
        let mut ctx = Context::new();
        ctx.insert("description", "hello");
        assert_eq!(templates.render("default", &ctx).unwrap(), "Custom: hello");
        assert!(!templates.names().contains(&"notes"));
    }

    #[test]
    fn test_unknown_template() {
        let templates = Templates::new(None).unwrap();
        let err = templates.render("symfony", &Context::new()).unwrap_err();
        assert!(err.to_string().contains("available: default, merge, release, table"));
    }
}
