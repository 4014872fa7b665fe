//! Named SQL statements
//!
//! All SQL the server runs is looked up here by name. The ingestion engine
//! only binds positional parameters (and appends `VALUES` tuples for multi-row
//! inserts); it never assembles statement text itself.

mod templates;

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

use crate::ingest::config::IngestConfig;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("unknown statement '{0}'")]
    Unknown(String),

    #[error("statement '{name}' has no value for placeholder '{placeholder}'")]
    MissingSubstitution { name: String, placeholder: String },

    #[error("failed to read statement overrides from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of rendered SQL statements.
pub trait StatementProvider: Send + Sync {
    /// A statement whose only placeholder is the schema owner.
    fn statement(&self, name: &str) -> Result<String, StatementError>;

    /// A statement with additional `{{key}}` placeholders filled from `substitutions`.
    fn render(&self, name: &str, substitutions: &[(&str, &str)])
        -> Result<String, StatementError>;
}

/// Template-backed statements with the schema owner applied at construction.
#[derive(Debug, Clone)]
pub struct TemplateStatements {
    owner: String,
    templates: HashMap<String, String>,
    /// Templates that needed only `{{owner}}`, rendered once up front.
    rendered: HashMap<String, String>,
}

impl TemplateStatements {
    /// Built-in templates under the given schema owner prefix ("" for none).
    pub fn builtin(owner: impl Into<String>) -> Self {
        let templates = templates::BUILTIN
            .iter()
            .map(|(name, sql)| (name.to_string(), sql.to_string()))
            .collect();
        Self::from_templates(owner.into(), templates)
    }

    /// Built-in templates plus any overrides from `config.sql_dir`.
    pub fn from_config(config: &IngestConfig) -> Result<Self, StatementError> {
        let statements = Self::builtin(config.schema_owner.clone());
        match &config.sql_dir {
            Some(dir) => statements.with_overrides_from_dir(dir),
            None => Ok(statements),
        }
    }

    /// Replace or add templates from `<name>.sql` files in `dir`.
    pub fn with_overrides_from_dir(self, dir: &Path) -> Result<Self, StatementError> {
        let io_err = |source| StatementError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut templates = self.templates;
        let mut overridden = 0usize;
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let sql = std::fs::read_to_string(&path).map_err(|source| StatementError::Io {
                path: path.clone(),
                source,
            })?;
            templates.insert(name.to_string(), sql.trim().to_string());
            overridden += 1;
        }

        tracing::info!(dir = %dir.display(), overridden, "Loaded statement overrides");
        Ok(Self::from_templates(self.owner, templates))
    }

    fn from_templates(owner: String, templates: HashMap<String, String>) -> Self {
        let rendered = templates
            .iter()
            .filter_map(|(name, sql)| {
                substitute(name, sql, &owner, &[])
                    .ok()
                    .map(|text| (name.clone(), text))
            })
            .collect();

        Self {
            owner,
            templates,
            rendered,
        }
    }

    /// Number of distinct statement names available.
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }
}

impl StatementProvider for TemplateStatements {
    fn statement(&self, name: &str) -> Result<String, StatementError> {
        if let Some(sql) = self.rendered.get(name) {
            return Ok(sql.clone());
        }
        self.render(name, &[])
    }

    fn render(
        &self,
        name: &str,
        substitutions: &[(&str, &str)],
    ) -> Result<String, StatementError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| StatementError::Unknown(name.to_string()))?;
        substitute(name, template, &self.owner, substitutions)
    }
}

fn substitute(
    name: &str,
    template: &str,
    owner: &str,
    substitutions: &[(&str, &str)],
) -> Result<String, StatementError> {
    let mut missing = None;
    let text = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        if key == "owner" {
            return owner.to_string();
        }
        match substitutions.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => value.to_string(),
            None => {
                missing.get_or_insert_with(|| key.to_string());
                String::new()
            },
        }
    });

    match missing {
        Some(placeholder) => Err(StatementError::MissingSubstitution {
            name: name.to_string(),
            placeholder,
        }),
        None => Ok(text.into_owned()),
    }
}
