//! Shell-sourceable binding file
//!
//! The binding is stored as `export KEY='value'` lines so operators can
//! `source` it and hand the values to other tooling. Files holding only
//! `EXTERNAL_ID` and `INTEGRATION_ID` (no state line) are read as synced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{Binding, BindingState};
use crate::store::{BindingStore, BindingStoreError};

pub const KEY_INTEGRATION_ID: &str = "INTEGRATION_ID";
pub const KEY_EXTERNAL_ID: &str = "EXTERNAL_ID";
pub const KEY_ROLE_ARN: &str = "ROLE_ARN";
pub const KEY_DEFAULT_EXTERNAL_ID: &str = "DEFAULT_EXTERNAL_ID";
pub const KEY_STATE: &str = "BINDING_STATE";
pub const KEY_UPDATED_AT: &str = "BINDING_UPDATED_AT";

const HEADER: &str = "# Managed by integration-sync. Source this file to export the current binding.";

/// Binding store backed by a shell `export` file such as `env_vars.sh`.
pub struct ShellEnvBindingStore {
    path: PathBuf,
}

impl ShellEnvBindingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "binding".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read_pairs(&self) -> Result<Option<BTreeMap<String, String>>, BindingStoreError> {
        match dotenvy::from_path_iter(&self.path) {
            Ok(iter) => {
                let mut values = BTreeMap::new();
                for item in iter {
                    let (key, value) = item.map_err(|source| BindingStoreError::Parse {
                        path: self.display_path(),
                        source,
                    })?;
                    values.insert(key, value);
                }
                Ok(Some(values))
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(source) => Err(BindingStoreError::Parse {
                path: self.display_path(),
                source,
            }),
        }
    }

    fn parse_binding(
        &self,
        mut values: BTreeMap<String, String>,
    ) -> Result<Binding, BindingStoreError> {
        let mut required = |key: &'static str| {
            values
                .remove(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BindingStoreError::Incomplete {
                    path: self.display_path(),
                    key,
                })
        };
        let integration_id = required(KEY_INTEGRATION_ID)?;
        let current_external_id = required(KEY_EXTERNAL_ID)?;

        let state = match values.remove(KEY_STATE).filter(|v| !v.is_empty()) {
            Some(raw) => raw
                .parse::<BindingState>()
                .map_err(|e| BindingStoreError::InvalidValue {
                    path: self.display_path(),
                    key: KEY_STATE,
                    reason: e.to_string(),
                })?,
            None => BindingState::Synced,
        };

        let updated_at = match values.remove(KEY_UPDATED_AT).filter(|v| !v.is_empty()) {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| BindingStoreError::InvalidValue {
                        path: self.display_path(),
                        key: KEY_UPDATED_AT,
                        reason: e.to_string(),
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(Binding {
            integration_id,
            current_external_id,
            role_arn: values.remove(KEY_ROLE_ARN).unwrap_or_default(),
            default_external_id: values.remove(KEY_DEFAULT_EXTERNAL_ID).unwrap_or_default(),
            state,
            updated_at,
        })
    }
}

/// Render one `export KEY='value'` line.
fn export_line(key: &'static str, value: &str) -> Result<String, BindingStoreError> {
    if let Some(bad) = value.chars().find(|c| matches!(c, '\'' | '\n' | '\r' | '\0')) {
        return Err(BindingStoreError::UnsafeValue {
            key,
            reason: format!("contains {:?}", bad),
        });
    }
    Ok(format!("export {}='{}'\n", key, value))
}

fn render(binding: &Binding) -> Result<String, BindingStoreError> {
    let updated_at = binding
        .updated_at
        .unwrap_or_else(Utc::now)
        .to_rfc3339();

    let mut contents = String::from(HEADER);
    contents.push('\n');
    contents.push_str(&export_line(KEY_INTEGRATION_ID, &binding.integration_id)?);
    contents.push_str(&export_line(KEY_EXTERNAL_ID, &binding.current_external_id)?);
    contents.push_str(&export_line(KEY_ROLE_ARN, &binding.role_arn)?);
    contents.push_str(&export_line(
        KEY_DEFAULT_EXTERNAL_ID,
        &binding.default_external_id,
    )?);
    contents.push_str(&export_line(KEY_STATE, binding.state.as_str())?);
    contents.push_str(&export_line(KEY_UPDATED_AT, &updated_at)?);
    Ok(contents)
}

#[async_trait]
impl BindingStore for ShellEnvBindingStore {
    async fn load(&self) -> Result<Option<Binding>, BindingStoreError> {
        match self.read_pairs()? {
            Some(values) => self.parse_binding(values).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, binding: &Binding) -> Result<(), BindingStoreError> {
        let contents = render(binding)?;
        let io_err = |source| BindingStoreError::Io {
            path: self.display_path(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, contents).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        debug!(path = %self.display_path(), state = %binding.state, "Binding saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.display_path()
    }
}
