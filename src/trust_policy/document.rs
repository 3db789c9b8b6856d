//! Trust policy document handling
//!
//! Works on the raw JSON so that statements and keys this tool does not know
//! about are written back exactly as they were read.

use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::trust_policy::TrustPolicyError;

/// Condition key holding the shared secret.
pub const EXTERNAL_ID_CONDITION_KEY: &str = "sts:ExternalId";

/// An `AssumeRolePolicyDocument`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustPolicyDocument {
    value: Value,
}

impl TrustPolicyDocument {
    /// Parse a document as returned by IAM.
    ///
    /// `GetRole` returns the policy URL-encoded; already-decoded JSON is
    /// accepted as is.
    pub fn parse(raw: &str) -> Result<Self, TrustPolicyError> {
        let trimmed = raw.trim();
        let decoded = if trimmed.starts_with('{') {
            trimmed.to_string()
        } else {
            percent_decode_str(trimmed)
                .decode_utf8()
                .map_err(|e| TrustPolicyError::MalformedDocument(e.to_string()))?
                .into_owned()
        };

        let value: Value = serde_json::from_str(&decoded)
            .map_err(|e| TrustPolicyError::MalformedDocument(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, TrustPolicyError> {
        match value.get("Statement") {
            Some(Value::Array(_)) | Some(Value::Object(_)) => Ok(Self { value }),
            Some(_) => Err(TrustPolicyError::MalformedDocument(
                "Statement must be an object or an array".to_string(),
            )),
            None => Err(TrustPolicyError::MalformedDocument(
                "document has no Statement".to_string(),
            )),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Compact JSON for `UpdateAssumeRolePolicy`.
    pub fn to_json(&self) -> String {
        self.value.to_string()
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.value).unwrap_or_else(|_| self.to_json())
    }

    fn statements(&self) -> Vec<&Value> {
        match self.value.get("Statement") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single) if single.is_object() => vec![single],
            _ => Vec::new(),
        }
    }

    fn statements_mut(&mut self) -> Vec<&mut Value> {
        match self.value.get_mut("Statement") {
            Some(Value::Array(items)) => items.iter_mut().collect(),
            Some(single) if single.is_object() => vec![single],
            _ => Vec::new(),
        }
    }

    /// Every external ID value found under `Condition.StringEquals`.
    pub fn external_ids(&self) -> Vec<&str> {
        self.statements()
            .into_iter()
            .filter_map(external_id_condition)
            .flat_map(|value| match value {
                Value::String(s) => vec![s.as_str()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            })
            .collect()
    }

    /// Number of statements whose external ID condition contains `external_id`.
    pub fn statements_with(&self, external_id: &str) -> usize {
        self.statements()
            .into_iter()
            .filter_map(external_id_condition)
            .filter(|value| condition_matches(value, external_id))
            .count()
    }

    /// Replace `old` with `new` in every statement's external ID condition.
    ///
    /// Returns the number of statements rewritten.
    pub fn replace_external_id(&mut self, old: &str, new: &str) -> usize {
        let mut rewritten = 0;
        for statement in self.statements_mut() {
            let Some(value) = external_id_condition_mut(statement) else {
                continue;
            };
            let mut touched = false;
            match value {
                Value::String(current) if current.as_str() == old => {
                    *current = new.to_string();
                    touched = true;
                }
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        if item.as_str() == Some(old) {
                            *item = Value::String(new.to_string());
                            touched = true;
                        }
                    }
                }
                _ => {}
            }
            if touched {
                rewritten += 1;
            }
        }
        rewritten
    }
}

fn external_id_condition(statement: &Value) -> Option<&Value> {
    statement
        .get("Condition")?
        .get("StringEquals")?
        .get(EXTERNAL_ID_CONDITION_KEY)
}

fn external_id_condition_mut(statement: &mut Value) -> Option<&mut Value> {
    statement
        .get_mut("Condition")?
        .get_mut("StringEquals")?
        .get_mut(EXTERNAL_ID_CONDITION_KEY)
}

fn condition_matches(value: &Value, external_id: &str) -> bool {
    match value {
        Value::String(s) => s == external_id,
        Value::Array(items) => items.iter().any(|item| item.as_str() == Some(external_id)),
        _ => false,
    }
}
