use std::collections::BTreeMap;

use serde_json::Value;
use stepwise_core::definition::OwnerRules;
use stepwise_core::hooks::PayloadValidator;
use stepwise_core::progress::Payload;

/// Field rules from the definition file: an owner fails when one of its
/// required fields is missing or blank. Owners without rules always pass.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    rules: BTreeMap<String, OwnerRules>,
}

impl RuleValidator {
    pub fn new(rules: BTreeMap<String, OwnerRules>) -> Self {
        Self { rules }
    }

    pub fn missing_fields(&self, owner: &str, data: &Value) -> Vec<String> {
        let Some(rules) = self.rules.get(owner) else {
            return Vec::new();
        };

        rules
            .required
            .iter()
            .filter(|field| data.get(field.as_str()).is_none_or(is_blank))
            .map(|field| format!("{owner}.{field}"))
            .collect()
    }

    /// Missing fields of every declared owner present in `payload`.
    pub fn missing_in_payload(&self, owners: &[String], payload: &Payload) -> Vec<String> {
        payload
            .iter()
            .filter(|(owner, _)| owners.iter().any(|declared| declared == *owner))
            .flat_map(|(owner, data)| self.missing_fields(owner, data))
            .collect()
    }
}

impl PayloadValidator for RuleValidator {
    fn validate(&self, owner: &str, data: &Value) -> bool {
        self.missing_fields(owner, data).is_empty()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
