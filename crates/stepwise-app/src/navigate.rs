use anyhow::{Context, Result, bail};
use serde_json::Value;
use stepwise_core::definition::WizardDefinition;
use stepwise_core::progress::Payload;
use stepwise_core::wizard::{Outcome, Request, Response, Signal};

use crate::App;
use crate::rules::RuleValidator;

/// One `OWNER.FIELD=VALUE` pair submitted for a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssignment {
    pub owner: String,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRequest {
    pub step: Option<String>,
    pub fields: Vec<FieldAssignment>,
    pub previous: bool,
    pub cancel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub response: Response,
    /// Required fields that kept a submitted step from proceeding.
    pub missing_fields: Vec<String>,
}

pub fn parse_assignment(raw: &str) -> Result<FieldAssignment> {
    let Some((path, value)) = raw.split_once('=') else {
        bail!("invalid field assignment '{raw}': expected OWNER.FIELD=VALUE");
    };

    let Some((owner, field)) = path.trim().split_once('.') else {
        bail!("invalid field assignment '{raw}': expected OWNER.FIELD before '='");
    };

    if owner.is_empty() || field.is_empty() {
        bail!("invalid field assignment '{raw}': owner and field must be non-empty");
    }

    Ok(FieldAssignment {
        owner: owner.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn build_payload(fields: &[FieldAssignment]) -> Option<Payload> {
    if fields.is_empty() {
        return None;
    }

    let mut payload = Payload::new();
    for assignment in fields {
        let owner = payload
            .entry(assignment.owner.clone())
            .or_insert_with(|| Value::Object(Payload::new()));
        if let Value::Object(values) = owner {
            values.insert(
                assignment.field.clone(),
                Value::String(assignment.value.clone()),
            );
        }
    }
    Some(payload)
}

impl<'a> App<'a> {
    pub fn step(&self, definition: &WizardDefinition, request: StepRequest) -> Result<StepResult> {
        let submitted = !request.fields.is_empty();
        let signal = if request.cancel {
            Some(Signal::Cancel)
        } else if request.previous {
            Some(Signal::Previous)
        } else {
            None
        };

        let wizard_request = Request {
            step: request.step.clone(),
            payload: build_payload(&request.fields),
            signal,
        };

        let response = self
            .wizard(definition)
            .process(wizard_request)
            .with_context(|| match &request.step {
                Some(step) => format!("failed to process wizard step '{step}'"),
                None => "failed to process wizard request".to_string(),
            })?;

        let missing_fields = match &response.outcome {
            Outcome::Render {
                data: Some(data), ..
            } if submitted && definition.spec.auto_validate && signal.is_none() => {
                RuleValidator::new(definition.rules.clone())
                    .missing_in_payload(&definition.spec.data_owners, data)
            }
            _ => Vec::new(),
        };

        Ok(StepResult {
            response,
            missing_fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_assignment_splits_owner_field_and_value() {
        let assignment = parse_assignment("Account.email=a=b@c.d").expect("assignment");
        assert_eq!(assignment.owner, "Account");
        assert_eq!(assignment.field, "email");
        assert_eq!(assignment.value, "a=b@c.d");
    }

    #[test]
    fn parse_assignment_rejects_malformed_input() {
        for raw in ["email", "email=x", ".email=x", "Account.=x"] {
            assert!(parse_assignment(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn payload_groups_fields_by_owner() {
        let fields = vec![
            parse_assignment("Account.email=a@b.c").expect("assignment"),
            parse_assignment("Account.name=Ada").expect("assignment"),
            parse_assignment("Profile.bio=").expect("assignment"),
        ];

        let payload = build_payload(&fields).expect("payload");
        assert_eq!(
            Value::Object(payload),
            serde_json::json!({
                "Account": {"email": "a@b.c", "name": "Ada"},
                "Profile": {"bio": ""}
            })
        );
        assert_eq!(build_payload(&[]), None);
    }
}
