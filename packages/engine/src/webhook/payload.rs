use common::{FailureKind, Response};
use serde_json::{Map, Value, json};

/// Placeholders recognised in custom payload templates.
pub const TEMPLATE_TOKENS: &[&str] = &["nps_score", "feedback", "campaign_id", "response_id"];

/// Payload sent when no template is configured, and the base custom templates merge over.
pub fn default_payload(response: &Response) -> Map<String, Value> {
    let value = json!({
        "campaign_id": response.campaign_id,
        "response_id": response.id,
        "nps_score": response.nps_score,
        "feedback": response.feedback,
        "source_id": response.source_id,
        "situation_id": response.situation_id,
        "group_id": response.group_id,
        "created_at": response.created_at.to_rfc3339(),
        "form_responses": response.form_responses,
    });

    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn token_value(token: &str, response: &Response) -> Option<String> {
    match token {
        "nps_score" => Some(response.nps_score.to_string()),
        "feedback" => Some(response.feedback.clone().unwrap_or_default()),
        "campaign_id" => Some(response.campaign_id.clone()),
        "response_id" => Some(response.id.clone()),
        _ => None,
    }
}

/// Escape a value for insertion inside a JSON string literal.
fn json_escaped(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Replace every `{{token}}` with the response's value for it.
///
/// Values are JSON-escaped so respondent text cannot break the template.
/// Unknown tokens are left untouched.
pub fn render_template(template: &str, response: &Response) -> String {
    let mut rendered = template.to_string();
    for token in TEMPLATE_TOKENS {
        if let Some(value) = token_value(token, response) {
            rendered = rendered.replace(&format!("{{{{{token}}}}}"), &json_escaped(&value));
        }
    }
    rendered
}

/// Build the final request body.
///
/// A custom template must render to a JSON object; its keys override the
/// default payload's keys, everything else is kept.
pub fn build_payload(template: Option<&str>, response: &Response) -> Result<Value, FailureKind> {
    let mut payload = default_payload(response);

    let Some(template) = template.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(Value::Object(payload));
    };

    let rendered = render_template(template, response);
    match serde_json::from_str::<Value>(&rendered) {
        Ok(Value::Object(custom)) => {
            payload.extend(custom);
            Ok(Value::Object(payload))
        }
        Ok(other) => Err(FailureKind::InvalidPayload {
            detail: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(FailureKind::InvalidPayload {
            detail: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
