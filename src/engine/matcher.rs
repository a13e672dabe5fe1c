use serde_json::Value;

use crate::models::automation::{AutomationDefinition, TriggerType};
use crate::models::lead::Lead;

/// Decides whether one candidate definition's extra condition holds for
/// a lead. The caller has already filtered on business and trigger
/// type; this is purely the trigger-specific condition.
///
/// A misconfigured condition (empty keyword, unparseable target stage)
/// is silently inert, never an error.
pub fn matches_trigger(definition: &AutomationDefinition, lead: &Lead) -> bool {
    match definition.trigger_type {
        TriggerType::NewLead | TriggerType::Timed => true,
        TriggerType::Keyword => {
            let Some(keyword) = extract_keyword(definition.trigger_value.as_ref()) else {
                return false;
            };
            let needle = keyword.to_lowercase();
            let name = lead.name.to_lowercase();
            let message = lead
                .last_message
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();
            name.contains(&needle) || message.contains(&needle)
        }
        TriggerType::StageChange => {
            let Some(target) = extract_stage(definition.trigger_value.as_ref()) else {
                return false;
            };
            lead.stage == target
        }
    }
}

/// Keyword from a trigger payload that is either a raw string or a
/// mapping with a `keyword` field. Empty keywords never match.
fn extract_keyword(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("keyword").and_then(|v| v.as_str()),
        _ => None,
    }?;
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Target stage from a trigger payload: a JSON number, a numeric
/// string, or a mapping with a `stage` field holding either.
fn extract_stage(value: Option<&Value>) -> Option<i32> {
    let value = match value? {
        Value::Object(map) => map.get("stage")?,
        other => other,
    };
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::automation::ActionType;
    use serde_json::json;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn definition(trigger_type: TriggerType, trigger_value: Option<Value>) -> AutomationDefinition {
        let now = OffsetDateTime::now_utc();
        AutomationDefinition {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "test".to_string(),
            trigger_type,
            trigger_value,
            action_type: ActionType::AddTag,
            action_config: json!({"tag": "t"}),
            delay_seconds: 0,
            is_active: true,
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn lead(name: &str, last_message: Option<&str>, stage: i32) -> Lead {
        let now = OffsetDateTime::now_utc();
        Lead {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: name.to_string(),
            phone: "15550000000".to_string(),
            stage,
            tags: Vec::new(),
            last_message: last_message.map(|m| m.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_lead_and_timed_always_match() {
        let l = lead("Anyone", None, 1);
        assert!(matches_trigger(&definition(TriggerType::NewLead, None), &l));
        assert!(matches_trigger(&definition(TriggerType::Timed, None), &l));
    }

    #[test]
    fn keyword_matches_last_message_case_insensitively() {
        let def = definition(TriggerType::Keyword, Some(json!("demo")));
        let l = lead("Jordan", Some("Can we get a DEMO?"), 1);
        assert!(matches_trigger(&def, &l));
    }

    #[test]
    fn keyword_matches_lead_name() {
        let def = definition(TriggerType::Keyword, Some(json!({"keyword": "acme"})));
        let l = lead("Pat from ACME Corp", None, 1);
        assert!(matches_trigger(&def, &l));
    }

    #[test]
    fn keyword_misses_when_absent_from_both_fields() {
        let def = definition(TriggerType::Keyword, Some(json!("pricing")));
        let l = lead("Jordan", Some("just saying hi"), 1);
        assert!(!matches_trigger(&def, &l));
    }

    #[test]
    fn empty_keyword_never_matches() {
        let l = lead("demo", Some("demo demo demo"), 1);
        assert!(!matches_trigger(
            &definition(TriggerType::Keyword, Some(json!(""))),
            &l
        ));
        assert!(!matches_trigger(
            &definition(TriggerType::Keyword, Some(json!({"keyword": ""}))),
            &l
        ));
        assert!(!matches_trigger(&definition(TriggerType::Keyword, None), &l));
    }

    #[test]
    fn stage_change_matches_exact_stage_only() {
        let def = definition(TriggerType::StageChange, Some(json!(3)));
        assert!(matches_trigger(&def, &lead("L", None, 3)));
        assert!(!matches_trigger(&def, &lead("L", None, 2)));
    }

    #[test]
    fn stage_change_normalizes_numeric_strings_and_mappings() {
        let l = lead("L", None, 4);
        assert!(matches_trigger(
            &definition(TriggerType::StageChange, Some(json!("4"))),
            &l
        ));
        assert!(matches_trigger(
            &definition(TriggerType::StageChange, Some(json!({"stage": "4"}))),
            &l
        ));
    }

    #[test]
    fn unparseable_stage_target_never_matches() {
        let l = lead("L", None, 1);
        assert!(!matches_trigger(
            &definition(TriggerType::StageChange, Some(json!("qualified"))),
            &l
        ));
        assert!(!matches_trigger(
            &definition(TriggerType::StageChange, None),
            &l
        ));
    }
}
