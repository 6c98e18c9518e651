//! LLM Structured Parser — alternative to the pattern extractors that asks a
//! completion service for the whole `ResumeRecord` at once.
//!
//! Model output is loosely typed: a field the schema calls a list may come back
//! as a string, a number, or an object of lists. Every field is first decoded
//! into `LooseValue`, then normalized into the canonical record before it
//! leaves this module. Untyped values never reach callers.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::errors::AppError;
use crate::extraction::prompts::build_resume_prompt;
use crate::llm_client::{
    strip_json_fences, strip_reasoning, ChatMessage, CompletionRequest, CompletionService,
    LlmError, ResponseFormat,
};
use crate::models::resume::{EducationRecord, ResumeRecord, SectionEntry};

/// Any JSON value a model may place in a resume field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Null,
    Flag(bool),
    Number(Number),
    Text(String),
    List(Vec<LooseValue>),
    Object(Map<String, Value>),
}

impl From<Value> for LooseValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => LooseValue::Null,
            Value::Bool(b) => LooseValue::Flag(b),
            Value::Number(n) => LooseValue::Number(n),
            Value::String(s) => LooseValue::Text(s),
            Value::Array(items) => LooseValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => LooseValue::Object(map),
        }
    }
}

impl LooseValue {
    /// First non-empty scalar, searching lists in order.
    fn first_text(&self) -> Option<String> {
        match self {
            LooseValue::Text(s) => non_empty(s),
            LooseValue::Number(n) => Some(n.to_string()),
            LooseValue::List(items) => items.iter().find_map(LooseValue::first_text),
            LooseValue::Object(_) | LooseValue::Flag(_) | LooseValue::Null => None,
        }
    }

    /// Flattens nested lists and objects into their string leaves.
    fn collect_strings(self, out: &mut Vec<String>) {
        match self {
            LooseValue::Text(s) => {
                if let Some(s) = non_empty(&s) {
                    out.push(s);
                }
            }
            LooseValue::Number(n) => out.push(n.to_string()),
            LooseValue::List(items) => {
                for item in items {
                    item.collect_strings(out);
                }
            }
            LooseValue::Object(map) => {
                for (_, value) in map {
                    LooseValue::from(value).collect_strings(out);
                }
            }
            LooseValue::Flag(_) | LooseValue::Null => {}
        }
    }

    /// Strings become text entries, objects stay structured.
    fn collect_entries(self, out: &mut Vec<SectionEntry>) {
        match self {
            LooseValue::Text(s) => {
                if let Some(s) = non_empty(&s) {
                    out.push(SectionEntry::Text(s));
                }
            }
            LooseValue::Number(n) => out.push(SectionEntry::Text(n.to_string())),
            LooseValue::List(items) => {
                for item in items {
                    item.collect_entries(out);
                }
            }
            LooseValue::Object(map) => {
                if !map.is_empty() {
                    out.push(SectionEntry::Structured(map));
                }
            }
            LooseValue::Flag(_) | LooseValue::Null => {}
        }
    }
}

/// Wire shape of the model's reply. Unknown fields are ignored; alternate
/// key spellings are folded in by [`fold_alias`] before decoding.
#[derive(Debug, Default, Deserialize)]
struct RawResume {
    #[serde(default)]
    email: Option<LooseValue>,
    #[serde(default)]
    phone_number: Option<LooseValue>,
    #[serde(default)]
    external_links: Option<LooseValue>,
    #[serde(default)]
    experience: Option<LooseValue>,
    #[serde(default)]
    projects: Option<LooseValue>,
    #[serde(default)]
    skills: Option<LooseValue>,
    #[serde(default)]
    interests: Option<LooseValue>,
    #[serde(default)]
    publications: Option<LooseValue>,
    #[serde(default)]
    education: Option<LooseValue>,
}

impl RawResume {
    fn normalize(self) -> ResumeRecord {
        ResumeRecord {
            email: self.email.as_ref().and_then(LooseValue::first_text),
            phone_number: self.phone_number.as_ref().and_then(LooseValue::first_text),
            external_links: strings(self.external_links),
            experience: entries(self.experience),
            projects: entries(self.projects),
            skills: strings(self.skills),
            interests: strings(self.interests),
            publications: entries(self.publications),
            education: self.education.and_then(normalize_education),
        }
    }
}

fn strings(value: Option<LooseValue>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(value) = value {
        value.collect_strings(&mut out);
    }
    dedupe_in_order(out)
}

fn entries(value: Option<LooseValue>) -> Vec<SectionEntry> {
    let mut out = Vec::new();
    if let Some(value) = value {
        value.collect_entries(&mut out);
    }
    out
}

fn normalize_education(value: LooseValue) -> Option<EducationRecord> {
    let mut record = EducationRecord::default();
    merge_education(value, &mut record);

    record.school_name = dedupe_in_order(record.school_name);
    record.gpa = dedupe_in_order(record.gpa);
    record.degrees = dedupe_in_order(record.degrees);
    record.courses = dedupe_in_order(record.courses);

    (!record.is_empty()).then_some(record)
}

/// Accepts a single education object, a list of them (one per school), or a
/// bare string naming the school.
fn merge_education(value: LooseValue, record: &mut EducationRecord) {
    match value {
        LooseValue::Object(map) => {
            for (key, field) in map {
                let field = LooseValue::from(field);
                match key.as_str() {
                    "school_name" | "school" | "institution" => {
                        field.collect_strings(&mut record.school_name)
                    }
                    "gpa" => field.collect_strings(&mut record.gpa),
                    "degrees" | "degree" => field.collect_strings(&mut record.degrees),
                    "courses" | "relevant_courses" => field.collect_strings(&mut record.courses),
                    _ => {}
                }
            }
        }
        LooseValue::List(items) => {
            for item in items {
                merge_education(item, record);
            }
        }
        LooseValue::Text(s) => {
            if let Some(s) = non_empty(&s) {
                record.school_name.push(s);
            }
        }
        LooseValue::Number(_) | LooseValue::Flag(_) | LooseValue::Null => {}
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn dedupe_in_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Decodes a model reply into a `ResumeRecord`. The reply must be a JSON
/// object, optionally wrapped in code fences or preceded by a reasoning block.
pub fn decode_resume(content: &str) -> Result<ResumeRecord, AppError> {
    let payload = strip_json_fences(strip_reasoning(content));
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| AppError::Decode(format!("model reply is not JSON: {e}")))?;

    // A derived Deserialize also accepts arrays positionally.
    let Value::Object(mut map) = value else {
        return Err(AppError::Decode(
            "model reply is not a resume object".to_string(),
        ));
    };

    fold_alias(&mut map, "phone", "phone_number");
    fold_alias(&mut map, "links", "external_links");

    let raw = RawResume::deserialize(Value::Object(map))
        .map_err(|e| AppError::Decode(format!("model reply is not a resume object: {e}")))?;
    Ok(raw.normalize())
}

/// Moves `alias` under `canonical`. When both are present the canonical value
/// comes first, so scalar fields keep it and list fields get both.
fn fold_alias(map: &mut Map<String, Value>, alias: &str, canonical: &str) {
    let Some(aliased) = map.remove(alias) else {
        return;
    };
    let merged = match map.remove(canonical) {
        None | Some(Value::Null) => aliased,
        Some(existing) => Value::Array(vec![existing, aliased]),
    };
    map.insert(canonical.to_string(), merged);
}

/// Sends `text` to the completion service with the resume schema prompt and
/// decodes the first choice. Any failure discards the whole record.
pub async fn parse_via_model(
    text: &str,
    client: &dyn CompletionService,
    model: &str,
) -> Result<ResumeRecord, AppError> {
    let request = CompletionRequest {
        model: model.to_string(),
        response_format: ResponseFormat::JsonObject,
        messages: vec![ChatMessage::user(build_resume_prompt(text))],
    };

    let completion = client.complete(&request).await?;
    let content = completion
        .text()
        .ok_or_else(|| AppError::from(LlmError::EmptyContent))?;

    debug!("Model reply: {} chars", content.len());
    decode_resume(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::llm_client::{Choice, ChoiceMessage, Completion};

    /// Replies with a fixed result and remembers the last request.
    struct ScriptedService {
        reply: fn() -> Result<Completion, LlmError>,
        seen: Mutex<Option<CompletionRequest>>,
    }

    impl ScriptedService {
        fn new(reply: fn() -> Result<Completion, LlmError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedService {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            (self.reply)()
        }
    }

    fn completion_with(content: &str) -> Completion {
        Completion {
            choices: vec![Choice {
                message: ChoiceMessage {
                    content: Some(content.to_string()),
                },
            }],
            usage: None,
        }
    }

    #[test]
    fn test_decode_source_shape_with_scalar_education() {
        let reply = r#"{
            "email": "jane.doe@example.com",
            "phone_number": "555-123-4567",
            "external_links": ["https://github.com/janedoe"],
            "experience": ["Engineer at Acme"],
            "skills": ["Rust", "Go"],
            "education": {
                "school_name": "Northwestern University",
                "gpa": "3.85",
                "degrees": ["B.S. Computer Science"],
                "courses": ["Compilers"]
            }
        }"#;
        let record = decode_resume(reply).unwrap();
        assert_eq!(record.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(record.phone_number.as_deref(), Some("555-123-4567"));
        assert_eq!(record.skills, vec!["Rust", "Go"]);
        assert_eq!(
            record.experience,
            vec![SectionEntry::Text("Engineer at Acme".to_string())]
        );
        let education = record.education.unwrap();
        assert_eq!(education.school_name, vec!["Northwestern University"]);
        assert_eq!(education.gpa, vec!["3.85"]);
        assert_eq!(education.courses, vec!["Compilers"]);
    }

    #[test]
    fn test_decode_tolerates_unexpected_types() {
        let reply = r#"{
            "email": ["first@example.com", "second@example.com"],
            "phone_number": 5551234567,
            "skills": {"languages": ["Rust", "Python"], "tools": "Docker"},
            "interests": "chess",
            "experience": [{"company": "Acme", "role": "SRE"}, "Freelance", null],
            "publications": null,
            "education": {"gpa": 3.9, "school_name": ["MIT", "MIT"]}
        }"#;
        let record = decode_resume(reply).unwrap();
        assert_eq!(record.email.as_deref(), Some("first@example.com"));
        assert_eq!(record.phone_number.as_deref(), Some("5551234567"));
        assert_eq!(record.skills, vec!["Rust", "Python", "Docker"]);
        assert_eq!(record.interests, vec!["chess"]);
        assert_eq!(record.experience.len(), 2);
        assert!(matches!(record.experience[0], SectionEntry::Structured(_)));
        assert!(record.publications.is_empty());
        let education = record.education.unwrap();
        assert_eq!(education.gpa, vec!["3.9"]);
        assert_eq!(education.school_name, vec!["MIT"]);
    }

    #[test]
    fn test_decode_merges_education_list() {
        let reply = r#"{"education": [
            {"school_name": "Oberlin College", "degrees": ["BA"]},
            {"institution": "Yale Law School", "degree": "JD", "gpa": "3.7"}
        ]}"#;
        let education = decode_resume(reply).unwrap().education.unwrap();
        assert_eq!(education.school_name, vec!["Oberlin College", "Yale Law School"]);
        assert_eq!(education.degrees, vec!["BA", "JD"]);
        assert_eq!(education.gpa, vec!["3.7"]);
    }

    #[test]
    fn test_decode_drops_empty_values() {
        let reply = r#"{"email": "", "skills": [], "education": {"school_name": "  "}}"#;
        let record = decode_resume(reply).unwrap();
        assert!(record.is_empty());
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({}));
    }

    #[test]
    fn test_decode_strips_fences_and_reasoning() {
        let reply = "<think>checking fields</think>\n```json\n{\"email\": \"a@b.io\"}\n```";
        let record = decode_resume(reply).unwrap();
        assert_eq!(record.email.as_deref(), Some("a@b.io"));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode_resume("Sure! Here is the resume you asked for.").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_non_object_top_level() {
        assert!(matches!(
            decode_resume(r#"["jane@example.com"]"#),
            Err(AppError::Decode(_))
        ));
        assert!(matches!(decode_resume("42"), Err(AppError::Decode(_))));
        assert!(matches!(
            decode_resume(r#"["a@b.io", "555-000-1111", ["https://x.dev"]]"#),
            Err(AppError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_accepts_alternate_key_spellings() {
        let record = decode_resume(r#"{"phone": "555-000-1111", "links": "https://x.dev"}"#).unwrap();
        assert_eq!(record.phone_number.as_deref(), Some("555-000-1111"));
        assert_eq!(record.external_links, vec!["https://x.dev"]);
    }

    #[test]
    fn test_decode_merges_both_key_spellings() {
        let reply = r#"{
            "phone": "1",
            "phone_number": "2",
            "links": ["https://b.dev"],
            "external_links": ["https://a.dev", "https://b.dev"]
        }"#;
        let record = decode_resume(reply).unwrap();
        assert_eq!(record.phone_number.as_deref(), Some("2"));
        assert_eq!(record.external_links, vec!["https://a.dev", "https://b.dev"]);
    }

    #[tokio::test]
    async fn test_parse_via_model_sends_single_json_request() {
        let service = ScriptedService::new(|| Ok(completion_with(r#"{"email": "x@y.dev"}"#)));
        let record = parse_via_model("RESUME BODY", &service, "test-model")
            .await
            .unwrap();
        assert_eq!(record.email.as_deref(), Some("x@y.dev"));

        let request = service.seen.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "test-model");
        assert_eq!(request.response_format, ResponseFormat::JsonObject);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert!(request.messages[0].content.contains("RESUME BODY"));
        assert!(request.messages[0].content.contains("school_name"));
    }

    #[tokio::test]
    async fn test_parse_via_model_invalid_json_is_decode_error() {
        let service = ScriptedService::new(|| Ok(completion_with("not json at all")));
        let err = parse_via_model("text", &service, "m").await.unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[tokio::test]
    async fn test_parse_via_model_transport_failure_is_upstream_error() {
        let service = ScriptedService::new(|| {
            Err(LlmError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            })
        });
        let err = parse_via_model("text", &service, "m").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(msg) if msg.contains("service unavailable")));
    }

    #[tokio::test]
    async fn test_parse_via_model_without_choices_is_decode_error() {
        let service = ScriptedService::new(|| Ok(Completion::default()));
        let err = parse_via_model("text", &service, "m").await.unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }
}
