// Prompt template for model-based resume parsing.
// Sent as the single user-role message of the completion request.

pub const RESUME_PARSE_PROMPT: &str = r#"Parse this resume and return ONLY a JSON object. No markdown fences, no explanations.

OUTPUT SCHEMA (omit any field you cannot find):
{
  "email": "string",
  "phone_number": "string",
  "external_links": ["string"],
  "experience": ["string or object"],
  "projects": ["string or object"],
  "skills": ["string"],
  "interests": ["string"],
  "publications": ["string or object"],
  "education": {
    "school_name": ["string"],
    "gpa": ["string"],
    "degrees": ["string"],
    "courses": ["string"]
  }
}

RESUME:
{resume_text}"#;

pub fn build_resume_prompt(resume_text: &str) -> String {
    RESUME_PARSE_PROMPT.replace("{resume_text}", resume_text)
}
