use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured result of running one extraction strategy over a resume's plain text.
///
/// Empty fields are omitted from the serialized output rather than emitted as
/// `null` or `[]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experience: Vec<SectionEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<SectionEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publications: Vec<SectionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<EducationRecord>,
}

/// Education block. Every field is a sequence: extractors naturally yield
/// zero-or-more matches, and a resume may list several schools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationRecord {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub school_name: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpa: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degrees: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub courses: Vec<String>,
}

impl EducationRecord {
    pub fn is_empty(&self) -> bool {
        self.school_name.is_empty()
            && self.gpa.is_empty()
            && self.degrees.is_empty()
            && self.courses.is_empty()
    }
}

/// One item of a free-form resume section (experience, projects, publications).
/// Either a plain line of text or an opaque structured object as returned by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionEntry {
    Text(String),
    Structured(Map<String, Value>),
}

impl ResumeRecord {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone_number.is_none()
            && self.external_links.is_empty()
            && self.experience.is_empty()
            && self.projects.is_empty()
            && self.skills.is_empty()
            && self.interests.is_empty()
            && self.publications.is_empty()
            && self.education.is_none()
    }
}
