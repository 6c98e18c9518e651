//! Composes pattern extractor output into a `ResumeRecord`.

use crate::extraction::patterns::{
    extract_degrees, extract_email, extract_gpa, extract_links, extract_phone,
    extract_school_names,
};
use crate::models::resume::{EducationRecord, ResumeRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerOptions {
    /// Attach education only when a school name was found, even if a GPA or
    /// degree matched. Off by default: each education field stands on its own.
    pub require_school_for_education: bool,
}

/// Runs every extractor over `text` and keeps whatever matched.
/// Never fails; a text with no matches yields an empty record.
pub fn assemble(text: &str, options: AssemblerOptions) -> ResumeRecord {
    let education = EducationRecord {
        school_name: extract_school_names(text),
        gpa: extract_gpa(text),
        degrees: extract_degrees(text),
        courses: Vec::new(),
    };

    let attach_education = if options.require_school_for_education {
        !education.school_name.is_empty()
    } else {
        !education.is_empty()
    };

    ResumeRecord {
        email: extract_email(text),
        phone_number: extract_phone(text),
        external_links: extract_links(text),
        education: attach_education.then_some(education),
        ..Default::default()
    }
}
