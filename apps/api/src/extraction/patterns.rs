//! Independent regex scans over a resume's plain text.
//!
//! Every extractor is a pure function. "No match" is an empty result, never an
//! error, and no extractor depends on another having matched.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)+").unwrap()
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{3}-\d{4}\b").unwrap());

// Capitalized words (or "St.") on the same line, a keyword, then a tail cut at
// the next comma, digit, sentence break or line break.
static SCHOOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?:St\.|[A-Z][A-Za-z&'\-]*)[ \t]+)*(?:College|University|Institute|Law School|School of|Academy)[^,\d\r\n.;|()\t\x{2013}\x{2014}]*",
    )
    .unwrap()
});

static GPA_BARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bgpa\s*[:\-]?\s*([0-4]\.\d{1,2})\b(?:\s*/\s*4\.0{1,2}\b)?").unwrap()
});

static GPA_SCALED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bgpa\s*[:\-]?\s*([0-4]\.\d{1,2})\s*/\s*\d\.\d{1,2}\b").unwrap()
});

static GPA_CUMULATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bcumulative\s+gpa\s*[:\-]?\s*([0-4]\.\d{1,2})\b").unwrap()
});

static GPA_OVERALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\boverall\s+gpa\s*[:\-]?\s*([0-4]\.\d{1,2})\b").unwrap()
});

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bhttps?://[^\s<>()\[\]]+|\b(?:www\.)?(?:linkedin\.com|github\.com)/[^\s<>()\[\],;]+",
    )
    .unwrap()
});

static DEGREE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:Bachelor|Master|Doctor|Associate)(?:'s)?(?:[ \t]+of)?(?:[ \t]+[A-Z][A-Za-z]*)+(?:[ \t]+in(?:[ \t]+[A-Z][A-Za-z]*)+)?|\bPh\.?D\b\.?|\bMBA\b",
    )
    .unwrap()
});

const SCHOOL_NAME_MIN_EXCLUSIVE: usize = 2;
const SCHOOL_NAME_MAX_EXCLUSIVE: usize = 100;
const GPA_MIN_LEN: usize = 2;
const GPA_MAX_LEN: usize = 4;
const LINK_TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

/// First email address in document order.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// First `ddd-ddd-dddd` phone number in document order.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_RE.find(text).map(|m| m.as_str().to_string())
}

/// Every school-like phrase, trimmed, length-filtered and deduplicated.
pub fn extract_school_names(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for m in SCHOOL_RE.find_iter(text) {
        // Column layouts pad the school from its dates with runs of spaces;
        // a spaced hyphen separates it from the campus or city.
        let name = m
            .as_str()
            .split("  ")
            .next()
            .and_then(|s| s.split(" - ").next())
            .unwrap_or_default()
            .trim();
        if is_plausible_school_name(name) {
            push_unique(&mut seen, &mut names, name);
        }
    }

    names
}

/// Length strictly between 2 and 100 characters.
pub fn is_plausible_school_name(name: &str) -> bool {
    let len = name.chars().count();
    len > SCHOOL_NAME_MIN_EXCLUSIVE && len < SCHOOL_NAME_MAX_EXCLUSIVE
}

/// The four GPA phrasings, in their default scan order.
pub fn gpa_patterns() -> [&'static Regex; 4] {
    [
        &*GPA_BARE_RE,
        &*GPA_SCALED_RE,
        &*GPA_CUMULATIVE_RE,
        &*GPA_OVERALL_RE,
    ]
}

/// Every GPA value found by any of the four phrasings.
pub fn extract_gpa(text: &str) -> Vec<String> {
    extract_gpa_with(text, &gpa_patterns())
}

/// Runs each pattern over the full text and merges the captures through a
/// seen-set, keeping first-seen order. The resulting set does not depend on
/// the order of `patterns`.
pub fn extract_gpa_with(text: &str, patterns: &[&Regex]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values = Vec::new();

    for pattern in patterns {
        for caps in pattern.captures_iter(text) {
            let Some(value) = caps.get(1) else {
                continue;
            };
            let value = value.as_str().trim();
            if is_valid_gpa(value) {
                push_unique(&mut seen, &mut values, value);
            }
        }
    }

    values
}

/// A GPA capture is kept only when it is 2 to 4 characters long ("4.0", "3.85").
pub fn is_valid_gpa(value: &str) -> bool {
    (GPA_MIN_LEN..=GPA_MAX_LEN).contains(&value.chars().count())
}

/// Web links: full URLs plus bare LinkedIn / GitHub profile paths.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for m in LINK_RE.find_iter(text) {
        let link = m.as_str().trim_end_matches(LINK_TRAILING);
        if !link.is_empty() {
            push_unique(&mut seen, &mut links, link);
        }
    }

    links
}

/// Degree names such as "Bachelor of Science in Computer Science", "Ph.D." or "MBA".
pub fn extract_degrees(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut degrees = Vec::new();

    for m in DEGREE_RE.find_iter(text) {
        let degree = m.as_str().trim();
        if !degree.is_empty() {
            push_unique(&mut seen, &mut degrees, degree);
        }
    }

    degrees
}

fn push_unique(seen: &mut HashSet<String>, out: &mut Vec<String>, value: &str) {
    if seen.insert(value.to_string()) {
        out.push(value.to_string());
    }
}
