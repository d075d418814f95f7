//! Best-effort display names for PDF filenames and letter headers.
//!
//! Each rule is a pure function returning `Option<String>`; the public entry
//! points chain them in priority order and the first `Some` wins. Results are
//! hints, never validated identities.

use regex::Regex;

use crate::text::{non_empty_lines, normalize_text};

pub const FALLBACK_CANDIDATE: &str = "Candidate";
pub const FALLBACK_COMPANY: &str = "Company";

const EMAIL_PATTERN: &str = r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}";
const PHONE_PATTERN: &str = r"\+?\(?\d[\d\s().\-]{7,}\d";
const SEPARATOR_PATTERN: &str = r"\s[-–—]\s|[|·•(,]";

const SECTION_TERMS: [&str; 13] = [
    "summary",
    "experience",
    "education",
    "skills",
    "objective",
    "profile",
    "resume",
    "curriculum",
    "vitae",
    "contact",
    "projects",
    "references",
    "certifications",
];

const ROLE_TERMS: [&str; 33] = [
    "intern",
    "internship",
    "engineer",
    "engineering",
    "developer",
    "manager",
    "analyst",
    "designer",
    "scientist",
    "specialist",
    "coordinator",
    "associate",
    "director",
    "lead",
    "architect",
    "consultant",
    "technician",
    "assistant",
    "administrator",
    "officer",
    "representative",
    "senior",
    "junior",
    "staff",
    "principal",
    "head",
    "sr",
    "jr",
    "programmer",
    "recruiter",
    "researcher",
    "fellow",
    "contractor",
];

const META_TERMS: [&str; 33] = [
    "responsibilities",
    "requirements",
    "qualifications",
    "about",
    "overview",
    "description",
    "benefits",
    "apply",
    "location",
    "salary",
    "compensation",
    "summary",
    "duties",
    "skills",
    "experience",
    "job",
    "role",
    "position",
    "remote",
    "hybrid",
    "onsite",
    "hiring",
    "posted",
    "team",
    "details",
    "preferred",
    "required",
    "what",
    "who",
    "why",
    "we",
    "you",
    "our",
];

const COMPANY_LINE_WINDOW: usize = 12;
const SHORT_LINE_MAX_CHARS: usize = 50;

fn lowercase_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_term(text: &str, terms: &[&str]) -> bool {
    lowercase_words(text).iter().any(|w| terms.contains(&w.as_str()))
}

fn starts_with_capital_or_digit(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
}

/// Letters, spaces, apostrophes, hyphens and periods; 3-60 chars; 2-5 words;
/// not a resume heading or job title.
pub fn looks_like_name(line: &str) -> bool {
    let line = line.trim();
    let len = line.chars().count();
    if !(3..=60).contains(&len) {
        return false;
    }
    if !line.chars().next().is_some_and(char::is_alphabetic) {
        return false;
    }
    if !line
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '\'' | '-' | '.'))
    {
        return false;
    }
    let words = line.split_whitespace().count();
    if !(2..=5).contains(&words) {
        return false;
    }
    !contains_term(line, &SECTION_TERMS) && !contains_term(line, &ROLE_TERMS)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// "Jane Doe | jane@x.com" or "Jane Doe (555) 123-4567" -> "Jane Doe".
fn name_before_contact(line: &str) -> Option<String> {
    let email = Regex::new(EMAIL_PATTERN).ok()?;
    let phone = Regex::new(PHONE_PATTERN).ok()?;

    let start = [email.find(line), phone.find(line)]
        .into_iter()
        .flatten()
        .map(|m| m.start())
        .min()?;

    let prefix = line[..start]
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '|' | ',' | '·' | '•' | '-' | '–' | '—' | ':'));
    looks_like_name(prefix).then(|| normalize_text(prefix))
}

fn name_from_resume_header(resume: &str) -> Option<String> {
    non_empty_lines(resume).take(5).find_map(|line| {
        if looks_like_name(line) {
            Some(normalize_text(line))
        } else {
            name_before_contact(line)
        }
    })
}

fn name_from_email(resume: &str) -> Option<String> {
    let email = Regex::new(EMAIL_PATTERN).ok()?;
    let address = email.find(resume)?.as_str();
    let local = address.split('@').next()?;

    let parts: Vec<String> = local
        .split(|c: char| !c.is_alphabetic())
        .filter(|segment| segment.chars().count() >= 2)
        .take(3)
        .map(title_case)
        .collect();

    (parts.len() >= 2).then(|| parts.join(" "))
}

fn is_sign_off(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("thank you")
        || lowercase_words(line)
            .iter()
            .any(|w| matches!(w.as_str(), "best" | "sincerely" | "regards"))
}

fn name_from_sign_off(letter: &str) -> Option<String> {
    let lines: Vec<&str> = non_empty_lines(letter).collect();
    // Walk backwards so the closing sign-off wins over "thank you" lines in the body.
    lines
        .windows(2)
        .rev()
        .find(|pair| is_sign_off(pair[0]) && looks_like_name(pair[1]))
        .map(|pair| normalize_text(pair[1]))
}

/// Infer the candidate's display name from the resume, then the letter sign-off.
pub fn extract_candidate_name(resume: &str, letter: Option<&str>) -> String {
    name_from_resume_header(resume)
        .or_else(|| name_from_email(resume))
        .or_else(|| letter.and_then(name_from_sign_off))
        .unwrap_or_else(|| FALLBACK_CANDIDATE.to_string())
}

/// An explicit, non-blank name beats anything inferred.
pub fn resolve_candidate_name(explicit: Option<&str>, resume: &str, letter: Option<&str>) -> String {
    match explicit.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => normalize_text(name),
        None => extract_candidate_name(resume, letter),
    }
}

fn clean_company(raw: &str) -> Option<String> {
    let cleaned = normalize_text(raw);
    let cleaned = cleaned
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '|' | '-' | '–' | '—' | '·' | '•'));
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn cut_at_separator(text: &str) -> &str {
    match Regex::new(SEPARATOR_PATTERN).ok().and_then(|re| re.find(text)) {
        Some(m) => &text[..m.start()],
        None => text,
    }
}

fn company_from_label(job_text: &str) -> Option<String> {
    let re = Regex::new(r"(?im)^\s*(?:company|employer|organization)(?:\s+name)?\s*[:\-]\s*(.+?)\s*$").ok()?;
    re.captures_iter(job_text)
        .filter_map(|cap| cap.get(1))
        .find_map(|m| clean_company(m.as_str()))
}

fn company_from_title_at(page_title: &str) -> Option<String> {
    let re = Regex::new(r"(?i)\bat\s+(.+)").ok()?;
    let phrase = re.captures(page_title)?.get(1)?.as_str();
    clean_company(cut_at_separator(phrase))
}

fn company_from_at_line(lines: &[&str]) -> Option<String> {
    let re = Regex::new(r"(?i)\sat\s+(.+)").ok()?;
    lines.iter().find_map(|line| {
        let phrase = re.captures(line)?.get(1)?.as_str();
        let company = clean_company(cut_at_separator(phrase))?;
        (starts_with_capital_or_digit(&company) && company.chars().count() <= 60).then_some(company)
    })
}

fn has_sentence_punctuation(line: &str) -> bool {
    if line.contains(['!', '?', ':', ';']) || line.contains(". ") {
        return true;
    }
    // "Acme Inc." is fine; "We build things." is a sentence.
    line.ends_with('.') && line.split_whitespace().count() > 3
}

fn company_from_short_line(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| {
            line.chars().count() <= SHORT_LINE_MAX_CHARS
                && starts_with_capital_or_digit(line)
                && !has_sentence_punctuation(line)
                && !contains_term(line, &ROLE_TERMS)
                && !contains_term(line, &META_TERMS)
        })
        .and_then(|line| clean_company(line))
}

fn company_from_title_segment(page_title: &str) -> Option<String> {
    page_title
        .split(['-', '|', '–', '—'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .nth(1)
        .and_then(clean_company)
}

/// Infer the hiring company from the job text and the page title.
pub fn extract_company_name(job_text: &str, page_title: &str) -> String {
    let head: Vec<&str> = non_empty_lines(job_text).take(COMPANY_LINE_WINDOW).collect();

    company_from_label(job_text)
        .or_else(|| company_from_title_at(page_title))
        .or_else(|| company_from_at_line(&head))
        .or_else(|| company_from_short_line(&head))
        .or_else(|| company_from_title_segment(page_title))
        .unwrap_or_else(|| FALLBACK_COMPANY.to_string())
}
