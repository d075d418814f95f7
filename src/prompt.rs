use chrono::Local;
use regex::Regex;

use crate::models::{GenerationRequest, LetterLength, OutputFormat, PromptPair, QuestionAnswerRequest, Tone};

const BANNED_WORDS: [&str; 14] = [
    "passionate",
    "thrilled",
    "excited",
    "dynamic",
    "synergy",
    "cutting-edge",
    "innovative",
    "world-class",
    "rockstar",
    "ninja",
    "leverage",
    "spearheaded",
    "unparalleled",
    "game-changing",
];

const STOCK_OPENINGS: [&str; 4] = [
    "I am writing to express my interest",
    "I am excited to apply",
    "As a highly motivated",
    "I was thrilled to see",
];

fn length_guidance(length: LetterLength) -> &'static str {
    match length {
        LetterLength::Short => "Keep it around 180-220 words.",
        LetterLength::Standard => "Keep it around 260-340 words.",
        LetterLength::Detailed => "Keep it around 380-500 words.",
    }
}

fn tone_guidance(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "Sound polished and measured, like a capable colleague.",
        Tone::Confident => "Sound assured and direct, without bragging.",
        Tone::Friendly => "Sound warm and approachable while staying professional.",
    }
}

fn numeric_claim_limit(format: OutputFormat, length: LetterLength) -> u8 {
    match (format, length) {
        (OutputFormat::Paste, LetterLength::Short) => 0,
        (OutputFormat::Paste, LetterLength::Standard) => 1,
        (OutputFormat::Paste, LetterLength::Detailed) => 2,
        (OutputFormat::Pdf, LetterLength::Short) => 1,
        (OutputFormat::Pdf, _) => 2,
    }
}

fn numeric_claim_directive(limit: u8) -> String {
    match limit {
        0 => "Do not cite specific numbers, percentages, or metrics.".to_string(),
        1 => "Use at most one specific number or metric, and only if it appears in the resume.".to_string(),
        n => format!("Use at most {} specific numbers or metrics, and only ones that appear in the resume.", n),
    }
}

fn mentions_gpa(text: &str) -> bool {
    Regex::new(r"(?i)\bgpa\b|grade point average")
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

fn gpa_directive(job_text: &str) -> &'static str {
    if mentions_gpa(job_text) {
        "The job description asks about GPA; mention it only if the resume states it."
    } else {
        "Do not mention GPA."
    }
}

fn asks_for_metrics(question: &str) -> bool {
    Regex::new(r"(?i)\b(metrics?|numbers?|quantif\w*|measur\w*|results?|impact)\b")
        .map(|re| re.is_match(question))
        .unwrap_or(false)
}

fn banned_words_directive() -> String {
    format!("Avoid these words: {}.", BANNED_WORDS.join(", "))
}

fn stock_openings_directive() -> String {
    let quoted: Vec<String> = STOCK_OPENINGS.iter().map(|p| format!("\"{}\"", p)).collect();
    format!("Do not open with stock phrases such as {}.", quoted.join(", "))
}

/// Today's date as "October 17, 2026".
pub fn today_long_date() -> String {
    Local::now().format("%B %-d, %Y").to_string()
}

fn format_directives(req: &GenerationRequest) -> Vec<String> {
    match req.output_format {
        OutputFormat::Paste => vec![
            "Format: paste-ready text for an online application form.".to_string(),
            "Do not include a date line, contact header, or address block.".to_string(),
        ],
        OutputFormat::Pdf => {
            let date = req
                .current_date
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .unwrap_or_else(today_long_date);
            vec![
                "Format: a formal letter that will be exported as a one-page PDF.".to_string(),
                format!("Begin with this exact date line: {}", date),
                "After the date, add a short header naming the hiring company, using only company and team names that appear in the job description.".to_string(),
                "Never use bracketed placeholders such as [Company Name], [Address], or [Hiring Manager].".to_string(),
                "The whole letter, including the header and sign-off, must fit on one page.".to_string(),
            ]
        }
    }
}

pub fn build_system_prompt() -> String {
    [
        "You are an expert career writing assistant.",
        "Write a role-specific cover letter using only factual details present in the resume.",
        "Never invent achievements, years of experience, companies, or credentials.",
        "If information is missing, keep wording general instead of fabricating.",
        "Output plain text only, without markdown.",
        "Never use em dashes or en dashes; use commas, periods, or plain hyphens instead.",
        "Be confident but not boastful, and avoid hype adjectives.",
        "Vary sentence length and rhythm so the letter reads naturally.",
        "Use clear language an undergraduate reader would find easy to follow.",
        "Include a short greeting line and a short sign-off with the candidate name.",
    ]
    .join(" ")
}

pub fn build_user_prompt(req: &GenerationRequest) -> String {
    let candidate_pin = req
        .candidate_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| format!("Sign off with this exact name: {}", name))
        .unwrap_or_default();

    let mut directives: Vec<String> = vec![
        format!("Tone: {}", req.tone),
        tone_guidance(req.tone).to_string(),
        length_guidance(req.length).to_string(),
        "Structure: greeting, 3-5 concise paragraphs, then a short sign-off.".to_string(),
    ];
    directives.extend(format_directives(req));
    directives.extend([
        candidate_pin,
        numeric_claim_directive(numeric_claim_limit(req.output_format, req.length)),
        gpa_directive(&req.job_text).to_string(),
        banned_words_directive(),
        stock_openings_directive(),
        "Prioritize matching the role requirements with resume evidence.".to_string(),
    ]);
    directives.retain(|line| !line.trim().is_empty());

    let mut lines = directives;
    lines.extend([
        String::new(),
        "Job description:".to_string(),
        req.job_text.trim().to_string(),
        String::new(),
        "Resume:".to_string(),
        req.resume_text.trim().to_string(),
    ]);
    lines.join("\n")
}

pub fn build_prompts(req: &GenerationRequest) -> PromptPair {
    PromptPair {
        system_prompt: build_system_prompt(),
        user_prompt: build_user_prompt(req),
    }
}

pub fn build_answer_system_prompt() -> String {
    [
        "You are an expert career writing assistant answering a job application question.",
        "Answer in the first person as the candidate, in a single paragraph of 90-140 words.",
        "Use only facts present in the resume and never invent experience, employers, or credentials.",
        "Output plain text only, without markdown.",
        "Never use em dashes or en dashes.",
        "Do not restate the question, add a preface, or comment on the answer itself.",
    ]
    .join(" ")
}

pub fn build_answer_user_prompt(req: &QuestionAnswerRequest) -> String {
    let metrics = if asks_for_metrics(&req.question) {
        "The question asks for results, so cite the relevant figures from the resume."
    } else {
        "Use at most one specific number or metric."
    };

    [
        format!("Tone: {}", req.tone),
        tone_guidance(req.tone).to_string(),
        "Length: one paragraph, 90-140 words.".to_string(),
        metrics.to_string(),
        "Start directly with the answer.".to_string(),
        String::new(),
        "Question:".to_string(),
        req.question.trim().to_string(),
        String::new(),
        "Job description:".to_string(),
        req.job_text.trim().to_string(),
        String::new(),
        "Resume:".to_string(),
        req.resume_text.trim().to_string(),
    ]
    .join("\n")
}

pub fn build_answer_prompts(req: &QuestionAnswerRequest) -> PromptPair {
    PromptPair {
        system_prompt: build_answer_system_prompt(),
        user_prompt: build_answer_user_prompt(req),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;

    fn request(length: LetterLength, format: OutputFormat) -> GenerationRequest {
        GenerationRequest {
            provider: Provider::Anthropic,
            model: "claude-3-5-haiku-latest".to_string(),
            tone: Tone::Professional,
            length,
            job_text: "  Backend Engineer\n\nAcme Corp builds logistics software.  ".to_string(),
            resume_text: "\nJane Doe\nRust, Postgres, Kafka\n".to_string(),
            output_format: format,
            current_date: None,
            candidate_name: None,
        }
    }

    #[test]
    fn test_length_ranges_in_user_prompt() {
        for (length, range) in [
            (LetterLength::Short, "180-220"),
            (LetterLength::Standard, "260-340"),
            (LetterLength::Detailed, "380-500"),
        ] {
            let prompt = build_user_prompt(&request(length, OutputFormat::Paste));
            assert!(prompt.contains(range), "missing {} for {:?}", range, length);
        }
    }

    #[test]
    fn test_paste_prompt_has_no_pdf_instructions() {
        let prompt = build_user_prompt(&request(LetterLength::Short, OutputFormat::Paste));
        assert!(prompt.contains("Tone: professional"));
        assert!(prompt.contains("180-220 words"));
        assert!(!prompt.to_lowercase().contains("pdf"));
        assert!(!prompt.contains("date line:"));
        assert!(prompt.contains("Do not cite specific numbers"));
    }

    #[test]
    fn test_pdf_prompt_pins_date_and_forbids_placeholders() {
        let mut req = request(LetterLength::Standard, OutputFormat::Pdf);
        req.current_date = Some("March 3, 2025".to_string());
        let prompt = build_user_prompt(&req);

        assert!(prompt.contains("Begin with this exact date line: March 3, 2025"));
        assert!(prompt.contains("[Company Name]"));
        assert!(prompt.contains("one-page PDF"));
        assert!(prompt.contains("Use at most 2 specific numbers"));
    }

    #[test]
    fn test_pdf_prompt_uses_today_when_date_unset() {
        let prompt = build_user_prompt(&request(LetterLength::Short, OutputFormat::Pdf));
        assert!(prompt.contains(&format!("exact date line: {}", today_long_date())));
    }

    #[test]
    fn test_prompts_are_deterministic_with_pinned_date() {
        let mut req = request(LetterLength::Detailed, OutputFormat::Pdf);
        req.current_date = Some("January 9, 2026".to_string());
        req.candidate_name = Some("Jane Doe".to_string());
        assert_eq!(build_prompts(&req), build_prompts(&req));
    }

    #[test]
    fn test_job_and_resume_are_trimmed_and_labeled() {
        let prompt = build_user_prompt(&request(LetterLength::Standard, OutputFormat::Paste));
        assert!(prompt.contains("\n\nJob description:\nBackend Engineer\n\nAcme Corp builds logistics software.\n\nResume:\nJane Doe\nRust, Postgres, Kafka"));
        assert!(prompt.ends_with("Kafka"));
    }

    #[test]
    fn test_empty_optional_directives_are_dropped() {
        let mut req = request(LetterLength::Standard, OutputFormat::Paste);
        req.candidate_name = Some("   ".to_string());
        let prompt = build_user_prompt(&req);
        assert!(!prompt.contains("Sign off with this exact name"));

        let directives = prompt.split("\n\nJob description:").next().unwrap();
        assert!(directives.lines().all(|line| !line.trim().is_empty()));

        req.candidate_name = Some("Jane Doe".to_string());
        assert!(build_user_prompt(&req).contains("Sign off with this exact name: Jane Doe"));
    }

    #[test]
    fn test_gpa_only_when_job_asks() {
        let mut req = request(LetterLength::Standard, OutputFormat::Paste);
        assert!(build_user_prompt(&req).contains("Do not mention GPA."));

        req.job_text = "New grad role. Minimum GPA of 3.5 required.".to_string();
        assert!(build_user_prompt(&req).contains("asks about GPA"));
    }

    #[test]
    fn test_system_prompt_policies() {
        let system = build_system_prompt();
        assert!(system.contains("Never invent achievements"));
        assert!(system.contains("plain text only"));
        assert!(system.contains("em dashes"));
        assert!(system.contains("undergraduate"));
    }

    #[test]
    fn test_answer_prompt() {
        let req = QuestionAnswerRequest {
            provider: Provider::OpenAI,
            model: "gpt-4.1-mini".to_string(),
            tone: Tone::Friendly,
            job_text: "Support engineer".to_string(),
            resume_text: "Jane Doe".to_string(),
            question: "  Why do you want to work here?  ".to_string(),
        };
        let pair = build_answer_prompts(&req);
        assert!(pair.system_prompt.contains("90-140 words"));
        assert!(pair.system_prompt.contains("first person"));
        assert!(pair.user_prompt.contains("Tone: friendly"));
        assert!(pair.user_prompt.contains("Question:\nWhy do you want to work here?\n"));
        assert!(pair.user_prompt.contains("at most one specific number"));

        let metrics = QuestionAnswerRequest {
            question: "What measurable impact did you have?".to_string(),
            ..req
        };
        assert!(build_answer_user_prompt(&metrics).contains("cite the relevant figures"));
    }
}
