use tracing::{debug, info};

use crate::ai::ProviderFactory;
use crate::error::{AppError, Result};
use crate::humanize::Humanizer;
use crate::models::{
    AppSettings, GenerationRequest, HumanizeTextRequest, LetterLength, OutputFormat, Provider,
    QuestionAnswerRequest, Tone,
};
use crate::prompt::{build_answer_prompts, build_prompts};
use crate::text::strip_dashes;

/// A cover-letter request as the user triggers it; unset fields come from settings.
#[derive(Debug, Clone, Default)]
pub struct GenerationDraft {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub tone: Option<Tone>,
    pub length: Option<LetterLength>,
    pub job_text: String,
    pub resume_text: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub current_date: Option<String>,
    pub candidate_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AnswerDraft {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub tone: Option<Tone>,
    pub job_text: String,
    pub resume_text: Option<String>,
    pub question: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_texts(job_text: &str, resume_text: &str) -> Result<()> {
    if job_text.trim().is_empty() {
        return Err(AppError::input("Job description is required."));
    }
    if resume_text.trim().is_empty() {
        return Err(AppError::input(
            "Resume is empty. Add your resume in extension settings.",
        ));
    }
    Ok(())
}

pub fn validate_letter_request(req: &GenerationRequest) -> Result<()> {
    require_texts(&req.job_text, &req.resume_text)
}

pub fn validate_answer_request(req: &QuestionAnswerRequest) -> Result<()> {
    if req.question.trim().is_empty() {
        return Err(AppError::input("Question is required."));
    }
    require_texts(&req.job_text, &req.resume_text)
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub struct Orchestrator<'a> {
    settings: AppSettings,
    stored_resume: String,
    providers: &'a dyn ProviderFactory,
    env: fn(&str) -> Option<String>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(settings: AppSettings, stored_resume: String, providers: &'a dyn ProviderFactory) -> Self {
        Self {
            settings,
            stored_resume,
            providers,
            env: process_env,
        }
    }

    /// Replace the environment lookup used for API key fallback.
    pub fn with_env(mut self, env: fn(&str) -> Option<String>) -> Self {
        self.env = env;
        self
    }

    fn resolve_model(&self, provider: Provider, model: Option<String>) -> String {
        non_blank(model).unwrap_or_else(|| self.settings.model_for(provider))
    }

    fn resolve_resume(&self, resume_text: Option<String>) -> String {
        resume_text
            .unwrap_or_else(|| self.stored_resume.clone())
            .trim()
            .to_string()
    }

    /// Merge a draft over stored settings; request values win.
    pub fn resolve_letter(&self, draft: GenerationDraft) -> GenerationRequest {
        let provider = draft.provider.unwrap_or(self.settings.provider);
        let candidate_name = non_blank(draft.candidate_name)
            .or_else(|| non_blank(Some(self.settings.full_name.clone())));

        GenerationRequest {
            provider,
            model: self.resolve_model(provider, draft.model),
            tone: draft.tone.unwrap_or(self.settings.tone),
            length: draft.length.unwrap_or(self.settings.length),
            job_text: draft.job_text,
            resume_text: self.resolve_resume(draft.resume_text),
            output_format: draft.output_format.unwrap_or_default(),
            current_date: non_blank(draft.current_date),
            candidate_name,
        }
    }

    pub fn resolve_answer(&self, draft: AnswerDraft) -> QuestionAnswerRequest {
        let provider = draft.provider.unwrap_or(self.settings.provider);
        QuestionAnswerRequest {
            provider,
            model: self.resolve_model(provider, draft.model),
            tone: draft.tone.unwrap_or(self.settings.tone),
            job_text: draft.job_text,
            resume_text: self.resolve_resume(draft.resume_text),
            question: draft.question,
        }
    }

    fn api_key(&self, provider: Provider) -> Result<String> {
        self.settings
            .api_key_for(provider, self.env)
            .ok_or(AppError::MissingApiKey(provider))
    }

    fn dispatch(&self, provider: Provider, model: &str, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let api_key = self.api_key(provider)?;
        let client = self.providers.create(provider, api_key, model.to_string());
        debug!(provider = %provider, model = client.model_name(), "dispatching to provider");
        let text = client.complete(system_prompt, user_prompt)?;
        Ok(strip_dashes(&text))
    }

    pub fn generate_letter(&self, req: &GenerationRequest) -> Result<String> {
        validate_letter_request(req)?;
        let prompts = build_prompts(req);
        info!(
            provider = %req.provider,
            model = %req.model,
            tone = %req.tone,
            length = %req.length,
            format = ?req.output_format,
            "generating cover letter"
        );
        self.dispatch(req.provider, &req.model, &prompts.system_prompt, &prompts.user_prompt)
    }

    pub fn generate_answer(&self, req: &QuestionAnswerRequest) -> Result<String> {
        validate_answer_request(req)?;
        let prompts = build_answer_prompts(req);
        info!(provider = %req.provider, model = %req.model, "generating question answer");
        self.dispatch(req.provider, &req.model, &prompts.system_prompt, &prompts.user_prompt)
    }
}

/// Rewrite already generated text through the humanizer service.
pub fn humanize_text(humanizer: &dyn Humanizer, req: &HumanizeTextRequest) -> Result<String> {
    let source = req.text.trim();
    if source.is_empty() {
        return Err(AppError::input("Nothing to humanize."));
    }
    info!(chars = source.chars().count(), "humanizing text");
    let text = humanizer.humanize(source)?;
    Ok(strip_dashes(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AIProvider;
    use crate::error::ErrorKind;
    use std::cell::{Cell, RefCell};

    struct StubProvider {
        model: String,
        reply: String,
        seen_user_prompt: Option<std::rc::Rc<RefCell<String>>>,
    }

    impl AIProvider for StubProvider {
        fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
            if let Some(seen) = &self.seen_user_prompt {
                *seen.borrow_mut() = user_prompt.to_string();
            }
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            &self.model
        }
    }

    struct StubFactory {
        calls: Cell<usize>,
        last: RefCell<Option<(Provider, String, String)>>,
        reply: String,
        seen_user_prompt: std::rc::Rc<RefCell<String>>,
    }

    impl StubFactory {
        fn replying(reply: &str) -> Self {
            Self {
                calls: Cell::new(0),
                last: RefCell::new(None),
                reply: reply.to_string(),
                seen_user_prompt: Default::default(),
            }
        }
    }

    impl ProviderFactory for StubFactory {
        fn create(&self, provider: Provider, api_key: String, model_id: String) -> Box<dyn AIProvider> {
            self.calls.set(self.calls.get() + 1);
            *self.last.borrow_mut() = Some((provider, api_key, model_id.clone()));
            Box::new(StubProvider {
                model: model_id,
                reply: self.reply.clone(),
                seen_user_prompt: Some(self.seen_user_prompt.clone()),
            })
        }
    }

    fn settings_with_keys() -> AppSettings {
        let mut settings = AppSettings::default();
        settings.api_keys.set(Provider::Anthropic, "ak-test".to_string());
        settings.api_keys.set(Provider::OpenAI, "sk-test".to_string());
        settings
    }

    fn draft(job: &str) -> GenerationDraft {
        GenerationDraft {
            job_text: job.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_job_text_fails_before_dispatch() {
        let factory = StubFactory::replying("letter");
        let orchestrator = Orchestrator::new(settings_with_keys(), "Jane Doe\nRust".to_string(), &factory);

        let request = orchestrator.resolve_letter(draft("   "));
        let err = orchestrator.generate_letter(&request).unwrap_err();

        assert_eq!(err.to_string(), "Job description is required.");
        assert_eq!(err.kind(), ErrorKind::Input);
        assert_eq!(factory.calls.get(), 0);
    }

    #[test]
    fn test_empty_resume_fails_before_dispatch() {
        let factory = StubFactory::replying("letter");
        let orchestrator = Orchestrator::new(settings_with_keys(), "  ".to_string(), &factory);

        let request = orchestrator.resolve_letter(draft("Backend role"));
        let err = orchestrator.generate_letter(&request).unwrap_err();
        assert_eq!(err.to_string(), "Resume is empty. Add your resume in extension settings.");
        assert_eq!(factory.calls.get(), 0);
    }

    #[test]
    fn test_missing_key_is_config_error_without_dispatch() {
        let factory = StubFactory::replying("letter");
        let mut settings = settings_with_keys();
        settings.api_keys.set(Provider::OpenAI, "   ".to_string());
        let orchestrator = Orchestrator::new(settings, "resume".to_string(), &factory).with_env(|_| None);

        let request = orchestrator.resolve_letter(GenerationDraft {
            provider: Some(Provider::OpenAI),
            ..draft("Backend role")
        });

        let err = orchestrator.generate_letter(&request).unwrap_err();
        assert_eq!(err.to_string(), "Missing openai API key. Add it in Settings.");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(factory.calls.get(), 0);
    }

    #[test]
    fn test_env_key_used_when_none_stored() {
        let factory = StubFactory::replying("letter");
        let orchestrator = Orchestrator::new(AppSettings::default(), "resume".to_string(), &factory)
            .with_env(|name| (name == "ANTHROPIC_API_KEY").then(|| "ak-env".to_string()));

        let request = orchestrator.resolve_letter(draft("Backend role"));
        orchestrator.generate_letter(&request).unwrap();

        let (_, key, _) = factory.last.borrow().clone().unwrap();
        assert_eq!(key, "ak-env");
    }

    #[test]
    fn test_request_values_override_settings() {
        let factory = StubFactory::replying("letter");
        let mut settings = settings_with_keys();
        settings.tone = Tone::Friendly;
        settings.full_name = "Stored Name".to_string();
        let orchestrator = Orchestrator::new(settings, "stored resume".to_string(), &factory);

        let request = orchestrator.resolve_letter(GenerationDraft {
            provider: Some(Provider::OpenAI),
            tone: Some(Tone::Confident),
            model: Some("gpt-4o".to_string()),
            resume_text: Some("  draft resume ".to_string()),
            ..draft("job")
        });

        assert_eq!(request.provider, Provider::OpenAI);
        assert_eq!(request.tone, Tone::Confident);
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.length, LetterLength::Standard);
        assert_eq!(request.resume_text, "draft resume");
        assert_eq!(request.output_format, OutputFormat::Paste);
        assert_eq!(request.candidate_name.as_deref(), Some("Stored Name"));
    }

    #[test]
    fn test_defaults_fill_unset_fields() {
        let factory = StubFactory::replying("letter");
        let orchestrator = Orchestrator::new(settings_with_keys(), "stored resume".to_string(), &factory);
        let request = orchestrator.resolve_letter(draft("job"));

        assert_eq!(request.provider, Provider::Anthropic);
        assert_eq!(request.model, "claude-3-5-haiku-latest");
        assert_eq!(request.resume_text, "stored resume");
        assert_eq!(request.candidate_name, None);
    }

    #[test]
    fn test_generated_letter_has_dashes_normalized() {
        let factory = StubFactory::replying("Dear team \u{2014} hello \u{2013} bye");
        let orchestrator = Orchestrator::new(settings_with_keys(), "resume".to_string(), &factory);

        let request = orchestrator.resolve_letter(GenerationDraft {
            length: Some(LetterLength::Short),
            ..draft("Backend role at Acme")
        });
        let letter = orchestrator.generate_letter(&request).unwrap();

        assert_eq!(letter, "Dear team - hello - bye");
        assert_eq!(factory.calls.get(), 1);
        let (provider, key, model) = factory.last.borrow().clone().unwrap();
        assert_eq!(provider, Provider::Anthropic);
        assert_eq!(key, "ak-test");
        assert_eq!(model, "claude-3-5-haiku-latest");
        assert!(factory.seen_user_prompt.borrow().contains("180-220 words"));
    }

    #[test]
    fn test_answer_requires_question() {
        let factory = StubFactory::replying("answer");
        let orchestrator = Orchestrator::new(settings_with_keys(), "resume".to_string(), &factory);

        let request = orchestrator.resolve_answer(AnswerDraft {
            job_text: "job".to_string(),
            question: " ".to_string(),
            ..Default::default()
        });
        let err = orchestrator.generate_answer(&request).unwrap_err();
        assert_eq!(err.to_string(), "Question is required.");
        assert_eq!(factory.calls.get(), 0);
    }

    #[test]
    fn test_answer_dispatches_and_normalizes() {
        let factory = StubFactory::replying("I led the migration \u{2014} twice.");
        let orchestrator = Orchestrator::new(settings_with_keys(), "resume".to_string(), &factory);

        let request = orchestrator.resolve_answer(AnswerDraft {
            provider: Some(Provider::OpenAI),
            job_text: "job".to_string(),
            question: "Tell us about a migration.".to_string(),
            ..Default::default()
        });
        let answer = orchestrator.generate_answer(&request).unwrap();

        assert_eq!(answer, "I led the migration - twice.");
        assert!(factory.seen_user_prompt.borrow().contains("Tell us about a migration."));
    }

    struct EchoHumanizer {
        calls: Cell<usize>,
    }

    impl Humanizer for EchoHumanizer {
        fn humanize(&self, text: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(format!("{} \u{2014} rewritten", text))
        }
    }

    #[test]
    fn test_humanize_rejects_empty_text() {
        let humanizer = EchoHumanizer { calls: Cell::new(0) };
        let err = humanize_text(&humanizer, &HumanizeTextRequest { text: "  \n".to_string() }).unwrap_err();
        assert_eq!(err.to_string(), "Nothing to humanize.");
        assert_eq!(humanizer.calls.get(), 0);
    }

    #[test]
    fn test_humanize_trims_and_normalizes() {
        let humanizer = EchoHumanizer { calls: Cell::new(0) };
        let text = humanize_text(&humanizer, &HumanizeTextRequest { text: "  draft ".to_string() }).unwrap();
        assert_eq!(text, "draft - rewritten");
    }
}
