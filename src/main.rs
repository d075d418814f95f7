mod ai;
mod error;
mod extract;
mod generate;
mod humanize;
mod models;
mod names;
mod pdf;
mod prompt;
mod storage;
mod text;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai::HttpProviderFactory;
use error::{AppError, ErrorKind};
use extract::{DomProbe, JobTextMessage, JobTextProbe, ReplyProbe, cap_job_text, probe_with_fallback};
use generate::{AnswerDraft, GenerationDraft, Orchestrator, humanize_text};
use humanize::HumanizeAiClient;
use models::{
    AppSettings, ExtractedJob, GenerationResponse, HumanizeTextRequest, HumanizeTextResponse,
    LetterLength, OutputFormat, Provider, QuestionAnswerResponse, Reply, Tone,
};
use storage::SettingsStore;

#[derive(Parser)]
#[command(name = "jobscribe")]
#[command(about = "Draft tailored cover letters and application answers from job pages")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the job description comes from.
#[derive(Args)]
struct JobSource {
    /// File containing the job description text
    #[arg(long, conflicts_with = "page")]
    job: Option<PathBuf>,

    /// Job page to extract from (HTML file or http(s) URL)
    #[arg(long)]
    page: Option<String>,

    /// Text selected on the page; preferred when long enough
    #[arg(long)]
    selection: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract job text from a page
    Extract {
        /// HTML file or http(s) URL (optional when --reply is given)
        source: Option<String>,

        /// Text selected on the page
        #[arg(long)]
        selection: Option<String>,

        /// JSON reply recorded from a content script; markup is used if it fails
        #[arg(long)]
        reply: Option<PathBuf>,

        /// Print the request message a content script answers, then exit
        #[arg(long)]
        print_request: bool,

        #[arg(long)]
        json: bool,
    },

    /// Generate a cover letter
    Generate {
        #[command(flatten)]
        source: JobSource,

        #[arg(long)]
        provider: Option<Provider>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        tone: Option<Tone>,

        #[arg(long)]
        length: Option<LetterLength>,

        /// paste (plain text) or pdf (formal letter exported to a PDF file)
        #[arg(long, default_value = "paste")]
        format: OutputFormat,

        /// Date line for pdf letters (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Name to sign the letter with (default: settings full name)
        #[arg(long)]
        name: Option<String>,

        /// Resume file to use instead of the stored resume
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Rewrite the letter through the humanizer service
        #[arg(long)]
        humanize: bool,

        /// Directory for the exported PDF
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Answer an application question
    Answer {
        /// The question from the application form
        question: String,

        #[command(flatten)]
        source: JobSource,

        #[arg(long)]
        provider: Option<Provider>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        tone: Option<Tone>,

        /// Resume file to use instead of the stored resume
        #[arg(long)]
        resume: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Rewrite text through the humanizer service
    Humanize {
        /// Text file to rewrite (default: stdin)
        file: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Show the candidate and company names used for PDF export
    Names {
        #[command(flatten)]
        source: JobSource,

        /// Generated letter, used for its sign-off
        #[arg(long)]
        letter: Option<PathBuf>,

        /// Explicit candidate name
        #[arg(long)]
        name: Option<String>,

        /// Resume file to use instead of the stored resume
        #[arg(long)]
        resume: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Export an existing letter to a one-page PDF
    Pdf {
        /// Letter text file
        letter: PathBuf,

        #[command(flatten)]
        source: JobSource,

        /// Explicit candidate name
        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// View or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Manage the stored resume
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings (API keys masked)
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Update settings
    Set {
        /// Default provider
        #[arg(long)]
        provider: Option<Provider>,

        #[arg(long)]
        tone: Option<Tone>,

        #[arg(long)]
        length: Option<LetterLength>,

        /// Full name used to sign letters
        #[arg(long)]
        full_name: Option<String>,

        /// Model id for the provider given by --for (default: the default provider)
        #[arg(long)]
        model: Option<String>,

        /// API key for the provider given by --for (default: the default provider)
        #[arg(long)]
        api_key: Option<String>,

        /// Provider that --model and --api-key apply to
        #[arg(long = "for")]
        target: Option<Provider>,

        /// Keep the resume only for this session
        #[arg(long)]
        session_only_resume: Option<bool>,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// Print the stored resume
    Show,

    /// Store resume text from a file (or stdin)
    Set {
        file: Option<PathBuf>,

        /// Keep the resume only for this session
        #[arg(long)]
        session_only: bool,
    },

    /// Remove the stored resume
    Clear,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NameReport {
    candidate_name: String,
    company_name: String,
}

#[derive(Serialize)]
struct PdfExport {
    path: String,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_text(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

impl JobSource {
    fn is_set(&self) -> bool {
        self.job.is_some() || self.page.is_some()
    }

    fn load(&self) -> Result<ExtractedJob> {
        if let Some(path) = &self.job {
            return Ok(ExtractedJob {
                job_text: cap_job_text(&read_text(Some(path))?),
                ..Default::default()
            });
        }
        let page = self
            .page
            .as_deref()
            .ok_or_else(|| anyhow!("Provide the job with --job <file> or --page <file|url>"))?;
        let dom = DomProbe::new(page, self.selection.clone());
        Ok(probe_with_fallback(None, &dom)?)
    }

    fn load_or_default(&self) -> Result<ExtractedJob> {
        if self.is_set() {
            self.load()
        } else {
            Ok(ExtractedJob::default())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a command's result as plain text, or as a `Reply` envelope with `--json`.
fn emit<T: Serialize>(json: bool, result: Result<T>, plain: impl FnOnce(T)) -> Result<()> {
    if !json {
        plain(result?);
        return Ok(());
    }
    match result {
        Ok(data) => print_json(&Reply::success(data)),
        Err(e) => {
            print_json(&Reply::<T>::failure(format!("{:#}", e)))?;
            Err(e)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AppError>().map(AppError::kind) {
        Some(ErrorKind::Input) => 2,
        Some(ErrorKind::Config) => 3,
        _ => 1,
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    match chars.len() {
        0 => String::new(),
        n if n <= 4 => "****".to_string(),
        n => format!("****{}", chars[n - 4..].iter().collect::<String>()),
    }
}

fn masked(settings: &AppSettings) -> AppSettings {
    let mut shown = settings.clone();
    for provider in [Provider::Anthropic, Provider::OpenAI] {
        let key = mask_key(settings.api_keys.get(provider));
        shown.api_keys.set(provider, key);
    }
    shown
}

/// Settings, the stored resume (or the one given on the command line), and the store they came from.
fn load_context(resume: Option<&Path>) -> Result<(SettingsStore, AppSettings, String)> {
    let store = SettingsStore::open()?;
    let settings = store.load_settings()?;
    let resume_text = match resume {
        Some(path) => read_text(Some(path))?,
        None => store.load_resume(&settings)?,
    };
    Ok((store, settings, resume_text))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Extract {
            source,
            selection,
            reply,
            print_request,
            json,
        } => {
            if print_request {
                return print_json(&JobTextMessage::get_job_text());
            }
            let result = (|| -> Result<ExtractedJob> {
                let reply_probe = reply.map(ReplyProbe::new);
                let dom_probe = source.map(|source| DomProbe::new(source, selection));
                let job = match (&reply_probe, &dom_probe) {
                    (Some(reply), Some(dom)) => probe_with_fallback(Some(reply as &dyn JobTextProbe), dom)?,
                    (Some(reply), None) => probe_with_fallback(None, reply)?,
                    (None, Some(dom)) => probe_with_fallback(None, dom)?,
                    (None, None) => {
                        return Err(AppError::input("A page file or URL, or a --reply file, is required.").into());
                    }
                };
                Ok(job)
            })();
            emit(json, result, |job| {
                if !job.page_title.is_empty() {
                    println!("Title: {}", job.page_title);
                }
                println!("URL: {}", job.url);
                println!("\n{}", job.job_text);
            })
        }

        Commands::Generate {
            source,
            provider,
            model,
            tone,
            length,
            format,
            date,
            name,
            resume,
            humanize,
            out_dir,
            json,
        } => {
            let result = (|| -> Result<GenerationResponse> {
                let (_store, settings, stored_resume) = load_context(resume.as_deref())?;
                let job = source.load()?;
                let factory = HttpProviderFactory;
                let orchestrator = Orchestrator::new(settings, stored_resume, &factory);

                let request = orchestrator.resolve_letter(GenerationDraft {
                    provider,
                    model,
                    tone,
                    length,
                    job_text: job.job_text.clone(),
                    resume_text: None,
                    output_format: Some(format),
                    current_date: date,
                    candidate_name: name,
                });
                let mut letter = orchestrator.generate_letter(&request)?;

                if humanize {
                    letter = humanize_text(&HumanizeAiClient::new(), &HumanizeTextRequest { text: letter })?;
                }

                if request.output_format == OutputFormat::Pdf {
                    let candidate = names::resolve_candidate_name(
                        request.candidate_name.as_deref(),
                        &request.resume_text,
                        Some(&letter),
                    );
                    let company = names::extract_company_name(&job.job_text, &job.page_title);
                    let path = pdf::export_letter_pdf(&letter, &candidate, &company, &out_dir)?;
                    info!(path = %path.display(), "exported letter");
                    eprintln!("Saved PDF: {}", path.display());
                }

                Ok(GenerationResponse { letter })
            })();
            emit(json, result, |res| println!("{}", res.letter))
        }

        Commands::Answer {
            question,
            source,
            provider,
            model,
            tone,
            resume,
            json,
        } => {
            let result = (|| -> Result<QuestionAnswerResponse> {
                let (_store, settings, stored_resume) = load_context(resume.as_deref())?;
                let job = source.load()?;
                let factory = HttpProviderFactory;
                let orchestrator = Orchestrator::new(settings, stored_resume, &factory);

                let request = orchestrator.resolve_answer(AnswerDraft {
                    provider,
                    model,
                    tone,
                    job_text: job.job_text,
                    resume_text: None,
                    question,
                });
                let answer = orchestrator.generate_answer(&request)?;
                Ok(QuestionAnswerResponse { answer })
            })();
            emit(json, result, |res| println!("{}", res.answer))
        }

        Commands::Humanize { file, json } => {
            let result = (|| -> Result<HumanizeTextResponse> {
                let request = HumanizeTextRequest {
                    text: read_text(file.as_deref())?,
                };
                let text = humanize_text(&HumanizeAiClient::new(), &request)?;
                Ok(HumanizeTextResponse { text })
            })();
            emit(json, result, |res| println!("{}", res.text))
        }

        Commands::Names {
            source,
            letter,
            name,
            resume,
            json,
        } => {
            let result = (|| -> Result<NameReport> {
                let (_store, settings, resume_text) = load_context(resume.as_deref())?;
                let job = source.load_or_default()?;
                let letter = letter.as_deref().map(|p| read_text(Some(p))).transpose()?;
                let explicit = name.or_else(|| Some(settings.full_name.clone()));

                Ok(NameReport {
                    candidate_name: names::resolve_candidate_name(
                        explicit.as_deref(),
                        &resume_text,
                        letter.as_deref(),
                    ),
                    company_name: names::extract_company_name(&job.job_text, &job.page_title),
                })
            })();
            emit(json, result, |report| {
                println!("Candidate: {}", report.candidate_name);
                println!("Company:   {}", report.company_name);
            })
        }

        Commands::Pdf {
            letter,
            source,
            name,
            out_dir,
            json,
        } => {
            let result = (|| -> Result<PdfExport> {
                let (_store, settings, resume_text) = load_context(None)?;
                let letter = read_text(Some(&letter))?;
                let job = source.load_or_default()?;
                let explicit = name.or_else(|| Some(settings.full_name.clone()));

                let candidate = names::resolve_candidate_name(explicit.as_deref(), &resume_text, Some(&letter));
                let company = names::extract_company_name(&job.job_text, &job.page_title);
                let path = pdf::export_letter_pdf(&letter, &candidate, &company, &out_dir)?;
                Ok(PdfExport {
                    path: path.display().to_string(),
                })
            })();
            emit(json, result, |export| println!("Saved PDF: {}", export.path))
        }

        Commands::Settings { command } => {
            let store = SettingsStore::open()?;
            match command {
                SettingsCommands::Show { json } => {
                    let result = store.load_settings().map(|s| masked(&s)).map_err(Into::into);
                    emit(json, result, |settings| {
                        println!("Settings file: {}", store.settings_path().display());
                        println!("Provider:      {}", settings.provider);
                        println!("Tone:          {}", settings.tone);
                        println!("Length:        {}", settings.length);
                        println!("Full name:     {}", settings.full_name);
                        println!("Session-only resume: {}", settings.session_only_resume);
                        for provider in [Provider::Anthropic, Provider::OpenAI] {
                            println!(
                                "{:<10} model: {:<28} key: {}",
                                provider.label(),
                                settings.model_for(provider),
                                settings.api_keys.get(provider)
                            );
                        }
                    })
                }

                SettingsCommands::Set {
                    provider,
                    tone,
                    length,
                    full_name,
                    model,
                    api_key,
                    target,
                    session_only_resume,
                } => {
                    let mut settings = store.load_settings()?;
                    if let Some(provider) = provider {
                        settings.provider = provider;
                    }
                    if let Some(tone) = tone {
                        settings.tone = tone;
                    }
                    if let Some(length) = length {
                        settings.length = length;
                    }
                    if let Some(full_name) = full_name {
                        settings.full_name = full_name.trim().to_string();
                    }
                    let target = target.unwrap_or(settings.provider);
                    if let Some(model) = model {
                        settings.models.set(target, model.trim().to_string());
                    }
                    if let Some(api_key) = api_key {
                        settings.api_keys.set(target, api_key.trim().to_string());
                    }
                    if let Some(session_only) = session_only_resume {
                        if session_only != settings.session_only_resume {
                            // Move the resume so it follows the new scope.
                            let resume_text = store.load_resume(&settings)?;
                            if !resume_text.is_empty() {
                                store.save_resume(&resume_text, session_only)?;
                            }
                            settings.session_only_resume = session_only;
                        }
                    }

                    store.save_settings(&settings)?;
                    println!("Settings saved to {}", store.settings_path().display());
                    Ok(())
                }
            }
        }

        Commands::Resume { command } => {
            let store = SettingsStore::open()?;
            let mut settings = store.load_settings()?;
            match command {
                ResumeCommands::Show => {
                    let resume_text = store.load_resume(&settings)?;
                    if resume_text.trim().is_empty() {
                        println!("No resume stored.");
                    } else {
                        println!("{}", resume_text);
                    }
                }

                ResumeCommands::Set { file, session_only } => {
                    let resume_text = read_text(file.as_deref())?;
                    if resume_text.trim().is_empty() {
                        return Err(AppError::input("Resume text is empty.").into());
                    }
                    if session_only && !settings.session_only_resume {
                        settings.session_only_resume = true;
                        store.save_settings(&settings)?;
                    }
                    store.save_resume(resume_text.trim(), settings.session_only_resume)?;
                    let scope = if settings.session_only_resume { "session" } else { "durable" };
                    println!("Resume saved ({} storage, {} chars).", scope, resume_text.trim().chars().count());
                }

                ResumeCommands::Clear => {
                    store.clear_resume()?;
                    println!("Resume cleared.");
                }
            }
            Ok(())
        }
    }
}
