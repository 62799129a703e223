use std::borrow::Cow::{self, Borrowed, Owned};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use draftsmith_client::{AgentApiClient, ClientConfig};
use draftsmith_core::catalog::{
    CatalogSubmission, ContractStatus, SavedContract, StatusUpdate, SubmissionMetadata,
};
use draftsmith_core::intake::{DocumentUpload, IntakeSession};
use draftsmith_core::session::{ConversationStore, Subsection, WorkflowStage};
use draftsmith_core::session::turn::{ConversationTurn, TurnRole};
use draftsmith_core::user_context::UserContext;
use draftsmith_infrastructure::{CatalogGuard, ProfileStorage};

const COMMANDS: &[&str] = &[
    "/help",
    "/login",
    "/logout",
    "/new",
    "/sections",
    "/rename",
    "/purpose",
    "/addsub",
    "/delsub",
    "/start",
    "/continue",
    "/draft",
    "/edit",
    "/document",
    "/export",
    "/save",
    "/catalog",
    "/list",
    "/status",
    "/upload",
    "/answer",
    "/submit-answers",
    "/finalize",
    "/health",
];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// REPL-side application state around the conversation store.
struct App {
    store: ConversationStore,
    api: Arc<AgentApiClient>,
    profile: ProfileStorage,
    guard: CatalogGuard,
    intake: Option<IntakeSession>,
    intake_title: Option<String>,
}

impl App {
    fn print_new_turns(&self, from: usize) {
        for turn in &self.store.turns()[from..] {
            print_turn(turn);
        }
    }

    /// Resolves a 1-based section number against the current structure.
    fn section_heading(&self, index_arg: &str) -> Option<String> {
        let index: usize = index_arg.parse().ok()?;
        let structure = self.store.structure()?;
        structure
            .sections
            .get(index.checked_sub(1)?)
            .map(|s| s.heading.clone())
    }

    fn document_title(&self) -> Option<String> {
        self.store
            .structure()
            .map(|s| s.title.clone())
            .or_else(|| self.intake_title.clone())
    }
}

fn print_turn(turn: &ConversationTurn) {
    match turn.role {
        TurnRole::User => println!("{}", format!("> {}", turn.content).green()),
        TurnRole::Assistant => {
            if let Some(section) = &turn.section {
                let marker = match &turn.subsection {
                    Some(sub) => format!("[{} / {}]", section, sub),
                    None => format!("[{}]", section),
                };
                println!("{}", marker.bright_magenta());
            }
            for line in turn.content.lines() {
                println!("{}", line.bright_blue());
            }
            if let Some(reason) = &turn.reason {
                println!("{}", format!("  ({})", reason).bright_black());
            }
        }
    }
}

fn print_stage(store: &ConversationStore) {
    let mut status = format!("stage: {}", store.stage());
    if let Some(section) = store.active_section() {
        status.push_str(&format!(" | drafting: {}", section));
    }
    if store.review_pending() {
        status.push_str(" | review pending (/continue to confirm)");
    }
    println!("{}", status.bright_black());
}

fn print_sections(store: &ConversationStore) {
    let Some(structure) = store.structure() else {
        println!("{}", "No contract structure yet.".bright_black());
        return;
    };
    println!("{}", format!("# {}", structure.title).bold());
    println!("{}", structure.idea.as_str().bright_black());
    for (i, section) in structure.sections.iter().enumerate() {
        let drafted = store
            .registry()
            .draft(&section.heading)
            .map(|d| !d.trim().is_empty())
            .unwrap_or(false);
        let mark = if drafted { "drafted" } else { "empty" };
        println!(
            "{}",
            format!("{}. {} ({})", i + 1, section.heading, mark).bright_blue()
        );
        println!("{}", format!("   {}", section.purpose).bright_black());
        for (j, sub) in section.subsections.iter().enumerate() {
            println!("   {}.{} {} - {}", i + 1, j + 1, sub.heading, sub.definition);
        }
    }
}

fn print_help() {
    println!("{}", "Workflow".bold());
    println!("  <text>            chat with the drafting agent");
    println!("  /sections         show the proposed structure");
    println!("  /rename N TEXT    rename section N");
    println!("  /purpose N TEXT   reword section N's purpose");
    println!("  /addsub N H :: D  add a subsection to section N");
    println!("  /delsub N M       delete subsection M of section N");
    println!("  /start            approve the structure and start drafting");
    println!("  /continue         confirm the draft under review");
    println!("  /draft N          show the draft of section N");
    println!("  /edit N TEXT      overwrite the draft of section N");
    println!("  /new              start a new workflow");
    println!("{}", "Documents".bold());
    println!("  /document         print the assembled document");
    println!("  /export [TITLE]   export the document as .docx");
    println!("  /save             persist the finished contract");
    println!("  /catalog          submit the document to the catalog");
    println!("  /list             list catalog records");
    println!("  /status ID S [E]  update a record's review status");
    println!("{}", "Document intake".bold());
    println!("  /upload PATH [INFO]  analyze an existing contract document");
    println!("  /answer FIELD TEXT   answer one missing field");
    println!("  /submit-answers      submit all answers, get the contract");
    println!("  /finalize            finish when nothing was missing");
    println!("{}", "Session".bold());
    println!("  /login ID DEPT ROLE LOCATION [LANG]");
    println!("  /logout, /health, /help, quit");
}

async fn handle_command(app: &mut App, line: &str) -> Result<()> {
    let (command, rest) = match line.split_once(' ') {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    match command {
        "/help" => print_help(),

        "/login" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            if parts.len() < 4 {
                println!("{}", "usage: /login ID DEPT ROLE LOCATION [LANG]".yellow());
                return Ok(());
            }
            let mut context = UserContext::new(parts[0], parts[1], parts[2], parts[3]);
            if let Some(lang) = parts.get(4) {
                context = context.with_language(*lang);
            }
            app.profile.save(&context)?;
            app.store.set_user_context(context);
            println!("{}", "Logged in.".bright_green());
        }

        "/logout" => {
            app.profile.clear()?;
            app.store.clear_user_context();
            println!("{}", "Logged out.".bright_green());
        }

        "/new" => {
            app.store.reset();
            app.intake = None;
            app.intake_title = None;
            println!("{}", "Started a new workflow.".bright_green());
        }

        "/sections" => print_sections(&app.store),

        "/rename" => {
            let (index, text) = split_index_arg(rest);
            match app.section_heading(&index) {
                Some(old) => match app.store.rename_section(&old, &text) {
                    Ok(()) => println!("{}", format!("Renamed \"{}\" to \"{}\".", old, text).bright_green()),
                    Err(e) => println!("{}", e.to_string().red()),
                },
                None => println!("{}", "No such section.".red()),
            }
        }

        "/purpose" => {
            let (index, text) = split_index_arg(rest);
            match app.section_heading(&index) {
                Some(heading) => match app.store.set_section_purpose(&heading, &text) {
                    Ok(()) => println!("{}", "Purpose updated.".bright_green()),
                    Err(e) => println!("{}", e.to_string().red()),
                },
                None => println!("{}", "No such section.".red()),
            }
        }

        "/addsub" => {
            let (index, text) = split_index_arg(rest);
            let Some((heading, definition)) = text.split_once("::") else {
                println!("{}", "usage: /addsub N HEADING :: DEFINITION".yellow());
                return Ok(());
            };
            match app.section_heading(&index) {
                Some(section) => {
                    let subsection = Subsection::new(heading.trim(), definition.trim());
                    match app.store.add_subsection(&section, subsection) {
                        Ok(()) => println!("{}", "Subsection added.".bright_green()),
                        Err(e) => println!("{}", e.to_string().red()),
                    }
                }
                None => println!("{}", "No such section.".red()),
            }
        }

        "/delsub" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let (Some(section_arg), Some(sub_arg)) = (parts.first(), parts.get(1)) else {
                println!("{}", "usage: /delsub N M".yellow());
                return Ok(());
            };
            let Some(heading) = app.section_heading(section_arg) else {
                println!("{}", "No such section.".red());
                return Ok(());
            };
            let Some(sub_index) = sub_arg.parse::<usize>().ok().and_then(|m| m.checked_sub(1))
            else {
                println!("{}", "usage: /delsub N M".yellow());
                return Ok(());
            };
            match app.store.remove_subsection(&heading, sub_index) {
                Ok(()) => println!("{}", "Subsection removed.".bright_green()),
                Err(e) => println!("{}", e.to_string().red()),
            }
        }

        "/start" => {
            let before = app.store.turns().len();
            println!("{}", "Starting drafting...".bright_black());
            match app.store.start_drafting().await {
                Ok(_) => {
                    app.print_new_turns(before);
                    print_stage(&app.store);
                }
                Err(e) => println!("{}", e.to_string().red()),
            }
        }

        "/continue" => submit(app, "").await?,

        "/draft" => match app.section_heading(rest) {
            Some(heading) => match app.store.registry().draft(&heading) {
                Some(draft) if !draft.trim().is_empty() => {
                    println!("{}", format!("## {}", heading).bold());
                    println!("{}", draft);
                }
                _ => println!("{}", "No draft for that section yet.".bright_black()),
            },
            None => println!("{}", "No such section.".red()),
        },

        "/edit" => {
            let (index, text) = split_index_arg(rest);
            match app.section_heading(&index) {
                Some(heading) => {
                    app.store.set_draft(&heading, &text);
                    println!("{}", format!("Draft of \"{}\" updated.", heading).bright_green());
                }
                None => println!("{}", "No such section.".red()),
            }
        }

        "/document" => {
            let title = app.document_title();
            let document = app.store.registry().full_document(title.as_deref());
            if document.trim().is_empty() {
                println!("{}", "The document is still empty.".bright_black());
            } else {
                println!("{}", document);
            }
        }

        "/export" => {
            let title = if rest.is_empty() {
                app.document_title()
            } else {
                Some(rest.to_string())
            };
            match draftsmith_export::render_registry(title.as_deref(), app.store.registry()) {
                Ok(document) => {
                    std::fs::write(&document.file_name, &document.bytes)?;
                    println!(
                        "{}",
                        format!("Exported {} bytes to {}", document.bytes.len(), document.file_name)
                            .bright_green()
                    );
                }
                Err(e) => println!("{}", e.to_string().red()),
            }
        }

        "/save" => {
            let Some(session_id) = app.store.session_id().map(str::to_string) else {
                println!("{}", "No active session to save.".red());
                return Ok(());
            };
            let title = app.document_title().unwrap_or_else(|| "Generated Contract".to_string());
            let sections = app
                .store
                .structure()
                .map(|s| s.sections.clone())
                .unwrap_or_default();
            let drafts: HashMap<String, String> = app
                .store
                .registry()
                .non_blank_pairs()
                .into_iter()
                .collect();
            let contract = SavedContract {
                title,
                drafts,
                sections,
            };
            match app.api.save_contract(&session_id, &contract).await {
                Ok(id) => println!("{}", format!("Contract saved (session {}).", id).bright_green()),
                Err(e) => println!("{}", e.user_message().red()),
            }
        }

        "/catalog" => {
            let title = app.document_title().unwrap_or_else(|| "Generated Contract".to_string());
            let section_count = app.store.registry().len();
            if app.guard.is_saved(&title, section_count)? {
                println!(
                    "{}",
                    "This draft set was already submitted to the catalog.".yellow()
                );
                return Ok(());
            }
            let drafts: HashMap<String, String> = app
                .store
                .registry()
                .non_blank_pairs()
                .into_iter()
                .collect();
            if drafts.is_empty() {
                println!("{}", "Nothing to submit: every draft is empty.".red());
                return Ok(());
            }
            let (submitted_by, department) = app
                .store
                .user_context()
                .map(|c| (c.user_id.clone(), c.department.clone()))
                .unwrap_or_else(|| ("anonymous".to_string(), "General".to_string()));
            let submission = CatalogSubmission {
                title: title.clone(),
                idea: app
                    .store
                    .structure()
                    .map(|s| s.idea.clone())
                    .unwrap_or_default(),
                drafts,
                status: ContractStatus::Submitted,
                metadata: SubmissionMetadata {
                    submitted_by,
                    department,
                    sections_count: section_count,
                },
            };
            match app.api.create_contract(&submission).await {
                Ok(session_id) => {
                    app.guard.mark_saved(&title, section_count, &session_id)?;
                    println!(
                        "{}",
                        format!("Submitted to the catalog (session {}).", session_id).bright_green()
                    );
                }
                Err(e) => println!("{}", e.user_message().red()),
            }
        }

        "/list" => match app.api.list_contracts().await {
            Ok(records) => {
                if records.is_empty() {
                    println!("{}", "The catalog is empty.".bright_black());
                }
                for record in records {
                    let score = record
                        .evaluation_score
                        .map(|s| format!(" score {}", s))
                        .unwrap_or_default();
                    println!(
                        "{}  {} [{}]{}",
                        record.session_id.bright_black(),
                        record.title,
                        record.status,
                        score
                    );
                }
            }
            Err(e) => println!("{}", e.user_message().red()),
        },

        "/status" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let (Some(session_id), Some(status_arg)) = (parts.first(), parts.get(1)) else {
                println!("{}", "usage: /status SESSION_ID STATUS [SCORE]".yellow());
                return Ok(());
            };
            let Ok(status) = status_arg.parse::<ContractStatus>() else {
                println!("{}", format!("unknown status \"{}\"", status_arg).red());
                return Ok(());
            };
            let update = StatusUpdate {
                session_id: session_id.to_string(),
                status,
                evaluation_score: parts.get(2).and_then(|s| s.parse().ok()),
                reviewer_feedback: None,
            };
            match app.api.update_contract_status(&update).await {
                Ok(()) => println!("{}", "Status updated.".bright_green()),
                Err(e) => println!("{}", e.user_message().red()),
            }
        }

        "/upload" => {
            let (path, info) = match rest.split_once(' ') {
                Some((p, i)) => (p, Some(i.trim().to_string())),
                None => (rest, None),
            };
            if path.is_empty() {
                println!("{}", "usage: /upload PATH [ADDITIONAL INFO]".yellow());
                return Ok(());
            }
            let file_name = std::path::Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string());
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    println!("{}", format!("cannot read {}: {}", path, e).red());
                    return Ok(());
                }
            };
            let mut upload = DocumentUpload::from_file(file_name, bytes);
            if let Some(info) = info {
                upload = upload.with_additional_info(info);
            }
            let mut intake = IntakeSession::new(app.api.clone());
            println!("{}", "Analyzing document...".bright_black());
            match intake.begin(&upload).await {
                Ok(analysis) => {
                    println!("{}", analysis.message.bright_blue());
                    if analysis.missing_data.is_empty() {
                        println!(
                            "{}",
                            "Nothing is missing - run /finalize to generate the contract."
                                .bright_green()
                        );
                    } else {
                        println!(
                            "{}",
                            format!("{} fields need answers:", analysis.missing_data.len()).bold()
                        );
                        for field in &analysis.missing_data {
                            println!(
                                "  {} ({}) - {}",
                                field.field.as_str().bright_blue(),
                                field.priority,
                                field.description
                            );
                        }
                        println!("{}", "Answer with /answer FIELD TEXT".bright_black());
                    }
                    app.intake = Some(intake);
                }
                Err(e) => println!("{}", e.user_message().red()),
            }
        }

        "/answer" => {
            let Some(intake) = app.intake.as_mut() else {
                println!("{}", "No document intake in progress.".red());
                return Ok(());
            };
            let Some((field, answer)) = rest.split_once(' ') else {
                println!("{}", "usage: /answer FIELD TEXT".yellow());
                return Ok(());
            };
            match intake.record_answer(field, answer) {
                Ok(()) => {
                    let left = intake.unanswered().len();
                    if left == 0 {
                        println!(
                            "{}",
                            "All fields answered - run /submit-answers.".bright_green()
                        );
                    } else {
                        println!("{}", format!("Recorded. {} fields left.", left).bright_green());
                    }
                }
                Err(e) => println!("{}", e.to_string().red()),
            }
        }

        "/submit-answers" | "/finalize" => {
            let Some(intake) = app.intake.as_mut() else {
                println!("{}", "No document intake in progress.".red());
                return Ok(());
            };
            println!("{}", "Generating the contract...".bright_black());
            let result = if command == "/finalize" {
                intake.finalize().await
            } else {
                intake.submit_answers().await
            };
            match result {
                Ok(contract) => {
                    let contract = contract.clone();
                    let registry = contract.to_registry();
                    app.intake_title = contract.title.clone();
                    for heading in registry.headings() {
                        if let Some(draft) = registry.draft(heading) {
                            app.store.set_draft(heading, draft);
                        }
                    }
                    println!(
                        "{}",
                        format!(
                            "Contract generated with {} sections - /document to view, /export to download.",
                            registry.len()
                        )
                        .bright_green()
                    );
                }
                Err(e) => println!("{}", e.user_message().red()),
            }
        }

        "/health" => match app.api.health().await {
            Ok(health) => println!(
                "{}",
                format!("service: {} | database: {}", health.status, health.database).bright_blue()
            ),
            Err(e) => println!("{}", e.user_message().red()),
        },

        other => println!("{}", format!("Unknown command: {}", other).bright_black()),
    }
    Ok(())
}

/// Sends one chat input through the store; the await blocks the REPL, so
/// duplicate submission while a request is pending is impossible by
/// construction.
async fn submit(app: &mut App, text: &str) -> Result<()> {
    let before = app.store.turns().len();
    println!("{}", "... contacting the drafting agent".bright_black());
    match app.store.submit_user_input(text).await {
        Ok(_) => {
            app.print_new_turns(before);
            if app.store.stage() == WorkflowStage::StructureReview {
                print_sections(&app.store);
                println!(
                    "{}",
                    "Adjust the sections if needed, then /start to begin drafting.".bright_black()
                );
            }
            print_stage(&app.store);
        }
        Err(e) => println!("{}", e.to_string().red()),
    }
    Ok(())
}

fn split_index_arg(rest: &str) -> (String, String) {
    match rest.split_once(' ') {
        Some((index, text)) => (index.to_string(), text.trim().to_string()),
        None => (rest.to_string(), String::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // ===== Backend initialization =====
    let config = ClientConfig::load();
    let api = Arc::new(AgentApiClient::from_config(&config));
    let profile = ProfileStorage::new_default()?;
    let guard = CatalogGuard::new_default()?;

    let saved_context = profile.load()?;
    let store = ConversationStore::new(api.clone()).with_user_context(saved_context.clone());

    let mut app = App {
        store,
        api,
        profile,
        guard,
        intake: None,
        intake_title: None,
    };

    // ===== REPL setup =====
    let helper = CliHelper::new();
    let mut rl: Editor<CliHelper, rustyline::history::DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Draftsmith ===".bright_magenta().bold());
    println!("{}", format!("agent: {}", config.base_url).bright_black());
    if let Some(context) = &saved_context {
        println!(
            "{}",
            format!("logged in as {} ({})", context.user_id, context.department).bright_black()
        );
    }
    println!(
        "{}",
        "Describe the contract you need, or type /help for commands.".bright_black()
    );
    println!();

    // ===== Main REPL loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if trimmed.starts_with('/') {
                    handle_command(&mut app, trimmed).await?;
                } else {
                    submit(&mut app, trimmed).await?;
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
