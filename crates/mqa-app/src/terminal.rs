//! Terminal view for the chat widget.
//!
//! Plays the part of the page: prints the engine's render instructions as
//! plain text and turns typed lines into widget commands. Prompt options
//! are numbered; typing a number picks the option.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use mqa_chat::engine::{Command, Effect, Prompt};
use mqa_chat::transcript::{strip_markup, VISITOR_LABEL};
use mqa_chat::EffectSink;
use mqa_core::types::Role;
use tracing::{debug, info, warn};

pub const HELP: &str = "Commands: <number> pick an option, any other text asks a question,\n\
/open toggles the widget, /reset clears the chat, /download saves a transcript, /quit exits.";

/// Options currently offered to the visitor, shared between the view and
/// the input loop.
#[derive(Debug, Default)]
pub struct Menu {
    choices: Vec<Command>,
    confirming: bool,
}

/// What a typed line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Help,
    Quit,
    Unknown(String),
    Nothing,
}

/// Map one typed line to an [`Input`].
pub fn parse_input(line: &str, menu: &mut Menu) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Nothing;
    }

    if std::mem::take(&mut menu.confirming) {
        match line {
            "/yes" | "y" | "yes" => return Input::Command(Command::ConfirmReset),
            "/no" | "n" | "no" => return Input::Command(Command::CancelReset),
            _ => {}
        }
    }

    match line {
        "/open" | "/close" => Input::Command(Command::Toggle),
        "/reset" => Input::Command(Command::RequestReset),
        "/download" => Input::Command(Command::Download),
        "/help" => Input::Help,
        "/quit" | "/exit" => Input::Quit,
        "/yes" | "/no" => Input::Unknown("Nothing to confirm".to_string()),
        _ if line.starts_with('/') => Input::Unknown(format!("Unknown command {line}")),
        _ => match line.parse::<usize>() {
            Ok(n) if (1..=menu.choices.len()).contains(&n) => {
                Input::Command(menu.choices[n - 1].clone())
            }
            _ => Input::Command(Command::Submit(line.to_string())),
        },
    }
}

pub struct TerminalView<W: Write + Send> {
    out: W,
    menu: Arc<Mutex<Menu>>,
    bot_name: String,
    download_dir: PathBuf,
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W, menu: Arc<Mutex<Menu>>, bot_name: String, download_dir: PathBuf) -> Self {
        Self {
            out,
            menu,
            bot_name,
            download_dir,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!(error = %e, "Failed to write to terminal");
        }
    }

    fn with_menu(&self, f: impl FnOnce(&mut Menu)) {
        match self.menu.lock() {
            Ok(mut menu) => f(&mut menu),
            Err(_) => warn!("Menu lock poisoned"),
        }
    }

    fn show_prompt(&mut self, prompt: Prompt) {
        let (header, entries): (Option<String>, Vec<(String, Command)>) = match prompt {
            Prompt::Categories { options } => (
                None,
                options
                    .into_iter()
                    .map(|c| (c.label, Command::PickCategory(c.id)))
                    .collect(),
            ),
            Prompt::SubCategories { header, options } => (
                Some(header),
                options
                    .into_iter()
                    .map(|c| (c.label, Command::PickSubCategory(c.id)))
                    .collect(),
            ),
            Prompt::Questions {
                header,
                questions,
                custom_label,
            } => {
                let mut entries: Vec<(String, Command)> = questions
                    .into_iter()
                    .map(|q| (q.clone(), Command::PickQuestion(q)))
                    .collect();
                entries.push((custom_label, Command::PickCustomQuestion));
                (Some(header), entries)
            }
            Prompt::CustomInput { header, note } => {
                self.line(&header);
                self.line(&note);
                self.with_menu(|menu| menu.choices.clear());
                return;
            }
            Prompt::FollowUp { header, actions } => (
                Some(header),
                actions
                    .into_iter()
                    .map(|a| (a.label().to_string(), Command::FollowUp(a)))
                    .collect(),
            ),
        };

        if let Some(header) = header {
            self.line(&header);
        }
        for (i, (label, _)) in entries.iter().enumerate() {
            self.line(&format!("  {}. {}", i + 1, label));
        }
        let commands = entries.into_iter().map(|(_, c)| c).collect();
        self.with_menu(|menu| menu.choices = commands);
    }

    fn save_download(&mut self, file_name: &str, contents: &str) {
        let path = self.download_dir.join(file_name);
        match std::fs::write(&path, contents) {
            Ok(()) => {
                info!(path = %path.display(), "Transcript saved");
                self.line(&format!("Transcript saved to {}", path.display()));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to save transcript");
                self.line("Could not save the transcript.");
            }
        }
    }
}

impl<W: Write + Send> EffectSink for TerminalView<W> {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::SetOpen(true) => self.line("--- MQA chat ---"),
            Effect::SetOpen(false) => {
                self.with_menu(|menu| menu.choices.clear());
                self.line("--- chat closed, /open to reopen ---");
            }
            Effect::ClearMessages => self.line(""),
            Effect::AppendMessage(message) => {
                let sender = match message.role {
                    Role::Operator => self.bot_name.as_str(),
                    Role::Visitor => VISITOR_LABEL,
                };
                let text = format!("[{}] {}: {}", message.time, sender, strip_markup(&message.html));
                self.line(&text);
            }
            Effect::ShowPrompt(prompt) => self.show_prompt(prompt),
            Effect::ClearPrompt => self.with_menu(|menu| menu.choices.clear()),
            Effect::SetTyping(true) => {
                let text = format!("{} is typing...", self.bot_name);
                self.line(&text);
            }
            Effect::SetImage(key) => debug!(image = %key, "Image changed"),
            Effect::ConfirmReset(question) => {
                self.with_menu(|menu| menu.confirming = true);
                self.line(&format!("{question} (/yes or /no)"));
            }
            Effect::Download {
                file_name,
                contents,
            } => self.save_download(&file_name, &contents),
            Effect::Notice(text) => self.line(&text),
            Effect::SetTyping(false)
            | Effect::FocusInput
            | Effect::ScheduleAnswer { .. }
            | Effect::RequestRemote { .. } => {}
        }
    }
}
