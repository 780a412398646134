//! Conversation state machine.
//!
//! The engine consumes typed [`Command`]s from the view and returns the
//! [`Effect`]s the view must apply. It owns the whole [`ConversationState`]
//! and is the only code that appends to the message log or changes the
//! selected category; every such change is persisted as a full snapshot.
//!
//! Delayed work (the canned-answer delay and remote requests) is requested
//! through effects carrying a [`Ticket`]. The runtime feeds completions back
//! as commands, and a completion whose ticket is no longer the pending one
//! is discarded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, SubsecRound, Utc};
use mqa_core::config::WidgetConfig;
use mqa_core::types::{Message, PersistedSnapshot, Role};
use tracing::{debug, info, warn};

use crate::catalog::{AnswerCatalog, DEFAULT_IMAGE};
use crate::error::CatalogError;
use crate::history::HistoryStore;
use crate::log::MessageLog;
use crate::remote::AnswerResult;
use crate::render::{RenderedMessage, SafeFormatter};
use crate::transcript;

pub const WELCOME_TEXT: &str = "Welcome to MQABot!";
pub const CHOOSE_CATEGORY_TEXT: &str = "Please choose which category best suits your inquiries:";
pub const CATALOG_MISS_TEXT: &str =
    "I'm sorry, I don't have a pre-defined answer for that question. Please try asking in your own words.";
pub const NO_CATEGORY_TEXT: &str = "Please select a category first";
pub const REMOTE_FAILURE_TEXT: &str =
    "Sorry, I encountered an error. Please try again or contact MQA directly.";
pub const CONTACT_TEXT: &str = "For direct assistance, please contact MQA:\n📞 Phone: 03-7968 7002\n📧 Email: enquiry@mqa.gov.my\n🌐 Website: www.mqa.gov.my";
pub const CUSTOM_QUESTION_LABEL: &str = "Ask a custom question";
pub const SUB_CATEGORY_HEADER: &str = "APEL has 4 main components. Please choose one:";
pub const CUSTOM_INPUT_HEADER: &str = "Type your question in the input field below:";
pub const FOLLOW_UP_HEADER: &str = "Need more information?";
pub const RESET_QUESTION: &str =
    "Are you sure you want to reset the chat? All conversation history will be lost.";
pub const NOTHING_TO_DOWNLOAD: &str = "No chat history to download.";

// =============================================================================
// Commands and effects
// =============================================================================

/// Identifies one piece of delayed work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Options of the post-answer menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowUpAction {
    /// Only offered when the current topic is a sub-category.
    BackToApel,
    MoreQuestions,
    ChangeCategory,
    ContactInfo,
    CustomQuestion,
}

impl FollowUpAction {
    pub fn label(self) -> &'static str {
        match self {
            FollowUpAction::BackToApel => "Back to APEL Categories",
            FollowUpAction::MoreQuestions => "Show more questions",
            FollowUpAction::ChangeCategory => "Choose different category",
            FollowUpAction::ContactInfo => "Contact MQA directly",
            FollowUpAction::CustomQuestion => "Ask a custom question",
        }
    }
}

/// Events from the view, plus completions fed back by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle,
    PickCategory(String),
    PickSubCategory(String),
    PickQuestion(String),
    PickCustomQuestion,
    FollowUp(FollowUpAction),
    Submit(String),
    RequestReset,
    ConfirmReset,
    CancelReset,
    Download,
    AnswerReady { ticket: Ticket },
    RemoteAnswered { ticket: Ticket, result: AnswerResult },
}

impl Command {
    /// Commands that make sense while the widget is closed.
    fn allowed_while_closed(&self) -> bool {
        self.is_completion() || matches!(self, Command::Toggle | Command::Download)
    }

    /// Completions fed back by the runtime rather than sent by the visitor.
    fn is_completion(&self) -> bool {
        matches!(
            self,
            Command::AnswerReady { .. } | Command::RemoteAnswered { .. }
        )
    }
}

/// A selectable option in a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

/// The interactive affordance currently offered below the messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Categories {
        options: Vec<Choice>,
    },
    SubCategories {
        header: String,
        options: Vec<Choice>,
    },
    Questions {
        header: String,
        questions: Vec<String>,
        custom_label: String,
    },
    CustomInput {
        header: String,
        note: String,
    },
    FollowUp {
        header: String,
        actions: Vec<FollowUpAction>,
    },
}

/// Render instructions, applied by the view in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SetOpen(bool),
    ClearMessages,
    AppendMessage(RenderedMessage),
    ShowPrompt(Prompt),
    ClearPrompt,
    SetTyping(bool),
    FocusInput,
    SetImage(String),
    ScheduleAnswer { ticket: Ticket, delay: Duration },
    RequestRemote { ticket: Ticket, text: String },
    /// Ask the visitor to confirm a destructive action.
    ConfirmReset(String),
    Download { file_name: String, contents: String },
    Notice(String),
}

// =============================================================================
// State
// =============================================================================

/// Where the conversation currently is. The topic carried by a stage is a
/// category or sub-category id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Closed,
    AwaitingCategory,
    AwaitingSubCategory,
    AwaitingQuestionChoice(String),
    AwaitingCustomInput(String),
    /// An answer is being prepared for the topic.
    Answering(String),
    FollowUp(String),
}

/// Everything the widget knows about the conversation.
#[derive(Debug, Clone)]
pub struct ConversationState {
    is_open: bool,
    selected_category: Option<String>,
    log: MessageLog,
    stage: Stage,
}

impl ConversationState {
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// `None` only until a category is picked (or after it is cleared).
    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        self.log.all()
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }
}

#[derive(Debug, Clone)]
enum PendingAnswer {
    Canned {
        ticket: Ticket,
        topic: String,
        answer: Option<String>,
    },
    Remote {
        ticket: Ticket,
        topic: String,
    },
}

impl PendingAnswer {
    fn ticket(&self) -> Ticket {
        match self {
            PendingAnswer::Canned { ticket, .. } | PendingAnswer::Remote { ticket, .. } => *ticket,
        }
    }

    fn topic(&self) -> &str {
        match self {
            PendingAnswer::Canned { topic, .. } | PendingAnswer::Remote { topic, .. } => topic,
        }
    }
}

// =============================================================================
// ConversationEngine
// =============================================================================

pub struct ConversationEngine {
    catalog: Arc<AnswerCatalog>,
    history: HistoryStore,
    formatter: SafeFormatter,
    answer_delay: Duration,
    bot_name: String,
    state: ConversationState,
    pending: Option<PendingAnswer>,
    next_ticket: u64,
    /// Set by `RequestReset`; only an armed confirmation resets.
    reset_armed: bool,
}

impl ConversationEngine {
    /// Validate the catalog and restore the persisted conversation.
    ///
    /// A restored selection the catalog does not know is dropped; the
    /// restored messages are kept.
    pub fn new(
        catalog: Arc<AnswerCatalog>,
        history: HistoryStore,
        config: &WidgetConfig,
    ) -> Result<Self, CatalogError> {
        catalog.validate()?;

        let snapshot = history.load();
        let mut selected = snapshot.selected_category;
        if let Some(id) = selected.as_deref() {
            if catalog.topic(id).is_none() {
                warn!(category = %id, "Restored history names an unknown category, clearing selection");
                selected = None;
            }
        }
        debug!(
            messages = snapshot.messages.len(),
            selected = ?selected,
            "Conversation restored"
        );

        Ok(Self {
            catalog,
            history,
            formatter: SafeFormatter::new(),
            answer_delay: Duration::from_millis(config.answer_delay_ms),
            bot_name: config.bot_name.clone(),
            state: ConversationState {
                is_open: false,
                selected_category: selected,
                log: MessageLog::from_messages(snapshot.messages),
                stage: Stage::Closed,
            },
            pending: None,
            next_ticket: 0,
            reset_armed: false,
        })
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn catalog(&self) -> &AnswerCatalog {
        &self.catalog
    }

    /// Ticket of the answer currently being prepared, if any.
    pub fn pending_ticket(&self) -> Option<Ticket> {
        self.pending.as_ref().map(PendingAnswer::ticket)
    }

    /// Apply one command and return the effects for the view.
    pub fn handle(&mut self, command: Command) -> Vec<Effect> {
        let mut fx = Vec::new();
        if !self.state.is_open && !command.allowed_while_closed() {
            debug!(?command, "Ignoring command while closed");
            return fx;
        }

        // Any visitor command answers or withdraws a pending reset question.
        let reset_armed = if command.is_completion() {
            self.reset_armed
        } else {
            std::mem::take(&mut self.reset_armed)
        };

        match command {
            Command::Toggle => self.toggle(&mut fx),
            Command::PickCategory(id) => self.pick_category(&id, &mut fx),
            Command::PickSubCategory(id) => self.pick_sub_category(&id, &mut fx),
            Command::PickQuestion(question) => self.pick_question(question, &mut fx),
            Command::PickCustomQuestion => self.pick_custom_question(&mut fx),
            Command::FollowUp(action) => self.follow_up(action, &mut fx),
            Command::Submit(text) => self.submit(&text, &mut fx),
            Command::RequestReset => {
                self.reset_armed = true;
                fx.push(Effect::ConfirmReset(RESET_QUESTION.to_string()));
            }
            Command::ConfirmReset if reset_armed => self.reset(&mut fx),
            Command::ConfirmReset => self.ignore("ConfirmReset"),
            Command::CancelReset => debug!("Reset cancelled"),
            Command::Download => self.download(&mut fx),
            Command::AnswerReady { ticket } => self.answer_ready(ticket, &mut fx),
            Command::RemoteAnswered { ticket, result } => {
                self.remote_answered(ticket, result, &mut fx)
            }
        }
        fx
    }

    // ---- Open / close ----

    fn toggle(&mut self, fx: &mut Vec<Effect>) {
        if self.state.is_open {
            self.state.is_open = false;
            self.state.stage = Stage::Closed;
            fx.push(Effect::SetOpen(false));
            return;
        }

        self.state.is_open = true;
        fx.push(Effect::SetOpen(true));
        if self.state.log.is_empty() && self.state.selected_category.is_none() {
            self.greet(fx);
        } else {
            self.restore(fx);
        }
    }

    fn greet(&mut self, fx: &mut Vec<Effect>) {
        fx.push(Effect::ClearMessages);
        fx.push(Effect::SetImage(DEFAULT_IMAGE.to_string()));
        self.append(WELCOME_TEXT, Role::Operator, fx);
        self.append(CHOOSE_CATEGORY_TEXT, Role::Operator, fx);
        self.show_categories(fx);
    }

    /// Re-render the log and present the prompt matching the selection.
    fn restore(&mut self, fx: &mut Vec<Effect>) {
        fx.push(Effect::ClearMessages);
        for message in self.state.log.all() {
            fx.push(Effect::AppendMessage(self.formatter.render(message)));
        }
        fx.push(Effect::SetImage(self.image()));

        if let Some(pending) = &self.pending {
            self.state.stage = Stage::Answering(pending.topic().to_string());
            fx.push(Effect::SetTyping(true));
            return;
        }
        match self.state.selected_category.clone() {
            None => self.show_categories(fx),
            Some(topic) => self.show_follow_up(topic, fx),
        }
    }

    // ---- Navigation ----

    fn pick_category(&mut self, id: &str, fx: &mut Vec<Effect>) {
        if self.state.stage != Stage::AwaitingCategory {
            self.ignore("pick_category");
            return;
        }
        let catalog = Arc::clone(&self.catalog);
        let Some(category) = catalog.category(id) else {
            warn!(category = %id, "Unknown category picked");
            return;
        };

        fx.push(Effect::ClearPrompt);
        self.state.selected_category = Some(category.id.clone());
        self.append(format!("Selected: {}", category.name), Role::Visitor, fx);
        fx.push(Effect::SetImage(self.image()));

        if category.has_sub_categories {
            self.show_sub_categories(&category.id, fx);
        } else {
            self.show_questions(category.id.clone(), fx);
        }
    }

    fn pick_sub_category(&mut self, id: &str, fx: &mut Vec<Effect>) {
        if self.state.stage != Stage::AwaitingSubCategory {
            self.ignore("pick_sub_category");
            return;
        }
        let catalog = Arc::clone(&self.catalog);
        let Some(sub) = catalog.sub_category(id) else {
            warn!(sub_category = %id, "Unknown sub-category picked");
            return;
        };
        if self.state.selected_category.as_deref() != Some(sub.parent.as_str()) {
            self.ignore("pick_sub_category");
            return;
        }

        fx.push(Effect::ClearPrompt);
        self.state.selected_category = Some(sub.id.clone());
        self.append(format!("Selected: {}", sub.name), Role::Visitor, fx);
        fx.push(Effect::SetImage(self.image()));
        self.show_questions(sub.id.clone(), fx);
    }

    fn pick_question(&mut self, question: String, fx: &mut Vec<Effect>) {
        let Stage::AwaitingQuestionChoice(topic) = &self.state.stage else {
            self.ignore("pick_question");
            return;
        };
        let topic = topic.clone();

        fx.push(Effect::ClearPrompt);
        let answer = self.catalog.lookup(&topic, &question).map(str::to_string);
        if answer.is_none() {
            debug!(topic = %topic, question = %question, "No canned answer for question");
        }
        self.append(question, Role::Visitor, fx);

        let ticket = self.issue_ticket();
        self.supersede(PendingAnswer::Canned {
            ticket,
            topic: topic.clone(),
            answer,
        });
        fx.push(Effect::SetTyping(true));
        fx.push(Effect::ScheduleAnswer {
            ticket,
            delay: self.answer_delay,
        });
        self.state.stage = Stage::Answering(topic);
    }

    fn pick_custom_question(&mut self, fx: &mut Vec<Effect>) {
        let Stage::AwaitingQuestionChoice(topic) = &self.state.stage else {
            self.ignore("pick_custom_question");
            return;
        };
        let topic = topic.clone();

        fx.push(Effect::ClearPrompt);
        self.append(CUSTOM_QUESTION_LABEL, Role::Visitor, fx);
        self.show_custom_input(topic, fx);
    }

    fn follow_up(&mut self, action: FollowUpAction, fx: &mut Vec<Effect>) {
        let Stage::FollowUp(topic) = &self.state.stage else {
            self.ignore("follow_up");
            return;
        };
        let topic = topic.clone();
        let catalog = Arc::clone(&self.catalog);

        match action {
            FollowUpAction::MoreQuestions => {
                fx.push(Effect::ClearPrompt);
                self.show_questions(topic, fx);
            }
            FollowUpAction::BackToApel => {
                let Some(parent) = catalog.parent_of(&topic) else {
                    self.ignore("back_to_apel");
                    return;
                };
                fx.push(Effect::ClearPrompt);
                self.state.selected_category = Some(parent.to_string());
                self.persist();
                self.show_sub_categories(parent, fx);
            }
            FollowUpAction::ChangeCategory => {
                fx.push(Effect::ClearPrompt);
                self.state.selected_category = None;
                self.persist();
                fx.push(Effect::SetImage(DEFAULT_IMAGE.to_string()));
                self.show_categories(fx);
            }
            FollowUpAction::ContactInfo => {
                fx.push(Effect::ClearPrompt);
                self.append(CONTACT_TEXT, Role::Operator, fx);
                self.show_follow_up(topic, fx);
            }
            FollowUpAction::CustomQuestion => {
                fx.push(Effect::ClearPrompt);
                self.show_custom_input(topic, fx);
            }
        }
    }

    // ---- Free-text questions ----

    fn submit(&mut self, text: &str, fx: &mut Vec<Effect>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        fx.push(Effect::ClearPrompt);
        self.append(text, Role::Visitor, fx);

        let Some(topic) = self.state.selected_category.clone() else {
            self.append(NO_CATEGORY_TEXT, Role::Operator, fx);
            self.show_categories(fx);
            return;
        };

        let ticket = self.issue_ticket();
        self.supersede(PendingAnswer::Remote {
            ticket,
            topic: topic.clone(),
        });
        fx.push(Effect::SetTyping(true));
        fx.push(Effect::RequestRemote {
            ticket,
            text: text.to_string(),
        });
        self.state.stage = Stage::Answering(topic);
    }

    // ---- Completions ----

    fn answer_ready(&mut self, ticket: Ticket, fx: &mut Vec<Effect>) {
        match self.pending.take() {
            Some(PendingAnswer::Canned {
                ticket: expected,
                topic,
                answer,
            }) if expected == ticket => {
                fx.push(Effect::SetTyping(false));
                let text = answer.unwrap_or_else(|| CATALOG_MISS_TEXT.to_string());
                self.append(text, Role::Operator, fx);
                self.finish_answer(topic, fx);
            }
            other => {
                self.pending = other;
                debug!(ticket = ticket.value(), "Discarding stale canned answer");
            }
        }
    }

    fn remote_answered(&mut self, ticket: Ticket, result: AnswerResult, fx: &mut Vec<Effect>) {
        match self.pending.take() {
            Some(PendingAnswer::Remote {
                ticket: expected,
                topic,
            }) if expected == ticket => {
                fx.push(Effect::SetTyping(false));
                let text = match result {
                    AnswerResult::Answered(answer) => answer,
                    AnswerResult::Failed(reason) => {
                        warn!(topic = %topic, reason = %reason, "Remote answer failed");
                        REMOTE_FAILURE_TEXT.to_string()
                    }
                    AnswerResult::Empty => {
                        warn!(topic = %topic, "Remote endpoint returned no answer");
                        REMOTE_FAILURE_TEXT.to_string()
                    }
                };
                self.append(text, Role::Operator, fx);
                self.finish_answer(topic, fx);
            }
            other => {
                self.pending = other;
                debug!(ticket = ticket.value(), "Discarding stale remote answer");
            }
        }
    }

    /// The answer was appended; offer the follow-up menu if anyone can see it.
    fn finish_answer(&mut self, topic: String, fx: &mut Vec<Effect>) {
        if self.state.is_open {
            self.show_follow_up(topic, fx);
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn supersede(&mut self, pending: PendingAnswer) {
        if let Some(previous) = self.pending.replace(pending) {
            debug!(
                ticket = previous.ticket().value(),
                "Pending answer superseded"
            );
        }
    }

    // ---- Reset / download ----

    fn reset(&mut self, fx: &mut Vec<Effect>) {
        self.history.clear();
        self.state.log.reset();
        self.state.selected_category = None;
        self.pending = None;
        info!("Chat reset");

        fx.push(Effect::ClearPrompt);
        fx.push(Effect::SetTyping(false));
        self.greet(fx);
    }

    fn download(&mut self, fx: &mut Vec<Effect>) {
        if self.state.log.is_empty() {
            fx.push(Effect::Notice(NOTHING_TO_DOWNLOAD.to_string()));
            return;
        }
        let now = Local::now();
        let category = self
            .state
            .selected_category
            .as_deref()
            .map(|id| self.catalog.display_name(id));
        let contents = transcript::format_transcript(self.state.log.all(), category, &now, &self.bot_name);
        fx.push(Effect::Download {
            file_name: transcript::export_file_name(&now),
            contents,
        });
    }

    // ---- Prompts ----

    fn show_categories(&mut self, fx: &mut Vec<Effect>) {
        let options = self
            .catalog
            .categories()
            .iter()
            .map(|c| Choice {
                id: c.id.clone(),
                label: c.name.clone(),
            })
            .collect();
        fx.push(Effect::ShowPrompt(Prompt::Categories { options }));
        self.state.stage = Stage::AwaitingCategory;
    }

    fn show_sub_categories(&mut self, parent: &str, fx: &mut Vec<Effect>) {
        let options = self
            .catalog
            .sub_categories_of(parent)
            .map(|s| Choice {
                id: s.id.clone(),
                label: s.name.clone(),
            })
            .collect();
        fx.push(Effect::ShowPrompt(Prompt::SubCategories {
            header: SUB_CATEGORY_HEADER.to_string(),
            options,
        }));
        self.state.stage = Stage::AwaitingSubCategory;
    }

    fn show_questions(&mut self, topic: String, fx: &mut Vec<Effect>) {
        fx.push(Effect::ShowPrompt(Prompt::Questions {
            header: format!("Common questions about {}:", self.catalog.display_name(&topic)),
            questions: self.catalog.questions_for(&topic).to_vec(),
            custom_label: CUSTOM_QUESTION_LABEL.to_string(),
        }));
        self.state.stage = Stage::AwaitingQuestionChoice(topic);
    }

    fn show_custom_input(&mut self, topic: String, fx: &mut Vec<Effect>) {
        fx.push(Effect::ShowPrompt(Prompt::CustomInput {
            header: CUSTOM_INPUT_HEADER.to_string(),
            note: format!(
                "You can ask any question related to {}",
                self.catalog.display_name(&topic)
            ),
        }));
        fx.push(Effect::FocusInput);
        self.state.stage = Stage::AwaitingCustomInput(topic);
    }

    fn show_follow_up(&mut self, topic: String, fx: &mut Vec<Effect>) {
        let mut actions = Vec::with_capacity(5);
        if self.catalog.is_sub_category(&topic) {
            actions.push(FollowUpAction::BackToApel);
        }
        actions.extend([
            FollowUpAction::MoreQuestions,
            FollowUpAction::ChangeCategory,
            FollowUpAction::ContactInfo,
            FollowUpAction::CustomQuestion,
        ]);
        fx.push(Effect::ShowPrompt(Prompt::FollowUp {
            header: FOLLOW_UP_HEADER.to_string(),
            actions,
        }));
        self.state.stage = Stage::FollowUp(topic);
    }

    // ---- Helpers ----

    /// Append to the log, render it, and persist the new snapshot.
    fn append(&mut self, text: impl Into<String>, role: Role, fx: &mut Vec<Effect>) {
        let message = self.state.log.append(text, role);
        fx.push(Effect::AppendMessage(self.formatter.render(message)));
        self.persist();
    }

    fn persist(&self) {
        self.history.save(&PersistedSnapshot {
            messages: self.state.log.all().to_vec(),
            selected_category: self.state.selected_category.clone(),
            timestamp: Some(Utc::now().trunc_subsecs(3)),
        });
    }

    fn image(&self) -> String {
        self.catalog
            .image_key(self.state.selected_category.as_deref())
            .to_string()
    }

    fn ignore(&self, command: &str) {
        debug!(stage = ?self.state.stage, command, "Ignoring command not valid in current stage");
    }
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("reset_armed", &self.reset_armed)
            .finish()
    }
}
