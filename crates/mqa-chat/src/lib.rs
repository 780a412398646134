//! Conversation core for the MQA support widget.
//!
//! Guides a visitor through category and sub-category selection, answers
//! canned questions from a static catalog, delegates free-form questions to
//! a remote prediction endpoint, and keeps a persisted, safely rendered
//! message log.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod history;
pub mod log;
pub mod remote;
pub mod render;
pub mod transcript;
pub mod widget;

pub use catalog::{AnswerCatalog, Category, SubCategory, Topic};
pub use engine::{
    Choice, Command, ConversationEngine, ConversationState, Effect, FollowUpAction, Prompt, Stage,
    Ticket,
};
pub use error::{CatalogError, RemoteError, StoreError};
pub use history::{FileStore, HistoryStore, MemoryStore, SlotStore};
pub use log::MessageLog;
pub use remote::{AnswerResult, AnswerSource, RemoteAnswerClient};
pub use render::{RenderedMessage, SafeFormatter};
pub use widget::{EffectSink, Widget, WidgetHandle};
