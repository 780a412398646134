//! Async runtime around the conversation engine.
//!
//! [`Widget::run`] is the single event loop: it receives view commands and
//! delayed-work completions on channels, hands each one to the engine in
//! turn, and forwards the resulting effects to an [`EffectSink`]. Canned
//! answer delays and remote requests run as spawned tasks whose completions
//! come back through the same loop, so log appends stay serialized.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{Command, ConversationEngine, Effect};
use crate::remote::AnswerSource;

const COMMAND_BUFFER: usize = 64;

/// Receives render instructions from the runtime.
pub trait EffectSink: Send {
    fn apply(&mut self, effect: Effect);
}

impl EffectSink for Vec<Effect> {
    fn apply(&mut self, effect: Effect) {
        self.push(effect);
    }
}

/// Cloneable sender used by the view to feed commands into a running widget.
#[derive(Debug, Clone)]
pub struct WidgetHandle {
    tx: mpsc::Sender<Command>,
}

impl WidgetHandle {
    /// Queue a command. Returns `false` once the widget has stopped.
    pub async fn send(&self, command: Command) -> bool {
        self.tx.send(command).await.is_ok()
    }
}

pub struct Widget {
    engine: ConversationEngine,
    source: Arc<dyn AnswerSource>,
    commands: mpsc::Receiver<Command>,
    tx: mpsc::Sender<Command>,
}

impl Widget {
    pub fn new(engine: ConversationEngine, source: Arc<dyn AnswerSource>) -> Self {
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        Self {
            engine,
            source,
            commands,
            tx,
        }
    }

    /// A sender for this widget. Take every handle you need before calling
    /// [`Widget::run`].
    pub fn handle(&self) -> WidgetHandle {
        WidgetHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    /// Process commands until every handle is dropped and no delayed work is
    /// outstanding. Returns the engine and the sink.
    pub async fn run<S: EffectSink>(self, mut sink: S) -> (ConversationEngine, S) {
        let Widget {
            mut engine,
            source,
            mut commands,
            tx,
        } = self;
        drop(tx);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Command>();
        let mut in_flight = 0usize;
        let mut accepting = true;
        info!("Widget started");

        loop {
            if !accepting && in_flight == 0 {
                break;
            }

            let command = tokio::select! {
                received = commands.recv(), if accepting => match received {
                    Some(command) => command,
                    None => {
                        debug!(in_flight, "All widget handles dropped");
                        accepting = false;
                        continue;
                    }
                },
                Some(completion) = done_rx.recv(), if in_flight > 0 => {
                    in_flight -= 1;
                    completion
                }
                else => break,
            };

            for effect in engine.handle(command) {
                match &effect {
                    Effect::ScheduleAnswer { ticket, delay } => {
                        let (ticket, delay, done) = (*ticket, *delay, done_tx.clone());
                        in_flight += 1;
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let _ = done.send(Command::AnswerReady { ticket });
                        });
                    }
                    Effect::RequestRemote { ticket, text } => {
                        let (ticket, text, done) = (*ticket, text.clone(), done_tx.clone());
                        let source = Arc::clone(&source);
                        in_flight += 1;
                        tokio::spawn(async move {
                            let result = source.ask(&text).await;
                            let _ = done.send(Command::RemoteAnswered { ticket, result });
                        });
                    }
                    _ => {}
                }
                sink.apply(effect);
            }
        }

        info!("Widget stopped");
        (engine, sink)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use mqa_core::config::WidgetConfig;
    use mqa_core::types::Role;

    use super::*;
    use crate::catalog::AnswerCatalog;
    use crate::engine::{FollowUpAction, Prompt, Stage};
    use crate::history::HistoryStore;
    use crate::remote::AnswerResult;

    /// Answers every question after a fixed delay.
    struct SlowSource {
        delay: Duration,
        result: AnswerResult,
    }

    #[async_trait]
    impl AnswerSource for SlowSource {
        async fn ask(&self, _text: &str) -> AnswerResult {
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn widget(delay_ms: u64, result: AnswerResult) -> Widget {
        let engine = ConversationEngine::new(
            Arc::new(AnswerCatalog::builtin()),
            HistoryStore::in_memory("mqa_chat_history"),
            &WidgetConfig::default(),
        )
        .unwrap();
        Widget::new(
            engine,
            Arc::new(SlowSource {
                delay: Duration::from_millis(delay_ms),
                result,
            }),
        )
    }

    fn operator_texts(engine: &ConversationEngine) -> Vec<String> {
        engine
            .state()
            .messages()
            .iter()
            .filter(|m| m.role == Role::Operator)
            .map(|m| m.text.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_canned_answer_arrives_after_delay() {
        let widget = widget(10, AnswerResult::Empty);
        let handle = widget.handle();
        handle.send(Command::Toggle).await;
        handle.send(Command::PickCategory("faq".to_string())).await;
        handle
            .send(Command::PickQuestion("How to contact MQA directly?".to_string()))
            .await;
        drop(handle);

        let started = tokio::time::Instant::now();
        let (engine, effects) = widget.run(Vec::new()).await;
        assert!(started.elapsed() >= Duration::from_millis(1000));

        let typing: Vec<&Effect> = effects
            .iter()
            .filter(|e| matches!(e, Effect::SetTyping(_)))
            .collect();
        assert_eq!(typing, vec![&Effect::SetTyping(true), &Effect::SetTyping(false)]);
        assert!(operator_texts(&engine)
            .last()
            .unwrap()
            .starts_with("Call 03-7968 7002"));
        assert_eq!(engine.state().stage(), &Stage::FollowUp("faq".to_string()));
        assert!(matches!(
            effects.last(),
            Some(Effect::ShowPrompt(Prompt::FollowUp { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_answer_is_delivered() {
        let widget = widget(50, AnswerResult::Answered("Yes, it is listed.".to_string()));
        let handle = widget.handle();
        handle.send(Command::Toggle).await;
        handle.send(Command::PickCategory("recognition".to_string())).await;
        handle.send(Command::PickCustomQuestion).await;
        handle.send(Command::Submit("Is my degree recognised?".to_string())).await;
        drop(handle);

        let (engine, _) = widget.run(Vec::new()).await;
        assert_eq!(operator_texts(&engine).last().unwrap(), "Yes, it is listed.");
        assert_eq!(engine.pending_ticket(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_question_wins_over_pending_canned_answer() {
        let widget = widget(50, AnswerResult::Answered("Remote answer".to_string()));
        let handle = widget.handle();
        handle.send(Command::Toggle).await;
        handle.send(Command::PickCategory("faq".to_string())).await;
        handle
            .send(Command::PickQuestion("How to contact MQA directly?".to_string()))
            .await;
        handle.send(Command::Submit("Actually, what are the fees?".to_string())).await;
        drop(handle);

        let (engine, _) = widget.run(Vec::new()).await;
        let operator = operator_texts(&engine);
        assert_eq!(operator.last().unwrap(), "Remote answer");
        assert!(!operator.iter().any(|t| t.starts_with("Call 03-7968 7002")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_commands_after_answer() {
        let widget = widget(10, AnswerResult::Empty);
        let handle = widget.handle();
        let runner = tokio::spawn(widget.run(Vec::new()));

        handle.send(Command::Toggle).await;
        handle.send(Command::PickCategory("faq".to_string())).await;
        handle
            .send(Command::PickQuestion("How to contact MQA directly?".to_string()))
            .await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.send(Command::FollowUp(FollowUpAction::ChangeCategory)).await;
        drop(handle);

        let (engine, _) = runner.await.unwrap();
        assert_eq!(engine.state().selected_category(), None);
        assert_eq!(engine.state().stage(), &Stage::AwaitingCategory);
    }

    #[tokio::test]
    async fn test_stops_when_idle_and_handles_dropped() {
        let widget = widget(10, AnswerResult::Empty);
        drop(widget.handle());
        let (engine, effects) = widget.run(Vec::new()).await;
        assert!(effects.is_empty());
        assert!(!engine.state().is_open());
    }
}
