//! Widget state: visibility, the send latch and the conversation id.
//!
//! One [`WidgetController`] backs one chat widget. It owns the view behind a
//! mutex that is never held across an `.await`, so UI events such as
//! [`WidgetController::toggle`] may run while a send is suspended.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use genie_types::GenieMessage;
use tracing::{debug, error, info, warn};

use crate::api::GenieApi;
use crate::error::WidgetError;
use crate::log::{ChatEntry, View};
use crate::poll::{poll_message, PollConfig, PollOutcome};
use crate::render::{RenderOptions, Renderer};

/// Fixed bot copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetCopy {
    pub welcome: String,
    pub failed: String,
    pub timed_out: String,
    pub poll_error: String,
    pub submit_error: String,
    pub no_response: String,
    pub render_error: String,
}

impl Default for WidgetCopy {
    fn default() -> Self {
        Self {
            welcome: "Welcome to the Genie assistant! Ask me anything about your data."
                .to_owned(),
            failed: "Sorry, I could not generate a response. Please try again.".to_owned(),
            timed_out: "The request timed out. Please try asking your question again.".to_owned(),
            poll_error: "Sorry, there was an error getting the response.".to_owned(),
            submit_error: "Sorry, I encountered an error while sending your message.".to_owned(),
            no_response: "Sorry, I didn't receive a response. Please try again.".to_owned(),
            render_error: "Sorry, I couldn't display the response.".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WidgetOptions {
    pub poll: PollConfig,
    pub render: RenderOptions,
    pub copy: WidgetCopy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    ToggleClicked,
    SendClicked,
    KeyPressed { key: Key, shift: bool },
}

/// How a [`WidgetController::send`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Another send was in flight or the input was blank.
    Ignored,
    /// A rendered answer was appended.
    Answered,
    /// Genie reported the message as failed, or gave nothing to show.
    Failed,
    /// The poll budget ran out.
    TimedOut,
    /// A call to the proxy failed, or the answer could not be rendered.
    Errored,
}

pub struct WidgetController<A, V> {
    api: A,
    view: Mutex<V>,
    renderer: Renderer,
    options: WidgetOptions,
    open: AtomicBool,
    processing: AtomicBool,
    conversation_id: Mutex<Option<String>>,
}

impl<A, V> std::fmt::Debug for WidgetController<A, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetController")
            .field("open", &self.open.load(Ordering::Relaxed))
            .field("processing", &self.processing.load(Ordering::Relaxed))
            .field("conversation_id", &*lock(&self.conversation_id))
            .finish_non_exhaustive()
    }
}

impl<A, V> WidgetController<A, V>
where
    A: GenieApi,
    V: View,
{
    /// Build a closed widget and append the welcome entry.
    pub fn new(api: A, mut view: V, options: WidgetOptions) -> Result<Self, WidgetError> {
        let renderer = Renderer::new(options.render)?;
        view.set_open(false);
        view.append_entry(ChatEntry::bot_text(options.copy.welcome.clone()));
        Ok(Self {
            api,
            view: Mutex::new(view),
            renderer,
            options,
            open: AtomicBool::new(false),
            processing: AtomicBool::new(false),
            conversation_id: Mutex::new(None),
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn conversation_id(&self) -> Option<String> {
        lock(&self.conversation_id).clone()
    }

    /// Run `f` against the view.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut lock(&self.view))
    }

    /// Flip visibility; focuses the input when opening. Returns the new state.
    pub fn toggle(&self) -> bool {
        let open = !self.open.fetch_xor(true, Ordering::SeqCst);
        self.with_view(|v| {
            v.set_open(open);
            if open {
                v.focus_input();
            }
        });
        debug!(open, "widget toggled");
        open
    }

    /// Dispatch one UI event. Returns the send outcome when the event sent.
    pub async fn handle(&self, event: InputEvent) -> Option<SendOutcome> {
        match event {
            InputEvent::ToggleClicked => {
                self.toggle();
                None
            }
            InputEvent::SendClicked
            | InputEvent::KeyPressed {
                key: Key::Enter,
                shift: false,
            } => Some(self.send().await),
            InputEvent::KeyPressed { .. } => None,
        }
    }

    /// Send the current input and append the answer.
    pub async fn send(&self) -> SendOutcome {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("send ignored: another message is in flight");
            return SendOutcome::Ignored;
        }

        let text = self.with_view(|v| v.input_value()).trim().to_owned();
        if text.is_empty() {
            self.processing.store(false, Ordering::Release);
            return SendOutcome::Ignored;
        }

        let mut guard = SendGuard {
            controller: self,
            settled: false,
        };
        self.with_view(|v| {
            v.clear_input();
            v.append_entry(ChatEntry::user(text.clone()));
            v.append_transient_entry(ChatEntry::loading());
            v.set_input_enabled(false);
        });

        let (entry, outcome) = self.exchange(&text).await;

        self.with_view(|v| {
            v.remove_transient_entry();
            v.append_entry(entry);
        });
        guard.settled = true;
        outcome
    }

    /// Submit, poll and render. Never touches the transient entry.
    async fn exchange(&self, text: &str) -> (ChatEntry, SendOutcome) {
        let copy = &self.options.copy;
        let conversation_id = self.conversation_id();
        info!(continuing = conversation_id.is_some(), "sending message");

        let response = match self
            .api
            .submit_message(text, conversation_id.as_deref())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "failed to send message");
                return (ChatEntry::bot_text(&copy.submit_error), SendOutcome::Errored);
            }
        };

        if let Some(id) = response.conversation_id() {
            self.remember_conversation(id);
        }
        let conversation_id = self.conversation_id();

        if let Some(message_id) = response.message_id() {
            let Some(conversation_id) = conversation_id else {
                warn!(message_id, "response has a message id but no conversation id");
                return (ChatEntry::bot_text(&copy.no_response), SendOutcome::Failed);
            };
            return match poll_message(&self.api, &conversation_id, message_id, &self.options.poll)
                .await
            {
                Ok(PollOutcome::Completed(message)) => {
                    self.render(Some(&conversation_id), &message).await
                }
                Ok(PollOutcome::Failed(_)) => {
                    warn!(message_id, "Genie reported the message as failed");
                    (ChatEntry::bot_text(&copy.failed), SendOutcome::Failed)
                }
                Ok(PollOutcome::TimedOut { attempts }) => {
                    warn!(message_id, attempts, "gave up waiting for a response");
                    (ChatEntry::bot_text(&copy.timed_out), SendOutcome::TimedOut)
                }
                Err(e) => {
                    error!(message_id, error = %e, "failed to poll message status");
                    (ChatEntry::bot_text(&copy.poll_error), SendOutcome::Errored)
                }
            };
        }

        if let Some(answer) = response.inline_answer() {
            return (ChatEntry::bot_text(answer), SendOutcome::Answered);
        }

        warn!("response carried neither a message id nor an answer");
        (ChatEntry::bot_text(&copy.no_response), SendOutcome::Failed)
    }

    async fn render(
        &self,
        conversation_id: Option<&str>,
        message: &GenieMessage,
    ) -> (ChatEntry, SendOutcome) {
        match self.renderer.render(&self.api, conversation_id, message).await {
            Ok(html) => (ChatEntry::bot_markup(html), SendOutcome::Answered),
            Err(e) => {
                error!(error = %e, "failed to render response");
                (
                    ChatEntry::bot_text(&self.options.copy.render_error),
                    SendOutcome::Errored,
                )
            }
        }
    }

    /// The first conversation id seen is kept for the session.
    fn remember_conversation(&self, id: &str) {
        let mut slot = lock(&self.conversation_id);
        if slot.is_none() {
            debug!(conversation_id = id, "conversation started");
            *slot = Some(id.to_owned());
        }
    }
}

/// Releases the send latch on every exit from [`WidgetController::send`],
/// including the future being dropped mid-flight.
struct SendGuard<'a, A: GenieApi, V: View> {
    controller: &'a WidgetController<A, V>,
    settled: bool,
}

impl<A: GenieApi, V: View> Drop for SendGuard<'_, A, V> {
    fn drop(&mut self) {
        let settled = self.settled;
        self.controller.with_view(|v| {
            if !settled {
                v.remove_transient_entry();
            }
            v.set_input_enabled(true);
            v.focus_input();
        });
        self.controller.processing.store(false, Ordering::Release);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
