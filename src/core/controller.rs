//! The conversation controller
//!
//! Single authority over the conversation session and interaction state. It:
//! 1. Accepts user input, typed or spoken
//! 2. Forwards it to the remote chat backend
//! 3. Appends the reply to the log, falling back to a safety message
//! 4. Resolves which action affordances render with the reply
//! 5. Speaks the reply aloud when text-to-speech is enabled
//!
//! Views hold no conversation state of their own; they subscribe to
//! [`ControllerEvent`]s and invoke operations here.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::actions;
use crate::config::prompts_builtin;
use crate::conversation::{ConversationSession, Message};
use crate::remote::{ChatBackend, ChatError, ChatReply};
use crate::speech::{SpeechEvent, SpeechInput, SpeechOutput};

/// Capacity for the view event channel.
const EVENT_CHANNEL_SIZE: usize = 64;

/// Mutable interaction state, owned exclusively by the controller.
/// Created empty at conversation start, never persisted past the session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InteractionState {
    /// The input buffer; spoken transcripts are appended here too.
    pub input_text: String,
    /// Whether speech recognition is active. Updated only from adapter
    /// events, never assumed on `toggle_listening`.
    pub listening: bool,
    /// A reply is pending; further submissions are ignored until it lands.
    pub is_typing: bool,
    pub tts_enabled: bool,
    /// The bot's own speech is playing; transcripts are muted meanwhile.
    pub is_bot_speaking: bool,
}

/// One-time notices surfaced at the point of use when a platform
/// capability is missing. The affordance becomes a no-op afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    SpeechInputUnavailable,
    SpeechOutputUnavailable,
}

/// Events for subscribed views.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    MessageAppended(Message),
    StateChanged(InteractionState),
    Notice(Notice),
}

/// Result of a submission attempt.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Blank input or a reply already pending; nothing happened.
    Ignored,
    /// The exchange completed; carries the appended bot message.
    Replied(Message),
}

/// A validated submission whose user message is already appended and whose
/// remote call is still in flight. Produced by [`ConversationController::begin_submission`].
#[derive(Debug)]
pub struct PendingSubmission {
    pub text: String,
}

pub struct ConversationController {
    session: ConversationSession,
    state: InteractionState,
    fallback: String,
    backend: Arc<dyn ChatBackend>,
    speech_input: Option<Arc<dyn SpeechInput>>,
    speech_output: Option<Arc<dyn SpeechOutput>>,
    events: broadcast::Sender<ControllerEvent>,
    input_notice_sent: bool,
    output_notice_sent: bool,
}

impl ConversationController {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            session: ConversationSession::new(),
            state: InteractionState::default(),
            fallback: prompts_builtin::SAFETY_FALLBACK.to_string(),
            backend,
            speech_input: None,
            speech_output: None,
            events,
            input_notice_sent: false,
            output_notice_sent: false,
        }
    }

    /// Attach a speech recognition adapter. Without one the mic affordance
    /// surfaces a one-time notice and becomes a no-op.
    pub fn with_speech_input(mut self, input: Arc<dyn SpeechInput>) -> Self {
        self.speech_input = Some(input);
        self
    }

    /// Attach a speech synthesis adapter. Without one the TTS toggle
    /// surfaces a one-time notice and becomes a no-op.
    pub fn with_speech_output(mut self, output: Arc<dyn SpeechOutput>) -> Self {
        self.speech_output = Some(output);
        self
    }

    /// Override the safety fallback reply.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session.session_id
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        self.session.log.all()
    }

    /// Subscribe to controller events. Views render from these instead of
    /// reaching into the session.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Submit user text and await the exchange.
    ///
    /// A blank submission, or one arriving while a reply is pending, is
    /// silently ignored; the send affordance is expected to be disabled in
    /// that window and a stray event is not an error.
    pub async fn submit_user_text(&mut self, text: &str) -> SubmitOutcome {
        let Some(pending) = self.begin_submission(text) else {
            return SubmitOutcome::Ignored;
        };

        let result = self
            .backend
            .send(&pending.text, self.session.session_id)
            .await;

        SubmitOutcome::Replied(self.complete_submission(result))
    }

    /// Validate and stage a submission: append the user message, raise the
    /// typing gate, clear the input buffer. Returns `None` when the
    /// submission is to be ignored.
    ///
    /// The typing gate serializes remote calls per session: no second call
    /// can start until [`Self::complete_submission`] lowers it.
    pub fn begin_submission(&mut self, text: &str) -> Option<PendingSubmission> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if self.state.is_typing {
            tracing::debug!("submission ignored, reply pending");
            return None;
        }

        let message = Message::user(self.session.log.next_id(), trimmed);
        self.session.log.append(message.clone());
        self.emit(ControllerEvent::MessageAppended(message));

        self.state.is_typing = true;
        self.state.input_text.clear();
        self.emit_state();

        Some(PendingSubmission {
            text: trimmed.to_string(),
        })
    }

    /// Land the remote result as the next bot message and lower the typing
    /// gate. Failures degrade to the safety fallback; the conversation
    /// surface never shows a raw error.
    pub fn complete_submission(&mut self, result: Result<ChatReply, ChatError>) -> Message {
        let (text, tags, speak) = match result {
            Ok(reply) => {
                let text = if reply.response.trim().is_empty() {
                    self.fallback.clone()
                } else {
                    reply.response
                };
                (text, reply.action.unwrap_or_default(), true)
            }
            Err(e) => {
                tracing::warn!("chat backend failed: {}", e);
                (self.fallback.clone(), Vec::new(), false)
            }
        };

        let ordinal = self.session.log.bot_count() + 1;
        let affordances = actions::resolve(ordinal, &tags);
        let message = Message::bot(self.session.log.next_id(), text, tags, affordances);
        self.session.log.append(message.clone());

        self.state.is_typing = false;
        self.emit(ControllerEvent::MessageAppended(message.clone()));
        self.emit_state();

        if speak && self.state.tts_enabled {
            if let Some(output) = &self.speech_output {
                output.speak(&message.text);
            }
        }

        message
    }

    /// Replace the input buffer. Never triggers a submission; submitting is
    /// an explicit event of its own.
    pub fn set_input_text(&mut self, text: impl Into<String>) {
        self.state.input_text = text.into();
        self.emit_state();
    }

    /// Ask the recognition adapter to start or stop. The `listening` flag
    /// is not touched here; it follows the adapter's events, since starting
    /// is not synchronous.
    pub fn toggle_listening(&mut self) {
        let Some(input) = self.speech_input.clone() else {
            self.notice_once(Notice::SpeechInputUnavailable);
            return;
        };

        if self.state.listening {
            input.stop();
        } else {
            input.start();
        }
    }

    /// Flip text-to-speech. Turning it off cancels any in-flight utterance
    /// immediately so the bot stops mid-sentence.
    pub fn toggle_tts(&mut self) {
        let Some(output) = self.speech_output.clone() else {
            self.notice_once(Notice::SpeechOutputUnavailable);
            return;
        };

        self.state.tts_enabled = !self.state.tts_enabled;
        if !self.state.tts_enabled {
            output.cancel();
        }
        self.emit_state();
    }

    /// Ingest an event from either speech adapter.
    pub fn handle_speech_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::TranscriptFinal(transcript) => {
                if self.state.is_bot_speaking {
                    // The synthesis output would be misheard as user
                    // speech; drop it.
                    tracing::debug!("transcript dropped while bot speaking");
                    return;
                }
                if self.state.input_text.is_empty() {
                    self.state.input_text = transcript;
                } else {
                    self.state.input_text.push(' ');
                    self.state.input_text.push_str(&transcript);
                }
                self.emit_state();
            }
            SpeechEvent::ListeningChanged(listening) => {
                self.state.listening = listening;
                self.emit_state();
            }
            SpeechEvent::SpeakingChanged(speaking) => {
                self.state.is_bot_speaking = speaking;
                self.emit_state();
            }
            SpeechEvent::InputError(reason) => {
                tracing::warn!("speech recognition error: {}", reason);
                self.state.listening = false;
                self.emit_state();
            }
        }
    }

    fn notice_once(&mut self, notice: Notice) {
        let sent = match notice {
            Notice::SpeechInputUnavailable => &mut self.input_notice_sent,
            Notice::SpeechOutputUnavailable => &mut self.output_notice_sent,
        };
        if !*sent {
            *sent = true;
            self.emit(ControllerEvent::Notice(notice));
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // Nobody subscribed is fine.
        let _ = self.events.send(event);
    }

    fn emit_state(&self) {
        self.emit(ControllerEvent::StateChanged(self.state.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Affordance;
    use crate::conversation::{ActionTag, Sender};
    use crate::speech::fakes::{OutputCall, RecordingSpeechInput, RecordingSpeechOutput};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Plays back a fixed script of backend results and records each sent
    /// text.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<ChatReply, ChatError>>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<ChatReply, ChatError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn reply(text: &str, tags: &[&str]) -> Result<ChatReply, ChatError> {
            Ok(ChatReply {
                response: text.to_string(),
                action: Some(tags.iter().map(|t| ActionTag::from(*t)).collect()),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send(&self, text: &str, _session_id: Uuid) -> Result<ChatReply, ChatError> {
            self.sent.lock().unwrap().push(text.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::InvalidResponse("script exhausted".into())))
        }
    }

    #[tokio::test]
    async fn test_reply_appends_strictly_after_user_message() {
        let backend = ScriptedBackend::new(vec![
            ScriptedBackend::reply("first reply", &[]),
            ScriptedBackend::reply("second reply", &[]),
        ]);
        let mut controller = ConversationController::new(backend.clone());

        controller.submit_user_text("hello").await;
        controller.submit_user_text("still here").await;

        let senders: Vec<_> = controller.messages().iter().map(|m| m.sender).collect();
        assert_eq!(
            senders,
            vec![Sender::User, Sender::Bot, Sender::User, Sender::Bot]
        );
        assert_eq!(controller.messages()[1].text, "first reply");
        assert_eq!(controller.messages()[3].text, "second reply");
        assert_eq!(backend.sent(), vec!["hello", "still here"]);
    }

    #[tokio::test]
    async fn test_blank_submit_is_a_noop() {
        let backend = ScriptedBackend::new(vec![]);
        let mut controller = ConversationController::new(backend.clone());

        assert!(matches!(
            controller.submit_user_text("   ").await,
            SubmitOutcome::Ignored
        ));
        assert!(controller.messages().is_empty());
        assert!(backend.sent().is_empty());
    }

    #[tokio::test]
    async fn test_submit_ignored_while_reply_pending() {
        let backend = ScriptedBackend::new(vec![ScriptedBackend::reply("ok", &[])]);
        let mut controller = ConversationController::new(backend.clone());

        let pending = controller.begin_submission("first").unwrap();
        assert!(controller.state().is_typing);

        // The gate holds until the pending submission completes.
        assert!(controller.begin_submission("second").is_none());
        assert_eq!(controller.messages().len(), 1);

        let result = backend.send(&pending.text, controller.session_id()).await;
        controller.complete_submission(result);
        assert!(!controller.state().is_typing);

        assert!(controller.begin_submission("third").is_some());
    }

    #[tokio::test]
    async fn test_submit_clears_input_buffer() {
        let backend = ScriptedBackend::new(vec![ScriptedBackend::reply("ok", &[])]);
        let mut controller = ConversationController::new(backend);

        controller.set_input_text("I feel anxious");
        controller.submit_user_text("I feel anxious").await;
        assert!(controller.state().input_text.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_fallback() {
        let backend =
            ScriptedBackend::new(vec![Err(ChatError::InvalidResponse("503".into()))]);
        let mut controller = ConversationController::new(backend);

        controller.submit_user_text("are you there?").await;

        let bot = &controller.messages()[1];
        assert_eq!(bot.text, prompts_builtin::SAFETY_FALLBACK);
        assert!(bot.actions.is_empty());
        assert!(!controller.state().is_typing);
    }

    #[tokio::test]
    async fn test_empty_reply_degrades_to_fallback() {
        let backend = ScriptedBackend::new(vec![ScriptedBackend::reply("  ", &["breathe"])]);
        let mut controller = ConversationController::new(backend);

        controller.submit_user_text("hi").await;

        let bot = &controller.messages()[1];
        assert_eq!(bot.text, prompts_builtin::SAFETY_FALLBACK);
        // The tags still ride along even when the text fell back.
        assert_eq!(bot.actions, vec![ActionTag::Breathe]);
    }

    #[tokio::test]
    async fn test_first_reply_shows_tagged_affordance() {
        let backend =
            ScriptedBackend::new(vec![ScriptedBackend::reply("I'm here for you.", &["breathe"])]);
        let mut controller = ConversationController::new(backend);

        let SubmitOutcome::Replied(bot) = controller.submit_user_text("I feel anxious").await
        else {
            panic!("expected a reply");
        };

        assert_eq!(bot.affordances, vec![Affordance::Breathing]);
    }

    #[tokio::test]
    async fn test_cadence_hides_mid_conversation_tags() {
        let backend = ScriptedBackend::new(vec![
            ScriptedBackend::reply("one", &[]),
            ScriptedBackend::reply("two", &["breathe"]),
            ScriptedBackend::reply("three", &["meditate"]),
        ]);
        let mut controller = ConversationController::new(backend);

        controller.submit_user_text("a").await;
        controller.submit_user_text("b").await;
        controller.submit_user_text("c").await;

        let bots: Vec<_> = controller
            .messages()
            .iter()
            .filter(|m| m.sender == Sender::Bot)
            .collect();

        // n=1 on cadence, default composite
        assert_eq!(bots[0].affordances.len(), 4);
        // n=2 off cadence, tags retained but nothing rendered
        assert_eq!(bots[1].actions, vec![ActionTag::Breathe]);
        assert!(bots[1].affordances.is_empty());
        // n=3 on cadence again
        assert_eq!(bots[2].affordances, vec![Affordance::Meditation]);
    }

    #[tokio::test]
    async fn test_crisis_reply_always_renders() {
        let backend = ScriptedBackend::new(vec![
            ScriptedBackend::reply("one", &[]),
            ScriptedBackend::reply("please reach out", &["crisis"]),
        ]);
        let mut controller = ConversationController::new(backend);

        controller.submit_user_text("a").await;
        controller.submit_user_text("b").await;

        // Second bot message is off cadence, crisis surfaces anyway.
        assert_eq!(
            controller.messages()[3].affordances,
            vec![Affordance::CrisisHotline]
        );
    }

    #[tokio::test]
    async fn test_tts_speaks_reply_only_when_enabled() {
        let output = Arc::new(RecordingSpeechOutput::new());
        let backend = ScriptedBackend::new(vec![
            ScriptedBackend::reply("quiet reply", &[]),
            ScriptedBackend::reply("spoken reply", &[]),
        ]);
        let mut controller =
            ConversationController::new(backend).with_speech_output(output.clone());

        controller.submit_user_text("a").await;
        assert!(output.calls().is_empty());

        controller.toggle_tts();
        controller.submit_user_text("b").await;
        assert_eq!(
            output.calls(),
            vec![OutputCall::Speak("spoken reply".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fallback_reply_is_not_spoken() {
        let output = Arc::new(RecordingSpeechOutput::new());
        let backend = ScriptedBackend::new(vec![Err(ChatError::InvalidResponse("down".into()))]);
        let mut controller =
            ConversationController::new(backend).with_speech_output(output.clone());

        controller.toggle_tts();
        controller.submit_user_text("a").await;

        assert!(output.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tts_off_cancels_exactly_once_and_touches_nothing_else() {
        let output = Arc::new(RecordingSpeechOutput::new());
        let backend = ScriptedBackend::new(vec![ScriptedBackend::reply("hi", &[])]);
        let mut controller =
            ConversationController::new(backend).with_speech_output(output.clone());

        controller.submit_user_text("hello").await;
        controller.set_input_text("draft");
        let messages_before = controller.messages().len();

        controller.toggle_tts(); // on, no cancel
        controller.toggle_tts(); // off, cancel

        assert_eq!(output.calls(), vec![OutputCall::Cancel]);
        assert_eq!(controller.state().input_text, "draft");
        assert_eq!(controller.messages().len(), messages_before);
    }

    #[tokio::test]
    async fn test_transcript_appends_with_separating_space() {
        let backend = ScriptedBackend::new(vec![]);
        let mut controller = ConversationController::new(backend);

        controller.handle_speech_event(SpeechEvent::TranscriptFinal("I feel".into()));
        controller.handle_speech_event(SpeechEvent::TranscriptFinal("anxious".into()));

        assert_eq!(controller.state().input_text, "I feel anxious");
    }

    #[tokio::test]
    async fn test_transcript_muted_while_bot_speaking() {
        let backend = ScriptedBackend::new(vec![]);
        let mut controller = ConversationController::new(backend);

        controller.handle_speech_event(SpeechEvent::SpeakingChanged(true));
        controller.handle_speech_event(SpeechEvent::TranscriptFinal("hello".into()));
        assert!(controller.state().input_text.is_empty());

        controller.handle_speech_event(SpeechEvent::SpeakingChanged(false));
        controller.handle_speech_event(SpeechEvent::TranscriptFinal("hello".into()));
        assert_eq!(controller.state().input_text, "hello");
    }

    #[tokio::test]
    async fn test_toggle_listening_delegates_without_flipping_flag() {
        let input = Arc::new(RecordingSpeechInput::new());
        let backend = ScriptedBackend::new(vec![]);
        let mut controller = ConversationController::new(backend).with_speech_input(input.clone());

        controller.toggle_listening();
        assert_eq!(*input.starts.lock().unwrap(), 1);
        // The flag follows adapter events, not the toggle itself.
        assert!(!controller.state().listening);

        controller.handle_speech_event(SpeechEvent::ListeningChanged(true));
        assert!(controller.state().listening);

        controller.toggle_listening();
        assert_eq!(*input.stops.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recognition_error_clears_listening() {
        let backend = ScriptedBackend::new(vec![]);
        let mut controller = ConversationController::new(backend);

        controller.handle_speech_event(SpeechEvent::ListeningChanged(true));
        controller.handle_speech_event(SpeechEvent::InputError("not-allowed".into()));

        assert!(!controller.state().listening);
    }

    #[tokio::test]
    async fn test_missing_adapters_notice_once_then_noop() {
        let backend = ScriptedBackend::new(vec![]);
        let mut controller = ConversationController::new(backend);
        let mut events = controller.subscribe();

        controller.toggle_tts();
        controller.toggle_tts();
        controller.toggle_listening();
        controller.toggle_listening();

        assert!(!controller.state().tts_enabled);

        let mut notices = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ControllerEvent::Notice(n) = event {
                notices.push(n);
            }
        }
        assert_eq!(
            notices,
            vec![
                Notice::SpeechOutputUnavailable,
                Notice::SpeechInputUnavailable
            ]
        );
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let backend = ScriptedBackend::new(vec![ScriptedBackend::reply("hey", &[])]);
        let mut controller = ConversationController::new(backend);
        let mut events = controller.subscribe();

        controller.submit_user_text("hello").await;

        let mut appended = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ControllerEvent::MessageAppended(m) = event {
                appended.push(m.text);
            }
        }
        assert_eq!(appended, vec!["hello".to_string(), "hey".to_string()]);
    }
}
