//! Speech adapter contracts
//!
//! The platform's speech recognition and synthesis engines are process-wide
//! singletons. They are modeled here as injectable collaborators with an
//! explicit lifecycle rather than ambient globals, so the controller can be
//! exercised against fakes and a frontend can plug in the real engines.
//!
//! Adapters own no conversation data; they report back through
//! [`SpeechEvent`] values delivered to the controller.

/// Events emitted by the speech adapters on their own schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// A finalized transcript from continuous recognition. Interim results
    /// are never surfaced.
    TranscriptFinal(String),
    /// Recognition started or stopped, including platform-initiated stops
    /// (silence timeout, permission revoked).
    ListeningChanged(bool),
    /// Synthesis started or finished an utterance.
    SpeakingChanged(bool),
    /// Recognition failed; recognition is no longer listening.
    InputError(String),
}

/// Continuous speech-to-text engine.
///
/// `start` must be idempotent while already listening. Recognition keeps
/// listening across utterances until explicitly stopped or ended by the
/// platform; either way a `ListeningChanged(false)` event must follow so
/// the controller's flag stays correct without polling.
pub trait SpeechInput: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Text-to-speech engine.
///
/// `speak` preempts any currently-playing utterance before starting the new
/// one; there is no queue and preemption is not an error. `cancel` is safe
/// to call when idle.
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, text: &str);
    fn cancel(&self);
}
