//! Barge-in handling.
//!
//! When the caller starts talking over an assistant utterance, the service
//! is told how much of that utterance was actually heard (truncate) and the
//! telephony leg drops whatever audio it still has buffered (clear). Both
//! messages are built from one [`Interruption`] taken from the session, so
//! the session is already reset by the time they are sent.

use crate::core::realtime::ClientEvent;
use crate::core::session::state::{CallSession, Interruption};
use crate::core::telephony::TelephonyCommand;

/// Control messages for one interruption, in send order.
#[derive(Debug, Clone, PartialEq)]
pub struct InterruptionCommands {
    /// `conversation.item.truncate` for the speech-AI leg
    pub truncate: ClientEvent,
    /// `clear` for the telephony leg; absent when no stream has started
    pub clear: Option<TelephonyCommand>,
    pub interruption: Interruption,
}

/// Turns caller speech into truncate/clear pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterruptionController {
    log_timing_math: bool,
}

impl InterruptionController {
    pub fn new(log_timing_math: bool) -> Self {
        Self { log_timing_math }
    }

    /// Interrupt the in-flight utterance of `session`, if there is one.
    pub fn on_speech_started(&self, session: &mut CallSession) -> Option<InterruptionCommands> {
        let interruption = session.interrupt()?;

        if self.log_timing_math {
            tracing::info!(
                "Calculating elapsed time for truncation: {} - {} = {}ms",
                interruption.latest_media_timestamp,
                interruption.started_at_ms,
                interruption.audio_end_ms
            );
        } else {
            tracing::debug!(
                latest_ms = interruption.latest_media_timestamp,
                start_ms = interruption.started_at_ms,
                elapsed_ms = interruption.audio_end_ms,
                "Truncation offset"
            );
        }

        tracing::info!(
            item_id = %interruption.item_id,
            audio_end_ms = interruption.audio_end_ms,
            epoch = interruption.epoch,
            "Caller interrupted assistant"
        );

        Some(InterruptionCommands {
            truncate: ClientEvent::truncate(
                interruption.item_id.clone(),
                interruption.audio_end_ms,
            ),
            clear: interruption
                .stream_sid
                .as_deref()
                .map(TelephonyCommand::clear),
            interruption,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agents::AgentRegistry;

    #[test]
    fn test_commands_for_in_flight_utterance() {
        let mut session = CallSession::new(AgentRegistry::builtin().default_agent());
        session.start_stream("CA123".to_string(), None);
        session.record_media_timestamp(4200);
        session.accept_audio_delta(Some("item_7"));
        session.record_media_timestamp(5000);

        let commands = InterruptionController::new(true)
            .on_speech_started(&mut session)
            .unwrap();

        assert_eq!(commands.truncate, ClientEvent::truncate("item_7", 800));
        assert_eq!(commands.clear, Some(TelephonyCommand::clear("CA123")));
        assert_eq!(session.last_assistant_item_id(), None);
    }

    #[test]
    fn test_no_commands_when_idle() {
        let mut session = CallSession::new(AgentRegistry::builtin().default_agent());
        session.start_stream("CA123".to_string(), None);
        assert!(
            InterruptionController::default()
                .on_speech_started(&mut session)
                .is_none()
        );
    }
}
