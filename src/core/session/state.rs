//! Per-call session state.
//!
//! One [`CallSession`] exists per media-stream connection and is owned by
//! that connection's relay actor; nothing in it is shared across calls.
//!
//! # Invariants
//! - The in-flight item id and its start timestamp are set and unset together
//!   (they live in one [`Utterance`] value).
//! - `latest_media_timestamp` never decreases.
//! - `pending_acks` never holds more tokens than audio chunks relayed since
//!   the last interruption.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::core::agents::AgentConfig;

/// Acknowledgement token for one relayed audio chunk.
pub type AckToken = u64;

/// The assistant utterance currently playing on the telephony leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Assistant item id
    pub item_id: String,
    /// `latest_media_timestamp` when its first chunk was relayed
    pub started_at_ms: u64,
    /// Upstream finished generating audio for this item
    pub audio_done: bool,
}

/// What to do with an incoming audio delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaDisposition {
    /// Relay it to `stream_sid` and follow it with a mark for `ack`
    Relay { stream_sid: String, ack: AckToken },
    /// No stream has started yet; nobody is listening
    NoListener,
    /// The delta belongs to an utterance that was interrupted
    Stale,
}

/// Result of an interruption, describing the two control messages to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interruption {
    /// Item to truncate upstream
    pub item_id: String,
    /// Playback offset the caller actually heard
    pub audio_end_ms: u64,
    /// Stream to clear downstream, if one has started
    pub stream_sid: Option<String>,
    /// Start timestamp of the interrupted utterance
    pub started_at_ms: u64,
    /// Latest media timestamp at the time of interruption
    pub latest_media_timestamp: u64,
    /// Interruption counter after this one
    pub epoch: u64,
}

/// Mutable record of one phone call.
#[derive(Debug, Clone)]
pub struct CallSession {
    agent: Arc<AgentConfig>,
    stream_id: Option<String>,
    call_sid: Option<String>,
    latest_media_timestamp: u64,
    utterance: Option<Utterance>,
    pending_acks: VecDeque<AckToken>,
    next_ack: AckToken,
    greeted: bool,
    epoch: u64,
    interrupted_items: HashSet<String>,
}

impl CallSession {
    pub fn new(agent: Arc<AgentConfig>) -> Self {
        Self {
            agent,
            stream_id: None,
            call_sid: None,
            latest_media_timestamp: 0,
            utterance: None,
            pending_acks: VecDeque::new(),
            next_ack: 0,
            greeted: false,
            epoch: 0,
            interrupted_items: HashSet::new(),
        }
    }

    // ===== Accessors =====

    pub fn agent(&self) -> &AgentConfig {
        &self.agent
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    pub fn call_sid(&self) -> Option<&str> {
        self.call_sid.as_deref()
    }

    pub fn latest_media_timestamp(&self) -> u64 {
        self.latest_media_timestamp
    }

    pub fn last_assistant_item_id(&self) -> Option<&str> {
        self.utterance.as_ref().map(|u| u.item_id.as_str())
    }

    pub fn response_start_timestamp(&self) -> Option<u64> {
        self.utterance.as_ref().map(|u| u.started_at_ms)
    }

    pub fn utterance(&self) -> Option<&Utterance> {
        self.utterance.as_ref()
    }

    /// Outstanding acknowledgement tokens, oldest first.
    pub fn pending_acks(&self) -> impl Iterator<Item = AckToken> + '_ {
        self.pending_acks.iter().copied()
    }

    pub fn pending_ack_count(&self) -> usize {
        self.pending_acks.len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // ===== Telephony side =====

    /// Record a started stream and reset playback tracking.
    ///
    /// Returns `true` the first time a stream starts, when the greeting is due.
    pub fn start_stream(&mut self, stream_sid: String, call_sid: Option<String>) -> bool {
        self.stream_id = Some(stream_sid);
        self.call_sid = call_sid;
        self.latest_media_timestamp = 0;
        self.utterance = None;

        let greeting_due = !self.greeted;
        self.greeted = true;
        greeting_due
    }

    /// Advance the media clock. Older timestamps are ignored.
    pub fn record_media_timestamp(&mut self, timestamp_ms: u64) {
        self.latest_media_timestamp = self.latest_media_timestamp.max(timestamp_ms);
    }

    /// Pop the oldest pending acknowledgement.
    ///
    /// Ends the in-flight utterance once its audio is complete and the last
    /// chunk has been acknowledged.
    pub fn acknowledge_mark(&mut self) -> Option<AckToken> {
        let token = self.pending_acks.pop_front()?;
        self.finish_utterance_if_played();
        Some(token)
    }

    // ===== Speech-AI side =====

    /// Account for an audio delta of `item_id`.
    ///
    /// A delta for an item other than the one in flight starts a new
    /// utterance stamped with the current media timestamp. Deltas of any item
    /// interrupted earlier in the call are stale. A delta without an item id
    /// is relayed as part of whatever is in flight and never starts an
    /// utterance of its own.
    pub fn accept_audio_delta(&mut self, item_id: Option<&str>) -> DeltaDisposition {
        if item_id.is_some_and(|id| self.interrupted_items.contains(id)) {
            return DeltaDisposition::Stale;
        }

        let Some(stream_sid) = self.stream_id.clone() else {
            return DeltaDisposition::NoListener;
        };

        if let Some(item_id) = item_id {
            let continues = self
                .utterance
                .as_ref()
                .is_some_and(|u| u.item_id == item_id);
            if !continues {
                self.utterance = Some(Utterance {
                    item_id: item_id.to_string(),
                    started_at_ms: self.latest_media_timestamp,
                    audio_done: false,
                });
            }
        }

        let ack = self.next_ack;
        self.next_ack += 1;
        self.pending_acks.push_back(ack);

        DeltaDisposition::Relay { stream_sid, ack }
    }

    /// Whether `item_id` was interrupted earlier in this call.
    pub fn was_interrupted(&self, item_id: &str) -> bool {
        self.interrupted_items.contains(item_id)
    }

    /// Upstream finished generating audio for `item_id`.
    pub fn mark_audio_done(&mut self, item_id: &str) {
        if let Some(utterance) = self.utterance.as_mut()
            && utterance.item_id == item_id
        {
            utterance.audio_done = true;
            self.finish_utterance_if_played();
        }
    }

    /// Interrupt the in-flight utterance, if any.
    ///
    /// Clears all pending acknowledgements, unsets the utterance and bumps the
    /// epoch. Late deltas for the interrupted item are reported as
    /// [`DeltaDisposition::Stale`] for the rest of the call.
    pub fn interrupt(&mut self) -> Option<Interruption> {
        let utterance = self.utterance.take()?;

        let audio_end_ms = self
            .latest_media_timestamp
            .saturating_sub(utterance.started_at_ms);

        self.pending_acks.clear();
        self.epoch += 1;
        self.interrupted_items.insert(utterance.item_id.clone());

        Some(Interruption {
            item_id: utterance.item_id,
            audio_end_ms,
            stream_sid: self.stream_id.clone(),
            started_at_ms: utterance.started_at_ms,
            latest_media_timestamp: self.latest_media_timestamp,
            epoch: self.epoch,
        })
    }

    fn finish_utterance_if_played(&mut self) {
        if self.pending_acks.is_empty()
            && self.utterance.as_ref().is_some_and(|u| u.audio_done)
        {
            self.utterance = None;
        }
    }
}
