//! Call session: per-call state, the duplex relay actor and barge-in
//! handling.

pub mod interrupt;
pub mod relay;
pub mod state;

pub use interrupt::{InterruptionCommands, InterruptionController};
pub use relay::{CHANNEL_BUFFER_SIZE, CallRelay, RelayInput, RelayState};
pub use state::{AckToken, CallSession, DeltaDisposition, Interruption, Utterance};
