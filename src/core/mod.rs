pub mod agents;
pub mod audio;
pub mod realtime;
pub mod session;
pub mod telephony;

// Re-export commonly used types for convenience
pub use agents::{AgentConfig, AgentDefinition, AgentRegistry};

pub use audio::{TranscodeError, TranscodeResult, inbound_transform, outbound_transform};

pub use realtime::{
    OpenAIRealtimeConnector, RealtimeError, RealtimeResult, UpstreamConnector, UpstreamHandle,
};

pub use session::{CallRelay, CallSession, InterruptionController, RelayInput, RelayState};

pub use telephony::{TelephonyCommand, TelephonyError, TelephonyEvent, TelephonyResult, TwilioClient};
