// src/live/mod.rs

//! Live progress of one delivery: an initial REST snapshot followed by a
//! push feed from the realtime service, reconnecting until closed.

pub mod channel;
pub mod protocol;
pub mod transport;
pub mod view;

pub use channel::{ChannelHandle, ChannelState, LiveChannel, RetryPolicy};
pub use protocol::{ClientMessage, ServerMessage, realtime_url};
pub use transport::{Connection, Transport, TungsteniteTransport};
pub use view::{ParticipantRow, ProgressSummary, ProgressView};
