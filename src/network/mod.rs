// Re-export network modules
pub mod api_client;
pub mod channel_manager;
pub mod config;
pub mod messages;
pub mod realtime_client;

// Re-export commonly used items
pub use api_client::ApiClient;
pub use channel_manager::{ChannelHandler, ChannelManager};
pub use messages::{builders as message_builders, Envelope};
pub use realtime_client::{ConnectionState, IRealtimeClient, SendError};
#[cfg(target_arch = "wasm32")]
pub use realtime_client::RealtimeClient;
