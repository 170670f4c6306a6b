mod channel;
pub mod packet;

pub use channel::{PushChannel, UPLOAD_PROGRESS_EVENT};
pub use packet::{EnginePacket, Handshake, SocketPacket};
