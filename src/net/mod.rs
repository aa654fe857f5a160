//! UDP voice transport

pub mod recv;
pub mod send;
pub mod socket;

pub use recv::{ReceiveHandle, ReceiveWorker};
pub use send::OutboundVoice;
pub use socket::{bind_voice_socket, resolve_server_addr, Datagram};
