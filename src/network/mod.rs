//! Network subsystem for UDP audio transport
//!
//! The wire format is the compressed packet itself: one packet per datagram,
//! no header. Loss and reordering are tolerated, not repaired.

pub mod receiver;
pub mod sender;
pub mod udp;

pub use receiver::NetworkReceiver;
pub use sender::NetworkSender;
pub use udp::{bind_receiver, bind_sender, create_socket, resolve_target, TransportHandle, UdpSocket};
