//! # Fastwire Transport
//!
//! Byte transports feeding the FAST codec: TCP streams and UDP multicast
//! groups, both exposed through the blocking [`Endpoint`]/[`Connection`]
//! abstraction so the codec layer never knows which one it is draining.

pub mod endpoint;
pub mod multicast;
pub mod tcp;

pub use endpoint::{Connection, Endpoint};
pub use multicast::{DEFAULT_BUFFER_SIZE, MulticastEndpoint, MulticastInputStream};
pub use tcp::{TcpAcceptor, TcpConnection, TcpEndpoint};
