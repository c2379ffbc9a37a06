pub mod counters;
pub mod error;
pub mod listener;
pub mod peer;
pub mod utils;
pub mod wire;

pub use counters::{CounterSnapshot, Counters};
pub use error::{Result, TransportError};
pub use listener::{PacketHandler, UdpTransport};
pub use peer::{Arrival, Expired, PeerState};
pub use wire::{Datagram, Header};
