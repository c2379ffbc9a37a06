use crate::counters::{CounterSnapshot, Counters};
use crate::error::{Result, TransportError};
use crate::peer::{Arrival, PeerState};
use crate::wire::{Datagram, Header, ACK_WINDOW};
use bytes::Bytes;
use dashmap::DashMap;
use log::{debug, trace, warn};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

const RECV_BUFFER_LEN: usize = 2048;

/// Called on the receive thread for every packet classified as fresh (not a
/// duplicate, not outside the trailing ack window).
pub type PacketHandler = Box<dyn Fn(SocketAddr, Bytes) + Send + Sync + 'static>;

/// A selective-ack, UDP-backed reliability layer. Owns one OS thread for
/// blocking receive; retransmission is driven externally by calling
/// [`UdpTransport::update`] from the simulation's tick loop rather than a
/// timer of its own, so retry cadence always tracks the tick rate.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peers: Arc<DashMap<SocketAddr, Mutex<PeerState>>>,
    counters: Arc<Counters>,
    running: Arc<AtomicBool>,
    recv_thread: Mutex<Option<JoinHandle<()>>>,
}

impl UdpTransport {
    pub fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        debug!("pong-transport bound to {addr}");
        Ok(Self {
            socket: Arc::new(socket),
            peers: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
            running: Arc::new(AtomicBool::new(false)),
            recv_thread: Mutex::new(None),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Spawns the blocking receive loop. `on_packet` runs on that thread, so
    /// it must not block — hand work off rather than processing in place.
    /// Takes `&self` (the thread handle lives behind a mutex) so callers can
    /// share one transport through an `Arc` between the server and the tick
    /// loop and still start it after construction.
    pub fn start(&self, on_packet: PacketHandler) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let socket = Arc::clone(&self.socket);
        let peers = Arc::clone(&self.peers);
        let counters = Arc::clone(&self.counters);
        let running = Arc::clone(&self.running);
        let on_packet = Arc::new(on_packet);

        let handle = thread::spawn(move || recv_loop(socket, peers, counters, running, on_packet));
        *self.recv_thread.lock().expect("recv thread mutex poisoned") = Some(handle);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // Receive thread is blocked in recv_from; a zero-length datagram to
        // ourselves is the simplest way to unblock it without extra plumbing.
        if let Ok(addr) = self.socket.local_addr() {
            let _ = self.socket.send_to(&[], addr);
        }
        if let Some(handle) = self.recv_thread.lock().expect("recv thread mutex poisoned").take() {
            let _ = handle.join();
        }
    }

    /// Sends `payload` to `addr`, tracking it for retransmission when
    /// `reliable` is set. Returns the sequence number assigned to this send.
    ///
    /// A reliable send is rejected with [`TransportError::SendWindowFull`]
    /// once the peer already has `ACK_WINDOW` sends awaiting acknowledgment —
    /// nothing is transmitted and the sequence number is still consumed, so
    /// the peer's window never desyncs from this transport's bookkeeping.
    pub fn send(&self, addr: SocketAddr, payload: Bytes, reliable: bool) -> Result<u16> {
        let entry = self.peers.entry(addr).or_insert_with(|| Mutex::new(PeerState::new()));
        let mut peer = entry.lock().expect("peer mutex poisoned");

        let seq = peer.next_seq();

        if reliable && peer.pending_len() >= ACK_WINDOW as usize {
            drop(peer);
            self.counters.record_window_overflow();
            trace!("dropping reliable send to {addr}: window full");
            return Err(TransportError::SendWindowFull);
        }

        let (ack, ack_bits) = peer.ack_state();
        let datagram = Datagram {
            header: Header { seq, ack, ack_bits },
            payload: payload.clone(),
        };

        if reliable {
            peer.track_pending(seq, payload, Instant::now());
        }
        drop(peer);

        self.socket.send_to(&datagram.encode(), addr)?;
        Ok(seq)
    }

    /// Drives retransmission for every known peer. Cheap to call every tick:
    /// peers with nothing due do no work beyond a window scan.
    pub fn update(&self, now: Instant) {
        for entry in self.peers.iter() {
            let addr = *entry.key();
            let mut peer = entry.value().lock().expect("peer mutex poisoned");
            let (due, expired) = peer.due_retransmits(now);
            let (ack, ack_bits) = peer.ack_state();
            drop(peer);

            for _ in &expired {
                self.counters.record_timeout();
            }
            for (seq, payload) in due {
                self.counters.record_retry();
                let datagram = Datagram {
                    header: Header { seq, ack, ack_bits },
                    payload,
                };
                if let Err(err) = self.socket.send_to(&datagram.encode(), addr) {
                    warn!("retransmit to {addr} failed: {err}");
                }
            }
        }
    }

    pub fn sample_counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    pub fn known_peers(&self) -> Vec<SocketAddr> {
        self.peers.iter().map(|e| *e.key()).collect()
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reliable_send_is_rejected_once_the_window_is_full() {
        let transport = UdpTransport::bind("127.0.0.1:0").unwrap();
        let peer_addr: SocketAddr = "127.0.0.1:9".parse().unwrap();

        for _ in 0..ACK_WINDOW {
            transport
                .send(peer_addr, Bytes::from_static(b"x"), true)
                .expect("window should not be full yet");
        }

        let result = transport.send(peer_addr, Bytes::from_static(b"x"), true);
        assert!(matches!(result, Err(TransportError::SendWindowFull)));
        assert_eq!(transport.sample_counters().dropped_window, 1);
    }

    #[test]
    fn unreliable_sends_ignore_the_window() {
        let transport = UdpTransport::bind("127.0.0.1:0").unwrap();
        let peer_addr: SocketAddr = "127.0.0.1:9".parse().unwrap();

        for _ in 0..(ACK_WINDOW + 10) {
            transport
                .send(peer_addr, Bytes::from_static(b"x"), false)
                .expect("unreliable sends are never window-limited");
        }
    }
}

fn recv_loop(
    socket: Arc<UdpSocket>,
    peers: Arc<DashMap<SocketAddr, Mutex<PeerState>>>,
    counters: Arc<Counters>,
    running: Arc<AtomicBool>,
    on_packet: Arc<PacketHandler>,
) {
    let mut buf = [0u8; RECV_BUFFER_LEN];
    while running.load(Ordering::SeqCst) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(err) => {
                warn!("transport recv failed: {err}");
                continue;
            }
        };
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if len < crate::wire::HEADER_LEN {
            trace!("dropping undersized datagram from {src} ({len} bytes)");
            continue;
        }

        let data = Bytes::copy_from_slice(&buf[..len]);
        let datagram = match Datagram::decode(data) {
            Ok(d) => d,
            Err(err) => {
                warn!("failed to decode datagram from {src}: {err}");
                continue;
            }
        };

        let entry = peers.entry(src).or_insert_with(|| Mutex::new(PeerState::new()));
        let mut peer = entry.lock().expect("peer mutex poisoned");
        peer.on_ack(datagram.header.ack, datagram.header.ack_bits);
        let arrival = peer.on_receive(datagram.header.seq);
        drop(peer);

        match arrival {
            Arrival::Fresh => on_packet(src, datagram.payload),
            Arrival::Duplicate => {
                counters.record_duplicate();
                trace!("dropping duplicate seq {} from {src}", datagram.header.seq);
            }
            Arrival::Old => {
                counters.record_old();
                trace!("dropping stale seq {} from {src}", datagram.header.seq);
            }
        }
    }
}
