use crate::wire::{has_received, is_seq_acked, update_receive_state, ACK_WINDOW};
use bytes::Bytes;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const BASE_RTO: Duration = Duration::from_millis(50);
pub const PENDING_TTL: Duration = Duration::from_millis(500);
pub const MAX_RETRIES: u32 = 5;

struct PendingPacket {
    payload: Bytes,
    first_sent: Instant,
    last_sent: Instant,
    retries: u32,
}

fn backoff_for(retries: u32) -> Duration {
    BASE_RTO.mul_f64(1.5f64.powi(retries as i32))
}

/// What the caller should do with a just-arrived sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    Fresh,
    Duplicate,
    Old,
}

/// An outstanding reliable send that missed its deadline after exhausting
/// its retries; the caller decides whether that means dropping the peer.
#[derive(Debug, Clone, Copy)]
pub struct Expired {
    pub seq: u16,
}

/// Per-peer reliability bookkeeping: outbound sequence counter, the
/// receiver-side ack window, and the set of reliable sends still awaiting
/// acknowledgment. One of these lives per connected address.
pub struct PeerState {
    next_send_seq: u16,
    highest_received: u16,
    receive_bits: u32,
    have_received_any: bool,
    pending: HashMap<u16, PendingPacket>,
}

impl PeerState {
    pub fn new() -> Self {
        Self {
            next_send_seq: 1,
            highest_received: 0,
            receive_bits: 0,
            have_received_any: false,
            pending: HashMap::new(),
        }
    }

    pub fn next_seq(&mut self) -> u16 {
        let seq = self.next_send_seq;
        self.next_send_seq = self.next_send_seq.wrapping_add(1);
        seq
    }

    pub fn ack_state(&self) -> (u16, u32) {
        (self.highest_received, self.receive_bits)
    }

    /// Classifies an inbound sequence number and folds it into the receive
    /// window. Duplicates and packets older than the trailing window are
    /// reported, never re-delivered.
    pub fn on_receive(&mut self, seq: u16) -> Arrival {
        if self.have_received_any && has_received(self.highest_received, self.receive_bits, seq) {
            return Arrival::Duplicate;
        }

        let within_window = !self.have_received_any
            || seq == self.highest_received
            || self
                .highest_received
                .wrapping_sub(seq)
                .min(seq.wrapping_sub(self.highest_received)) as u32
                <= ACK_WINDOW;

        let (highest, bits) = update_receive_state(self.highest_received, self.receive_bits, seq);
        self.highest_received = highest;
        self.receive_bits = bits;
        self.have_received_any = true;

        if within_window {
            Arrival::Fresh
        } else {
            Arrival::Old
        }
    }

    /// Registers a reliable send under `seq` so it can be retransmitted
    /// until acked or expired.
    pub fn track_pending(&mut self, seq: u16, payload: Bytes, now: Instant) {
        self.pending.insert(
            seq,
            PendingPacket {
                payload,
                first_sent: now,
                last_sent: now,
                retries: 0,
            },
        );
    }

    /// Drops every pending send the peer's `(ack, ack_bits)` covers.
    pub fn on_ack(&mut self, ack: u16, ack_bits: u32) {
        self.pending
            .retain(|&seq, _| !is_seq_acked(seq, ack, ack_bits));
    }

    /// Returns the payloads due for retransmission right now, bumping each
    /// one's retry counter and `last_sent` timestamp. Entries that have hit
    /// [`MAX_RETRIES`] or outlived [`PENDING_TTL`] are dropped and reported
    /// as [`Expired`] instead of resent.
    pub fn due_retransmits(&mut self, now: Instant) -> (Vec<(u16, Bytes)>, Vec<Expired>) {
        let mut due = Vec::new();
        let mut expired = Vec::new();

        self.pending.retain(|&seq, packet| {
            if now.duration_since(packet.first_sent) >= PENDING_TTL
                || packet.retries >= MAX_RETRIES
            {
                expired.push(Expired { seq });
                return false;
            }

            if now.duration_since(packet.last_sent) >= backoff_for(packet.retries) {
                packet.retries += 1;
                packet.last_sent = now;
                due.push((seq, packet.payload.clone()));
            }
            true
        });

        (due, expired)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl Default for PeerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_then_duplicate_then_old() {
        let mut peer = PeerState::new();
        assert_eq!(peer.on_receive(0), Arrival::Fresh);
        assert_eq!(peer.on_receive(1), Arrival::Fresh);
        assert_eq!(peer.on_receive(1), Arrival::Duplicate);
        assert_eq!(peer.on_receive(0), Arrival::Duplicate);
    }

    #[test]
    fn ack_clears_pending_entry() {
        let mut peer = PeerState::new();
        let now = Instant::now();
        peer.track_pending(5, Bytes::from_static(b"hi"), now);
        assert_eq!(peer.pending_len(), 1);
        peer.on_ack(5, 0);
        assert_eq!(peer.pending_len(), 0);
    }

    #[test]
    fn retransmit_waits_for_backoff_then_fires() {
        let mut peer = PeerState::new();
        let t0 = Instant::now();
        peer.track_pending(1, Bytes::from_static(b"x"), t0);

        let (due, expired) = peer.due_retransmits(t0);
        assert!(due.is_empty());
        assert!(expired.is_empty());

        let t1 = t0 + BASE_RTO + Duration::from_millis(5);
        let (due, expired) = peer.due_retransmits(t1);
        assert_eq!(due.len(), 1);
        assert!(expired.is_empty());
    }

    #[test]
    fn retransmit_expires_after_ttl() {
        let mut peer = PeerState::new();
        let t0 = Instant::now();
        peer.track_pending(1, Bytes::from_static(b"x"), t0);

        let (_due, expired) = peer.due_retransmits(t0 + PENDING_TTL + Duration::from_millis(1));
        assert_eq!(expired.len(), 1);
        assert_eq!(peer.pending_len(), 0);
    }
}
