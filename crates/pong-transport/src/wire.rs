use crate::error::Result;
use bytes::Bytes;
use pong_binary::{BinaryReader, BinaryWriter};

/// Fixed 8-byte datagram header: 16-bit sender sequence, 16-bit highest
/// sequence the sender has seen from us, and a 32-bit selective-ack bitmask
/// where bit `k` means `ack - k` (for `k >= 1`) was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub seq: u16,
    pub ack: u16,
    pub ack_bits: u32,
}

pub const HEADER_LEN: usize = 8;
pub const ACK_WINDOW: u32 = 32;

impl Header {
    pub fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u16(self.seq).expect("in-memory write cannot fail");
        writer.write_u16(self.ack).expect("in-memory write cannot fail");
        writer
            .write_u32(self.ack_bits)
            .expect("in-memory write cannot fail");
    }

    pub fn decode(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            seq: reader.read_u16()?,
            ack: reader.read_u16()?,
            ack_bits: reader.read_u32()?,
        })
    }
}

/// A complete inbound/outbound datagram: header plus opaque payload.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub header: Header,
    pub payload: Bytes,
}

impl Datagram {
    pub fn encode(&self) -> Bytes {
        let mut writer = BinaryWriter::with_capacity(HEADER_LEN + self.payload.len());
        self.header.encode(&mut writer);
        writer
            .write_bytes(&self.payload)
            .expect("in-memory write cannot fail");
        writer.freeze()
    }

    pub fn decode(data: Bytes) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let header = Header::decode(&mut reader)?;
        let payload = reader.read_rest();
        Ok(Self { header, payload })
    }
}

/// True if, accounting for 16-bit wraparound, `a` is strictly newer than `b`.
pub fn is_seq_newer(a: u16, b: u16) -> bool {
    let diff = a.wrapping_sub(b);
    diff != 0 && diff < 0x8000
}

/// True if `seq` is covered by a receiver-reported `(ack, ack_bits)` pair:
/// either it *is* the highest acked sequence, or it falls within the
/// trailing [`ACK_WINDOW`] and its bit is set.
pub fn is_seq_acked(seq: u16, ack: u16, ack_bits: u32) -> bool {
    if seq == ack {
        return true;
    }
    if !is_seq_newer(ack, seq) {
        return false;
    }
    let diff = ack.wrapping_sub(seq) as u32;
    if diff == 0 || diff > ACK_WINDOW {
        return false;
    }
    ack_bits & (1 << (diff - 1)) != 0
}

/// Folds a newly received `seq` into the receiver's running `(highest, bits)`
/// state, returning the updated pair. Mirrors the transport's receive-side
/// bookkeeping: sequences newer than `highest` shift the window forward and
/// mark the previous highest as received; older sequences just set their bit
/// if still inside the window.
pub fn update_receive_state(highest: u16, bits: u32, seq: u16) -> (u16, u32) {
    if seq == highest {
        return (highest, bits);
    }
    if is_seq_newer(seq, highest) {
        let diff = seq.wrapping_sub(highest) as u32;
        let shifted = if diff >= 32 { 0 } else { bits << diff };
        let new_bits = if diff <= ACK_WINDOW { shifted | (1 << (diff - 1)) } else { shifted };
        (seq, new_bits)
    } else {
        let diff = highest.wrapping_sub(seq) as u32;
        if diff == 0 || diff > ACK_WINDOW {
            (highest, bits)
        } else {
            (highest, bits | (1 << (diff - 1)))
        }
    }
}

/// True if `seq` has already been recorded as received under `(highest, bits)`.
pub fn has_received(highest: u16, bits: u32, seq: u16) -> bool {
    is_seq_acked(seq, highest, bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_handles_wraparound() {
        assert!(is_seq_newer(1, 0));
        assert!(is_seq_newer(0, u16::MAX));
        assert!(!is_seq_newer(0, 0));
        assert!(!is_seq_newer(u16::MAX, 0));
    }

    #[test]
    fn ack_matches_highest_exactly() {
        assert!(is_seq_acked(10, 10, 0));
    }

    #[test]
    fn ack_checks_bit_within_window() {
        let ack = 40u16;
        let bits = 1 << 4; // represents seq = ack - 5
        assert!(is_seq_acked(35, ack, bits));
        assert!(!is_seq_acked(34, ack, bits));
    }

    #[test]
    fn ack_rejects_outside_window() {
        assert!(!is_seq_acked(7, 40, u32::MAX));
    }

    #[test]
    fn receive_state_advances_and_marks_previous_highest() {
        let (highest, bits) = update_receive_state(10, 0, 11);
        assert_eq!(highest, 11);
        assert!(has_received(highest, bits, 10));
        assert!(!has_received(highest, bits, 9));
    }

    #[test]
    fn receive_state_marks_out_of_order_arrival() {
        let (highest, bits) = update_receive_state(10, 0b1, 12);
        assert_eq!(highest, 12);
        assert!(has_received(highest, bits, 11));
        assert!(has_received(highest, bits, 10));
    }

    #[test]
    fn receive_state_sets_bit_for_late_arrival_within_window() {
        let (highest, bits) = update_receive_state(20, 0, 18);
        assert_eq!(highest, 20);
        assert!(has_received(highest, bits, 18));
        assert!(!has_received(highest, bits, 17));
    }

    #[test]
    fn receive_state_does_not_fake_ack_a_previous_highest_outside_the_window() {
        let (highest, bits) = update_receive_state(0, 0, 33);
        assert_eq!(highest, 33);
        assert!(!has_received(highest, bits, 0), "bit 32 away must not be marked received");
    }

    #[test]
    fn receive_state_marks_previous_highest_exactly_at_the_window_edge() {
        let (highest, bits) = update_receive_state(0, 0, 32);
        assert_eq!(highest, 32);
        assert!(has_received(highest, bits, 0));
    }
}
