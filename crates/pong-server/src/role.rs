use pong_sim::PlayerSide;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

struct Slot {
    role: PlayerSide,
    last_heard: Instant,
}

/// Binds peer addresses to `Left`/`Right`/`Spectator` roles. `Left` and
/// `Right` are exclusive; a peer assigned one keeps it until it goes idle
/// for longer than the configured timeout, at which point the slot frees up
/// for the next peer to claim.
pub struct RoleTable {
    idle_timeout: Duration,
    peers: HashMap<SocketAddr, Slot>,
    left_holder: Option<SocketAddr>,
    right_holder: Option<SocketAddr>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            peers: HashMap::new(),
            left_holder: None,
            right_holder: None,
        }
    }

    /// Returns the peer's existing role, assigning one the first time it is
    /// observed: `Left` if free, else `Right` if free, else `Spectator`.
    pub fn role_for(&mut self, addr: SocketAddr, now: Instant) -> PlayerSide {
        if let Some(slot) = self.peers.get_mut(&addr) {
            slot.last_heard = now;
            return slot.role;
        }

        let role = if self.left_holder.is_none() {
            self.left_holder = Some(addr);
            PlayerSide::Left
        } else if self.right_holder.is_none() {
            self.right_holder = Some(addr);
            PlayerSide::Right
        } else {
            PlayerSide::Spectator
        };

        self.peers.insert(
            addr,
            Slot {
                role,
                last_heard: now,
            },
        );
        role
    }

    pub fn touch(&mut self, addr: SocketAddr, now: Instant) {
        if let Some(slot) = self.peers.get_mut(&addr) {
            slot.last_heard = now;
        }
    }

    /// Releases any `Left`/`Right` slot whose peer has been silent longer
    /// than the idle timeout. Call once per tick. Returns the addresses
    /// released, so the caller can log or clean up other per-peer state.
    pub fn release_idle(&mut self, now: Instant) -> Vec<SocketAddr> {
        let mut released = Vec::new();
        self.peers.retain(|&addr, slot| {
            if now.duration_since(slot.last_heard) <= self.idle_timeout {
                return true;
            }
            match slot.role {
                PlayerSide::Left if self.left_holder == Some(addr) => self.left_holder = None,
                PlayerSide::Right if self.right_holder == Some(addr) => self.right_holder = None,
                _ => {}
            }
            released.push(addr);
            false
        });
        released
    }

    pub fn known_peers(&self) -> impl Iterator<Item = (SocketAddr, PlayerSide)> + '_ {
        self.peers.iter().map(|(&addr, slot)| (addr, slot.role))
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn first_two_peers_get_left_and_right_then_spectator() {
        let mut table = RoleTable::new();
        let now = Instant::now();
        assert_eq!(table.role_for(addr(1), now), PlayerSide::Left);
        assert_eq!(table.role_for(addr(2), now), PlayerSide::Right);
        assert_eq!(table.role_for(addr(3), now), PlayerSide::Spectator);
    }

    #[test]
    fn known_peer_keeps_its_role_on_repeat_lookup() {
        let mut table = RoleTable::new();
        let now = Instant::now();
        table.role_for(addr(1), now);
        assert_eq!(table.role_for(addr(1), now + Duration::from_millis(5)), PlayerSide::Left);
    }

    #[test]
    fn idle_peer_frees_its_slot_for_the_next_claimant() {
        let mut table = RoleTable::with_idle_timeout(Duration::from_millis(50));
        let t0 = Instant::now();
        table.role_for(addr(1), t0);

        let released = table.release_idle(t0 + Duration::from_millis(100));
        assert_eq!(released, vec![addr(1)]);

        assert_eq!(table.role_for(addr(2), t0 + Duration::from_millis(100)), PlayerSide::Left);
    }
}
