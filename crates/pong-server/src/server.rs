use crate::metrics::Metrics;
use crate::protocol::{Input, Message, ParseError, Snapshot};
use crate::role::RoleTable;
use log::{debug, info, trace, warn};
use pong_codec::SnapshotGenerator;
use pong_sim::{PlayerSide, World, WorldConfig};
use pong_transport::UdpTransport;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const DEFAULT_CHECKPOINT_INTERVAL_TICKS: u64 = 300;

/// Wires the transport, world, snapshot generator, and role table together;
/// owns everything the tick handler touches. One instance per match.
pub struct NetcodeServer {
    transport: Arc<UdpTransport>,
    world: Arc<World>,
    generator: Mutex<SnapshotGenerator>,
    roles: Mutex<RoleTable>,
    metrics: Arc<Metrics>,
    checkpoint_interval_ticks: u64,
    last_client_seq: Mutex<std::collections::HashMap<SocketAddr, u32>>,
    checkpoint_bytes_total: AtomicU64,
}

impl NetcodeServer {
    pub fn new(
        transport: Arc<UdpTransport>,
        world_config: WorldConfig,
        keyframe_interval: u64,
        snapshot_history: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            transport,
            world: Arc::new(World::with_config(world_config)),
            generator: Mutex::new(SnapshotGenerator::with_params(keyframe_interval, snapshot_history)),
            roles: Mutex::new(RoleTable::new()),
            metrics,
            checkpoint_interval_ticks: DEFAULT_CHECKPOINT_INTERVAL_TICKS,
            last_client_seq: Mutex::new(std::collections::HashMap::new()),
            checkpoint_bytes_total: AtomicU64::new(0),
        }
    }

    pub fn world(&self) -> Arc<World> {
        Arc::clone(&self.world)
    }

    /// Handles one decoded datagram payload from `addr`. Malformed bodies
    /// are dropped and counted, never propagated as an error (spec.md §7:
    /// no error crosses a tick boundary).
    pub fn handle_datagram(&self, addr: SocketAddr, payload: bytes::Bytes) {
        let now = Instant::now();
        let role = self.roles.lock().expect("role table mutex poisoned").role_for(addr, now);

        match Message::decode(payload) {
            Ok(Message::Input(input)) => self.handle_input(addr, role, input),
            Ok(Message::Snapshot(_)) | Ok(Message::ServerAck(_)) => {
                trace!("ignoring server-bound message of a server-to-client type from {addr}");
            }
            Err(ParseError::UnknownTag(tag)) => {
                self.metrics.record_dropped_parse();
                warn!("dropped datagram from {addr}: unknown tag {tag:#04x}");
            }
            Err(ParseError::Truncated(err)) => {
                self.metrics.record_dropped_parse();
                warn!("dropped truncated datagram from {addr}: {err}");
            }
        }
    }

    fn handle_input(&self, addr: SocketAddr, role: PlayerSide, input: Input) {
        if role == PlayerSide::Spectator {
            debug!("ignoring input from spectator {addr}");
        } else {
            let direction = input.dy.signum();
            self.world.set_player_input(role, direction);
        }

        self.last_client_seq
            .lock()
            .expect("last_client_seq mutex poisoned")
            .insert(addr, input.client_seq);

        if let Ok(now_ns) = SystemTime::now().duration_since(UNIX_EPOCH) {
            let now_ns = now_ns.as_nanos() as u64;
            let latency_ms = now_ns.saturating_sub(input.timestamp_ns) as f64 / 1_000_000.0;
            self.metrics.record_input_ack_latency_ms(latency_ms);
        }

        let ack = Message::ServerAck(crate::protocol::ServerAck {
            last_client_seq: input.client_seq,
            server_tick: self.world.snapshot().tick as u32,
        });
        if let Err(err) = self.transport.send(addr, ack.encode(), true) {
            warn!("failed to send ServerAck to {addr}: {err}");
        }
    }

    /// The tick handler: advances the world, broadcasts a snapshot to every
    /// known peer, drives transport retransmission, and releases idle role
    /// slots. Installed on the [`pong_sim::TickLoop`].
    pub fn tick(&self, tick: u64, dt_seconds: f64) {
        let tick_start = Instant::now();
        let state = self.world.step(dt_seconds);

        let encoded = self
            .generator
            .lock()
            .expect("snapshot generator mutex poisoned")
            .encode(state);

        match encoded.is_keyframe {
            true => self.metrics.record_keyframe_bytes(encoded.payload.len()),
            false => self.metrics.record_delta_bytes(encoded.payload.len()),
        }

        let peers: Vec<_> = self
            .roles
            .lock()
            .expect("role table mutex poisoned")
            .known_peers()
            .collect();

        for (addr, role) in &peers {
            let message = Message::Snapshot(Snapshot {
                tick: encoded.tick as u32,
                is_keyframe: encoded.is_keyframe,
                base_tick: encoded.base_tick as u32,
                state: encoded.payload.clone(),
                role: *role,
            });
            if let Err(err) = self.transport.send(*addr, message.encode(), false) {
                warn!("failed to send snapshot to {addr}: {err}");
            }
        }

        if self.checkpoint_interval_ticks != 0 && tick % self.checkpoint_interval_ticks == 0 {
            let keyframe = self
                .generator
                .lock()
                .expect("snapshot generator mutex poisoned")
                .encode_keyframe(state);
            let len = keyframe.payload.len() as u64;
            self.checkpoint_bytes_total.fetch_add(len, Ordering::Relaxed);
            info!("checkpoint at tick {tick}: {len} bytes");
        }

        self.transport.update(Instant::now());
        self.metrics.record_transport_counters(self.transport.sample_counters());
        let released = self.roles.lock().expect("role table mutex poisoned").release_idle(Instant::now());
        for addr in released {
            info!("released idle role slot for {addr}");
        }

        self.metrics
            .record_tick_duration_ms(tick_start.elapsed().as_secs_f64() * 1000.0);
    }
}
