use log::{error, info, logger, Level};
use pong_log::PongLogger;
use pong_sim::{TickLoop, WorldConfig};
use pong_transport::UdpTransport;
use std::sync::Arc;
use std::time::Instant;

pub mod config;
pub mod metrics;
pub mod protocol;
pub mod role;
pub mod server;

fn main() {
    PongLogger::init(Level::Info).expect("logger already initialized");

    let start_time = Instant::now();

    let config = match config::handle() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load configuration: {err}");
            logger().flush();
            std::process::exit(1);
        }
    };

    info!("{} starting", config.server.name);

    let transport = match UdpTransport::bind(&config.network.bind_address) {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            error!("failed to bind {}: {err}", config.network.bind_address);
            logger().flush();
            std::process::exit(1);
        }
    };

    let metrics = Arc::new(metrics::Metrics::new());
    let server = Arc::new(server::NetcodeServer::new(
        Arc::clone(&transport),
        WorldConfig::default(),
        config.server.keyframe_interval,
        config.server.snapshot_history,
        Arc::clone(&metrics),
    ));

    let dispatch_server = Arc::clone(&server);
    transport.start(Box::new(move |addr, payload| {
        dispatch_server.handle_datagram(addr, payload);
    }));

    let mut tick_loop = TickLoop::new(config.server.tick_rate_hz);
    let tick_server = Arc::clone(&server);
    tick_loop.start(Box::new(move |tick, dt_seconds| {
        tick_server.tick(tick, dt_seconds);
    }));

    info!(
        "{} ready on {} ({:.2}s load time)",
        config.server.name,
        config.network.bind_address,
        start_time.elapsed().as_secs_f64()
    );
    logger().flush();

    std::thread::park();

    tick_loop.stop();
    drop(transport);
}
