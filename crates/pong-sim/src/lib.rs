pub mod physics;
pub mod player;
pub mod tick;
pub mod world;

pub use player::PlayerSide;
pub use tick::{TickHandler, TickLoop};
pub use world::{World, WorldConfig, WorldState};
