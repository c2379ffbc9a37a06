/// Logical role a peer is bound to; `Spectator` never drives physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSide {
    Left,
    Right,
    Spectator,
}
