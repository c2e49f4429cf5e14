//! Shared primitive types used across the entire simulation.

/// A fixed-rate simulation tick. One tick = one simulated second.
pub type Tick = u64;

/// A stable, unique identifier for a placed node.
pub type NodeId = String;

/// Simulated seconds (fractional), as seen by the frame-driven engine.
pub type SimSeconds = f64;

/// A grid cell `(x, y)` on the build plane. `x` decides the availability zone.
pub type GridPos = (i32, i32);
