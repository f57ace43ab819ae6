//! Erosion simulation parameters and configuration

/// Squared distance under which droplets attract each other.
pub const COHESION_DIST_SQ: f32 = 9.0;
/// Strength of the droplet-to-droplet attraction.
pub const ATTRACT_FALLOFF: f32 = 0.25;
/// Squared speed above which velocity is rescaled back down.
pub const SPEED_LIMIT_SQ: f32 = 2.0;
/// Fall energy granted to a freshly spawned droplet.
pub const SPAWN_ENERGY: i32 = 2;
/// Energy gained per unit of elevation drop on a committed move.
pub const ENERGY_PER_DROP: i32 = 10;

/// Global simulation parameters
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParams {
    /// Number of droplets to spawn (default: 100)
    pub droplet_count: usize,

    /// Number of ticks to run (default: 1000)
    pub ticks: usize,

    /// Neighbor ring depth for vector assignment: 2 or 3
    pub ring_depth: usize,

    /// Blend rate for the outflow feedback pass (0.0-1.0)
    pub feedback_rate: f32,

    /// Feedback fires after this many processed flow events
    pub feedback_interval: u64,

    /// Bounded mailbox capacity for both erosion queues
    pub queue_capacity: usize,

    /// Drain both queues before exposing final grid state.
    /// Disabling reproduces the historical snapshot-while-in-flight race.
    pub drain: bool,

    /// Drop zero-velocity droplets from the population after the last tick
    pub prune_inert: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            droplet_count: 100,
            ticks: 1000,
            ring_depth: 3,
            feedback_rate: 0.2,
            feedback_interval: 100,
            queue_capacity: 1000,
            drain: true,
            prune_inert: false,
        }
    }
}

impl SimulationParams {
    /// Small configuration for quick runs and tests
    pub fn fast() -> Self {
        Self {
            droplet_count: 20,
            ticks: 50,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = SimulationParams::default();
        assert_eq!(params.ring_depth, 3);
        assert_eq!(params.feedback_interval, 100);
        assert_eq!(params.queue_capacity, 1000);
        assert!(params.drain);
    }
}
