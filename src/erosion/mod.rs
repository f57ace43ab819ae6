//! Hydraulic erosion simulation.
//!
//! Water droplets wander the terrain along a per-cell flow-direction field,
//! and every committed lateral move is queued for two single-consumer
//! workers: one moves standing water and feeds outflow history back into the
//! vectors, the other carves the bedrock.

pub mod droplet;
pub mod events;
pub mod flow_field;
pub mod height_field;
pub mod params;

pub use droplet::Droplet;
pub use events::ErosionEvent;
pub use flow_field::FlowField;
pub use height_field::HeightField;
pub use params::SimulationParams;

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::tilemap::Tilemap;

/// Counters reported after a simulation run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulationStats {
    pub flow_events: u64,
    pub forwarded_events: u64,
    pub height_events: u64,
    pub committed_moves: u64,
    pub pruned_droplets: usize,
    pub standing_water: u64,
}

/// Final grid state plus the droplet population after the run.
pub struct SimulationOutput {
    pub elevation: Tilemap<u8>,
    pub standing_water: Tilemap<u32>,
    pub outflow: Tilemap<u32>,
    pub flow_vectors: Tilemap<(f32, f32)>,
    pub droplets: Vec<Droplet>,
    pub stats: SimulationStats,
}

/// Run the full erosion pipeline over a terrain grid: assign flow vectors,
/// start the two consumers, spawn and tick the droplet population, then
/// shut down and snapshot.
pub fn run_simulation(
    terrain: &Tilemap<u8>,
    params: &SimulationParams,
    seed: u64,
) -> SimulationOutput {
    println!(
        "Eroding {}x{}: {} droplets, {} ticks (ring depth {})...",
        terrain.width, terrain.height, params.droplet_count, params.ticks, params.ring_depth
    );

    let heights = Arc::new(HeightField::from_tilemap(terrain));
    let flow = Arc::new(FlowField::new(terrain.width, terrain.height));
    flow.assign_vectors(&heights, params.ring_depth);

    let actors = events::start_actors(flow.clone(), heights.clone(), params);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut droplets: Vec<Droplet> = (0..params.droplet_count)
        .map(|_| Droplet::spawn(&flow, &mut rng))
        .collect();

    droplet::run_ticks(
        &mut droplets,
        &heights,
        &flow,
        &actors.flow_tx,
        params.ticks,
        seed,
    );

    // Without draining, grids are snapshotted while events are still in
    // flight and moved water can go missing from the picture.
    let early_snapshot = if params.drain {
        None
    } else {
        Some((heights.snapshot(), flow.water_snapshot(), flow.outflow_snapshot()))
    };

    let actor_stats = actors.finish();

    let (elevation, standing_water, outflow) = early_snapshot.unwrap_or_else(|| {
        (
            heights.snapshot(),
            flow.water_snapshot(),
            flow.outflow_snapshot(),
        )
    });
    let flow_vectors = flow.vector_snapshot();

    let committed_moves: u64 = droplets
        .iter()
        .map(|d| (d.trail.len() - 1) as u64)
        .sum();

    let pruned_droplets = if params.prune_inert {
        let removed = droplet::prune_inert(&mut droplets);
        println!("  Pruned {} inert droplets", removed);
        removed
    } else {
        0
    };
    let stats = SimulationStats {
        flow_events: actor_stats.flow_events,
        forwarded_events: actor_stats.forwarded_events,
        height_events: actor_stats.height_events,
        committed_moves,
        pruned_droplets,
        standing_water: flow.sum_standing_water(),
    };

    println!(
        "  Erosion done: {} flow events, {} forwarded, {} bank collapses",
        stats.flow_events, stats.forwarded_events, stats.height_events
    );

    SimulationOutput {
        elevation,
        standing_water,
        outflow,
        flow_vectors,
        droplets,
        stats,
    }
}
