use std::time::Instant;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use topomaker::ascii;
use topomaker::erosion::{self, SimulationParams};
use topomaker::export::{self, RenderOptions};
use topomaker::heightmap::{self, FeatureBatch, FeatureGroup, LayoutConfig, PetalParams};

#[derive(Parser, Debug)]
#[command(name = "topomaker")]
#[command(about = "Generate a terrain heightmap and carve it with hydraulic erosion")]
struct Args {
    /// Width of the map in cells
    #[arg(short = 'W', long, default_value = "512")]
    width: usize,

    /// Height of the map in cells
    #[arg(short = 'H', long, default_value = "512")]
    height: usize,

    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of random hills (every third is a basin)
    #[arg(long, default_value = "400")]
    hills: usize,

    /// Maximum hill radius
    #[arg(long, default_value = "100")]
    hill_wide: usize,

    /// Number of ridge chains
    #[arg(long, default_value = "30")]
    ridges: usize,

    /// Segments per ridge chain
    #[arg(long, default_value = "20")]
    ridge_len: usize,

    /// Ridge segment radius and step length
    #[arg(long, default_value = "20")]
    ridge_wide: usize,

    /// Number of stuck zones flattening covered features
    #[arg(long, default_value = "0")]
    stucks: usize,

    /// Stuck zone radius
    #[arg(long, default_value = "150")]
    stuck_wide: usize,

    /// Petal shape: 0 circle, 1 pointed, 2 round, 3 full lobes
    #[arg(long, default_value = "2")]
    petal_shape: u8,

    /// Number of petal lobes
    #[arg(long, default_value = "3")]
    petal_lobes: f64,

    /// How deeply lobes cut into the footprint (0.0-1.0)
    #[arg(long, default_value = "0.5")]
    petal_sharpness: f64,

    /// JSON layout file replacing the random feature flags
    #[arg(long)]
    layout: Option<String>,

    /// Number of droplets to spawn
    #[arg(short = 'n', long, default_value = "100")]
    droplets: usize,

    /// Number of simulation ticks
    #[arg(short = 't', long, default_value = "1000")]
    ticks: usize,

    /// Neighbor ring depth for vector assignment (2 or 3)
    #[arg(long, default_value = "3")]
    ring_depth: usize,

    /// Blend rate of the outflow-history feedback on flow vectors
    #[arg(long, default_value = "0.2")]
    feedback_rate: f32,

    /// Snapshot grids without draining the event queues first
    #[arg(long)]
    no_drain: bool,

    /// Drop zero-velocity droplets after the last tick
    #[arg(long)]
    prune_inert: bool,

    /// Output image path (default: timestamped name in --out-dir)
    #[arg(short, long)]
    out: Option<String>,

    /// Directory for timestamped output files
    #[arg(long, default_value = ".")]
    out_dir: String,

    /// Pixel size of one cell in the output image
    #[arg(short, long, default_value = "1")]
    zoom: usize,

    /// Color template PNG; its first pixel column becomes the palette
    #[arg(long)]
    color_template: Option<String>,

    /// Draw flow-direction arrows
    #[arg(long)]
    arrows: bool,

    /// Arrow length multiplier
    #[arg(long, default_value = "3.0")]
    arrow_scale: f64,

    /// Skip the standing-water overlay
    #[arg(long)]
    no_water: bool,

    /// Skip the outflow-trace overlay
    #[arg(long)]
    no_outflow: bool,

    /// Skip the droplet-trail overlay
    #[arg(long)]
    no_trails: bool,

    /// Print the map to the console as ASCII
    #[arg(long)]
    show_map: bool,
}

fn build_layout(args: &Args) -> Result<LayoutConfig, Box<dyn std::error::Error>> {
    if let Some(path) = &args.layout {
        return LayoutConfig::from_file(path);
    }
    let petal = PetalParams {
        shape: args.petal_shape,
        lobes: args.petal_lobes,
        sharpness: args.petal_sharpness,
    };
    Ok(LayoutConfig {
        hill_group: FeatureGroup {
            list: vec![FeatureBatch {
                num: args.hills,
                wide: args.hill_wide,
                len: 0,
            }],
            petal,
        },
        ridge_group: FeatureGroup {
            list: vec![FeatureBatch {
                num: args.ridges,
                wide: args.ridge_wide,
                len: args.ridge_len,
            }],
            petal,
        },
        stuck_group: FeatureGroup {
            list: vec![FeatureBatch {
                num: args.stucks,
                wide: args.stuck_wide,
                len: 0,
            }],
            petal: PetalParams::default(),
        },
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let started = Instant::now();

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    println!("Generating terrain with seed: {}", seed);
    println!("Map size: {}x{}", args.width, args.height);

    let layout = build_layout(&args)?;
    let mut hills = layout.hill_group.to_hills(args.width, args.height, &mut rng);
    let mut ridges = layout.ridge_group.to_ridges(args.width, args.height, &mut rng);
    let stucks = layout.stuck_group.to_hills(args.width, args.height, &mut rng);
    println!(
        "Seeded {} hills, {} ridge segments, {} stuck zones",
        hills.len(),
        ridges.len(),
        stucks.len()
    );

    heightmap::press_stucks(&mut hills, &mut ridges, &stucks, &layout.stuck_group.petal);

    println!("Rasterizing terrain...");
    let terrain = heightmap::rasterize(
        args.width,
        args.height,
        &hills,
        &layout.hill_group.petal,
        &ridges,
        &layout.ridge_group.petal,
    );
    let max_elev = heightmap::max_elevation(&terrain);
    println!("Max elevation: {}", max_elev);

    let params = SimulationParams {
        droplet_count: args.droplets,
        ticks: args.ticks,
        ring_depth: args.ring_depth,
        feedback_rate: args.feedback_rate,
        drain: !args.no_drain,
        prune_inert: args.prune_inert,
        ..Default::default()
    };
    let output = erosion::run_simulation(&terrain, &params, seed);
    println!(
        "Final standing water: {} ({} droplets alive)",
        output.stats.standing_water,
        output.droplets.len()
    );

    let palette = match &args.color_template {
        Some(path) => export::load_palette(path)?,
        None => export::procedural_palette(48),
    };
    let max_color = max_elev as f32 * 1.2;
    let opts = RenderOptions {
        zoom: args.zoom,
        draw_water: !args.no_water,
        draw_outflow: !args.no_outflow,
        draw_vectors: args.arrows,
        draw_trails: !args.no_trails,
        arrow_scale: args.arrow_scale,
        ..Default::default()
    };
    let path = args
        .out
        .clone()
        .unwrap_or_else(|| export::timestamped_path(&args.out_dir, "topomap"));
    export::export_map(&output, &palette, max_color, &opts, &path)?;
    println!("Wrote {}", path);

    if args.show_map {
        ascii::print_map(&output.elevation, &output.standing_water, max_elev);
    }

    println!("Done in {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}
