use std::sync::Arc;
use std::time::Instant;

use terrain_viewer::images::{dem_rgba8, light_map_gray8};
use terrain_viewer::lighting::{compute_horizon_angles, compute_light_map_with_sun};
use terrain_viewer::terrain::{HeightField, NoiseConfig, NoiseGenerator};
use terrain_viewer::water::{compute_flow_map, FlowMapSettings, WaterSimulation};
use terrain_viewer::Parameters;

const RESOLUTION: usize = 256;
const EXTENT: f32 = 1000.0;
const MAX_ALTITUDE: f32 = 250.0;
const FRAMES: usize = 100;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // optional JSON parameters as the first argument
    let parameters = match std::env::args().nth(1) {
        Some(json) => match Parameters::from_json(&json) {
            Ok(parameters) => parameters,
            Err(err) => {
                log::error!("{err}");
                std::process::exit(2);
            }
        },
        None => Parameters::default(),
    };

    // randomly seeded relief, "mountains" as the second argument for rugged terrain
    let config = match std::env::args().nth(2).as_deref() {
        Some("mountains") => NoiseConfig::mountains(),
        _ => NoiseConfig::hills(),
    };
    log::info!("noise seed {}", config.seed);
    let generator = NoiseGenerator::new(config);
    let terrain = match HeightField::from_noise(
        EXTENT,
        EXTENT,
        MAX_ALTITUDE,
        RESOLUTION,
        RESOLUTION,
        &generator,
    ) {
        Ok(terrain) => Arc::new(terrain),
        Err(err) => {
            log::error!("failed to build terrain: {err}");
            std::process::exit(1);
        }
    };

    let (low, high) = terrain.altitude_range();
    println!("Terrain {RESOLUTION}x{RESOLUTION}:");
    println!("  Altitude: {low:.1} .. {high:.1}");

    let start = Instant::now();
    let horizons = compute_horizon_angles(&terrain);
    let light = compute_light_map_with_sun(
        &terrain,
        &horizons,
        parameters.shading,
        parameters.sun_direction,
    );
    println!(
        "  Light map ({:?}) in {:.1?}",
        parameters.shading,
        start.elapsed()
    );
    let mean_light = light.iter().sum::<f32>() / light.len() as f32;
    let gray = light_map_gray8(&light);
    let dark = gray.iter().filter(|&&v| v < 64).count();
    println!("  Mean light: {mean_light:.3}");
    println!(
        "  Dark cells: {} ({:.1}%)",
        dark,
        dark as f32 * 100.0 / gray.len() as f32
    );
    let image = dem_rgba8(&terrain, &light, parameters.palette);
    println!("  DEM image: {} bytes", image.len());

    let mut simulation = WaterSimulation::new(parameters.water());
    simulation.init(terrain.clone(), parameters.initial_water_level);
    simulation.start();
    let start = Instant::now();
    for _ in 0..FRAMES {
        simulation.compute_iteration();
    }
    simulation.stop();
    let wet = simulation.water_map().iter().filter(|&&w| w > 1e-3).count();
    println!(
        "Water after {} frames in {:.1?}:",
        FRAMES,
        start.elapsed()
    );
    println!("  Volume: {:.3}", simulation.water_volume());
    println!(
        "  Wet cells: {} ({:.1}%)",
        wet,
        wet as f32 * 100.0 / terrain.len() as f32
    );

    let flow = compute_flow_map(terrain.clone(), &FlowMapSettings::default());
    let channels = flow.iter().filter(|&&v| v > 0.75).count();
    println!("  Drainage channel cells: {channels}");
}
