use std::path::PathBuf;

use clap::{Parser, Subcommand};
use firmament_render::{RecordingBackend, RenderHost, RenderSettings};
use firmament_sky::{MoonBody, MoonPhase, SkyConfig, SkyManager, appearance};
use glam::Vec3;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "firmament-cli", about = "Headless driver for the sky renderer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Show moon phases and textures for a calendar day
    Phases {
        /// Day number
        #[arg(short, long, default_value = "0")]
        day: u32,
        /// Sky config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the weather table
    Weathers {
        /// Sky config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the default sky config as JSON
    DefaultConfig,
    /// Run the sky for a number of frames on an in-memory backend
    Simulate {
        /// Sky config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u32,
        /// Seconds per frame
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// Weather applied at start
        #[arg(long, default_value = "clear")]
        from: String,
        /// Weather transitioned to, if any
        #[arg(long)]
        to: Option<String>,
        /// Transition length in seconds
        #[arg(long, default_value = "0.5")]
        transition: f32,
        /// Hour of day
        #[arg(long, default_value = "12.0")]
        hour: f64,
        /// Calendar day, drives the moon phases
        #[arg(long, default_value = "0")]
        day: u32,
        /// Dump the recorded scene after the run
        #[arg(long)]
        dump: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SkyConfig> {
    match path {
        Some(path) => Ok(SkyConfig::load(path)?),
        None => Ok(SkyConfig::default()),
    }
}

/// Sun direction on a simple east-west arc: rises at 6h, peaks at 12h.
fn sun_direction(hour: f64) -> Vec3 {
    let angle = ((hour - 6.0) / 12.0 * std::f64::consts::PI) as f32;
    Vec3::new(angle.cos(), angle.sin(), 0.2)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("firmament-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", firmament_common::crate_info());
            println!("render: {}", firmament_render::crate_info());
            println!("sky: {}", firmament_sky::crate_info());
        }
        Commands::Phases { day, config } => {
            let config = load_config(config.as_ref())?;
            let masser = MoonPhase::from_day(day, config.days_per_phase);
            let secunda = MoonPhase::from_day(
                day.wrapping_add(config.secunda_phase_offset_days),
                config.days_per_phase,
            );
            println!("Day {day} ({} days per phase)", config.days_per_phase);
            for (body, phase) in [(MoonBody::Masser, masser), (MoonBody::Secunda, secunda)] {
                let look = appearance(body, phase);
                println!(
                    "  {body}: {phase} (phase {}) alpha={:.2} texture={}",
                    phase.phase_int(),
                    look.alpha,
                    look.texture
                );
            }
        }
        Commands::Weathers { config } => {
            let config = load_config(config.as_ref())?;
            println!("{} weathers", config.weathers.len());
            for w in config.weathers.iter() {
                println!(
                    "  {:<14} clouds={:<24} opacity={:.2} speed={:.2} glare={:.2} sky={}",
                    w.name, w.cloud_texture, w.clouds_maximum_percent, w.cloud_speed, w.glare_view, w.sky_colour
                );
            }
        }
        Commands::DefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&SkyConfig::default())?);
        }
        Commands::Simulate {
            config,
            frames,
            dt,
            from,
            to,
            transition,
            hour,
            day,
            dump,
        } => {
            let config = load_config(config.as_ref())?;
            let settings = RenderSettings::default();
            let mut host = RenderHost::new(settings.clone());
            host.create_default_scene()?;
            host.adjust_viewport(settings.window_width, settings.window_height)?;

            let mut backend = RecordingBackend::new();
            {
                let mut sky = SkyManager::new(&mut backend, &config)?;
                sky.set_hour(hour);
                sky.set_date(day, 1);
                sky.set_sun_direction(sun_direction(hour))?;
                sky.change_weather(&from, 0.0)?;
                if let Some(to) = &to {
                    sky.change_weather(to, transition)?;
                }

                for frame in 0..frames {
                    host.update(dt);
                    let camera = host.camera_mut()?;
                    camera.rotate(dt * 0.5, 0.0);
                    let (eye, forward) = (camera.position, camera.forward());
                    sky.set_view(eye, forward);
                    sky.update(dt);
                    tracing::trace!(frame, glare = sky.sun_glare().size(), "frame");
                }

                println!(
                    "Ran {} frames ({:.2}s) at {}x{}",
                    host.frame_count(),
                    host.elapsed(),
                    host.viewport().width,
                    host.viewport().height
                );
                println!("{}", sky.summary());
                let sun = sky.real_sun_pos();
                println!("Sun at ({:.1}, {:.1}, {:.1})", sun.x, sun.y, sun.z);
                if dump {
                    print!("{}", sky.backend().describe());
                }
            }
            host.cleanup();
            println!(
                "Released: nodes={} materials={} billboards={}",
                backend.node_count(),
                backend.material_count(),
                backend.billboard_set_count()
            );
        }
    }

    Ok(())
}
