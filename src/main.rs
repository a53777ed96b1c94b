//! Sheetanim main entry point.
//!
//! Command line front end for the sprite sheet pipeline:
//!
//! - `inspect` preloads every configured sheet and lists its frames.
//! - `play` loads the sheets in the background and runs one animation
//!   against them on a fixed-rate clock, logging every frame change.
//!
//! # Main Loop (`play`)
//!
//! 1. Read the INI configuration and build the sprite loader
//! 2. Move the loader onto a worker thread (background loading bridge)
//! 3. Spawn one animated sprite and register systems
//! 4. Pulse the schedule at `target_fps` until the time limit is reached or
//!    a non-looping animation finishes
//! 5. Abandon any in-flight loading and release the clock on exit
//!
//! # Running
//!
//! ```sh
//! cargo run -- --config assets/config.ini inspect --sheet enemies
//! cargo run -- play --sheet enemies --group enemies --animation bee_fly \
//!     --library assets/animations/enemies.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use sheetanim::components::animation::Animated;
use sheetanim::components::sprite::Sprite;
use sheetanim::resources::animationlibrary::{AnimationConfig, AnimationLibrary};
use sheetanim::resources::animationscheduler::{AnimationId, AnimationScheduler};
use sheetanim::resources::loaderconfig::LoaderConfig;
use sheetanim::resources::loadstate::{
    LoadState, abandon_background_loading, start_background_loading,
};
use sheetanim::resources::worldtime::WorldTime;
use sheetanim::systems::animation::{
    animation_scheduler_system, release_animation_on_remove, spawn_animated_sprite,
    sync_sprite_frames,
};
use sheetanim::systems::loading::{
    apply_load_messages, finish_background_loading, poll_load_messages, update_load_messages,
};
use sheetanim::systems::time::update_world_time;

/// Sprite sheet loader and frame animation player
#[derive(Parser)]
#[command(version, about = "Load sprite sheets and play frame animations from them.")]
struct Cli {
    /// INI file listing the sprite sheets to load.
    #[arg(long, value_name = "PATH", default_value = "assets/config.ini")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load every sheet and list its frames.
    Inspect {
        /// Only list the frames of this sheet.
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Play one animation against a loaded sheet, logging frame changes.
    Play {
        #[arg(long)]
        sheet: String,
        /// Animation group, e.g. `enemies` or `character_green`.
        #[arg(long)]
        group: String,
        #[arg(long)]
        animation: String,
        /// JSON animation library merged over the built-in character tables.
        #[arg(long, value_name = "PATH")]
        library: Option<PathBuf>,
        /// Stop after this many seconds.
        #[arg(long, default_value_t = 3.0)]
        seconds: f32,
        /// Play the animation once instead of looping it.
        #[arg(long)]
        no_loop: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = LoaderConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    match cli.command {
        Command::Inspect { sheet } => inspect(&config, sheet.as_deref()),
        Command::Play {
            sheet,
            group,
            animation,
            library,
            seconds,
            no_loop,
        } => {
            let mut animations = AnimationLibrary::with_characters();
            if let Some(path) = library {
                match AnimationLibrary::load_from_file(&path) {
                    Ok(extra) => animations.extend(extra),
                    Err(e) => {
                        error!("{}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            let Some(anim) = animations.get(&group, &animation) else {
                error!(
                    "Unknown animation '{}' in group '{}' (groups: {})",
                    animation,
                    group,
                    animations.group_names().join(", ")
                );
                return ExitCode::FAILURE;
            };
            let anim = if no_loop {
                Arc::new(AnimationConfig {
                    looped: false,
                    ..(*anim).clone()
                })
            } else {
                anim
            };
            play(&config, &sheet, anim, seconds)
        }
    }
}

fn inspect(config: &LoaderConfig, only: Option<&str>) -> ExitCode {
    let mut loader = config.build_loader();
    if let Err(e) = loader.preload_all() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    for id in loader.sheet_ids() {
        if only.is_some_and(|wanted| wanted != id) {
            continue;
        }
        let Some(atlas) = loader.get_sheet(id) else {
            continue;
        };
        println!(
            "{} ({}x{}, {} frames) <- {}",
            id,
            atlas.image_width,
            atlas.image_height,
            atlas.frames.len(),
            atlas.image_path
        );
        if only.is_some() {
            for (name, frame) in atlas.frames.iter() {
                println!(
                    "  {:<32} x={:<5} y={:<5} w={:<5} h={:<5}{}",
                    name,
                    frame.x,
                    frame.y,
                    frame.width,
                    frame.height,
                    if frame.rotated { " rotated" } else { "" }
                );
            }
        }
    }
    if let Some(wanted) = only
        && loader.get_sheet(wanted).is_none()
    {
        warn!("Sheet '{}' is not configured", wanted);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn play(config: &LoaderConfig, sheet: &str, anim: Arc<AnimationConfig>, seconds: f32) -> ExitCode {
    if config.sheet(sheet).is_none() {
        warn!("Sheet '{}' is not configured; frames will stay unresolved", sheet);
    }

    let mut world = World::new();
    world.insert_resource(WorldTime::default());
    world.insert_resource(AnimationScheduler::new());
    world.add_observer(release_animation_on_remove);
    start_background_loading(&mut world, config.build_loader());

    let finished = Arc::new(AtomicBool::new(false));
    let name = anim.name.clone();
    let entity = spawn_animated_sprite(
        &mut world,
        sheet,
        anim,
        Some(Box::new(move |frame: &str| info!("{}: {}", name, frame))),
        true,
    );
    if let Some(handle) = world
        .get::<Animated>(entity)
        .map(|animated| animated.handle)
    {
        let flag = finished.clone();
        world
            .resource_mut::<AnimationScheduler>()
            .set_on_finished(
                handle,
                Box::new(move |id: AnimationId| {
                    info!("{} finished", id);
                    flag.store(true, Ordering::Relaxed);
                }),
            );
    }

    let mut update = Schedule::default();
    update.add_systems(
        (
            poll_load_messages,
            update_load_messages,
            apply_load_messages,
            finish_background_loading,
            animation_scheduler_system,
            sync_sprite_frames,
        )
            .chain(),
    );

    let period = Duration::from_secs_f64(1.0 / config.target_fps.max(1) as f64);
    let mut last = Instant::now();
    let mut resolved = None;

    // --------------- Main loop ---------------
    while world.resource::<WorldTime>().elapsed < seconds && !finished.load(Ordering::Relaxed) {
        let now = Instant::now();
        update_world_time(&mut world, now.duration_since(last).as_secs_f32());
        last = now;

        update.run(&mut world);
        world.clear_trackers();

        if world.resource::<LoadState>().failed {
            error!("Sprite loading failed, stopping playback");
            break;
        }
        let frame = world.get::<Sprite>(entity).and_then(|s| s.frame);
        if frame.is_some() && frame != resolved {
            if let (Some(f), Some(s)) = (frame, world.get::<Sprite>(entity)) {
                info!(
                    "'{}' -> x={} y={} w={} h={}",
                    s.frame_name, f.x, f.y, f.width, f.height
                );
            }
            resolved = frame;
        }

        if let Some(rest) = period.checked_sub(now.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let failed = world.resource::<LoadState>().failed;
    world.despawn(entity);
    abandon_background_loading(&mut world);
    world.resource_mut::<AnimationScheduler>().shutdown();
    info!(
        "Played {} pulses, {} instance(s) left",
        world.resource::<WorldTime>().frame_count,
        world.resource::<AnimationScheduler>().len()
    );

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
