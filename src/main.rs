use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};

use soundpool::audio_system::{PlaybackRequest, SimulatedBackend, SoundEngine, SoundLibrary, VoiceBackend};
use soundpool::config::AudioConfig;
use soundpool::error::AppResult;
use soundpool::messaging::{EventBus, SoundEvent};
use soundpool::utils::{FrameTicker, TickStats};

const LOG_TARGET_STARTUP: &str = "soundpool::startup";

/// Default run length: five seconds at 60 ticks per second
const DEFAULT_TICKS: u64 = 300;

/// Initialize tracing with file rotation
///
/// Logs are written to:
/// - macOS: ~/Library/Application Support/SoundPool/logs/
/// - Windows: %APPDATA%/SoundPool/logs/
/// - Linux: ~/.config/SoundPool/logs/
///
/// Log output:
/// - Debug builds: Console + File
/// - Release builds: File only
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("SoundPool").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "soundpool.log");

    // Configure filter (info level by default)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

struct Args {
    config_path: Option<PathBuf>,
    ticks: u64,
    device: bool,
}

fn parse_args() -> AppResult<Args> {
    let mut args = Args {
        config_path: None,
        ticks: DEFAULT_TICKS,
        device: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--ticks" => {
                let value = iter.next().context("--ticks needs a value")?;
                args.ticks = value
                    .parse()
                    .with_context(|| format!("Invalid tick count: {}", value))?;
            }
            "--device" => args.device = true,
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            path => args.config_path = Some(PathBuf::from(path)),
        }
    }
    Ok(args)
}

fn main() -> AppResult<()> {
    initialize_tracing();

    let args = parse_args()?;
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting soundpool-demo v{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    let config_path = args.config_path.clone().unwrap_or_else(AudioConfig::default_path);
    let config = AudioConfig::load_or_create(&config_path)
        .with_context(|| format!("Failed to prepare configuration at {}", config_path.display()))?;
    let library = SoundLibrary::from_definitions(&config.sounds);
    tracing::info!(target: LOG_TARGET_STARTUP, "{} sounds configured", library.len());

    if args.device {
        run_on_device(&config, &library, args.ticks)
    } else {
        let backend = SimulatedBackend::new();
        run_demo(&config, &library, backend, args.ticks)
    }
}

#[cfg(feature = "playback")]
fn run_on_device(config: &AudioConfig, library: &SoundLibrary, ticks: u64) -> AppResult<()> {
    let backend = soundpool::audio_system::RodioBackend::new(&config.assets)
        .context("Failed to open audio output")?;
    run_demo(config, library, backend, ticks)
}

#[cfg(not(feature = "playback"))]
fn run_on_device(_config: &AudioConfig, _library: &SoundLibrary, _ticks: u64) -> AppResult<()> {
    bail!("--device requires building with `--features playback`")
}

/// Drive the engine for `ticks` frames: looping music, a footstep every
/// frame (exercising the frequent-sound cap) and coins requested from a
/// second thread.
fn run_demo<B: VoiceBackend>(
    config: &AudioConfig,
    library: &SoundLibrary,
    backend: B,
    ticks: u64,
) -> AppResult<()> {
    let bus = EventBus::new();
    let (events, _subscription) = bus.subscribe();
    let mut engine = SoundEngine::new(config, backend).with_event_bus(bus);

    let observer = thread::spawn(move || {
        let mut seen = 0usize;
        for event in events.iter() {
            seen += 1;
            tracing::debug!("Event: {}", event.description());
            if matches!(event, SoundEvent::Shutdown) {
                break;
            }
        }
        seen
    });

    if let Some(music) = library.get("music") {
        let outcome = engine.create_sound().with_sound(music).prepare();
        tracing::info!("Music: {}", outcome);
    }

    let coin = library.get("coin_collected");
    let remote = engine.remote();
    let producer = thread::spawn(move || {
        let Some(coin) = coin else {
            return;
        };
        let mut x = 0.0;
        while remote.play(PlaybackRequest {
            position: Some([x, 0.0, 0.0]),
            ..PlaybackRequest::new(coin.clone())
        }) {
            x = (x + 1.0) % 10.0;
            thread::sleep(Duration::from_millis(250));
        }
    });

    let footsteps = library.get("player_footsteps");
    let mut ticker = FrameTicker::new(config.tick_rate_hz);
    let mut timings = TickStats::with_capacity(ticks as usize);

    for frame in 0..ticks {
        ticker.wait();
        let started = Instant::now();

        if let Some(step) = &footsteps {
            engine
                .create_sound()
                .with_sound(step.clone())
                .with_position([(frame % 20) as f32, 0.0, 1.0])
                .with_random_pitch(true, config.pitch_range)
                .play();
        }
        engine.tick();

        timings.add(started.elapsed());
    }

    let stats = engine.stats();
    let active = engine.active_count();
    let constructed = engine.constructed();
    engine.shutdown();
    drop(engine);

    if producer.join().is_err() {
        tracing::warn!("Producer thread panicked");
    }
    let observed = observer.join().unwrap_or(0);

    tracing::info!(
        "Played {}, evicted {}, completed {}, denied {} (admission) / {} (pool)",
        stats.played,
        stats.evictions,
        stats.completed,
        stats.denied_admission,
        stats.denied_pool
    );
    tracing::info!(
        "{} emitters constructed, {} active at shutdown, {} events observed",
        constructed,
        active,
        observed
    );
    timings.log_report();

    Ok(())
}
