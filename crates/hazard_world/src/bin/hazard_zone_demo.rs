use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hazard_world::{
    Cuboid, ExposureCapabilities, ExposureEngine, HazardConfig, InMemoryAttachmentStore,
    InMemoryEntityDirectory, InMemoryIndicatorService, InMemoryPermissions, InMemoryZoneMap,
    MessageSink, RecordingEffectApplier, WorldPos, ZoneRegion,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_WORLD: &str = "overworld";
const DEFAULT_DEMO_SECONDS: u64 = 30;
const REALTIME_STEP_MS: u64 = 100;
const ZONE_SPACING: f64 = 40.0;
const ZONE_WIDTH: f64 = 20.0;
const WALKER_STEP: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Eq)]
struct DemoOptions {
    config_path: Option<PathBuf>,
    seconds: u64,
    realtime: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if matches!(args.first().map(String::as_str), Some("--help") | Some("-h")) {
        print_usage();
        return;
    }
    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            process::exit(2);
        }
    };
    if let Err(err) = run(options) {
        eprintln!("hazard_zone_demo failed: {err}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("Usage: hazard_zone_demo [config.toml] [--seconds N] [--realtime]");
    println!("Without a config path, hazard.toml in the working directory or the built-in defaults are used.");
}

fn parse_options(args: &[String]) -> Result<DemoOptions, String> {
    let mut options = DemoOptions {
        config_path: None,
        seconds: DEFAULT_DEMO_SECONDS,
        realtime: false,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--realtime" => options.realtime = true,
            "--seconds" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--seconds requires a value".to_string())?;
                options.seconds = value
                    .parse::<u64>()
                    .map_err(|_| format!("invalid --seconds value: {value}"))?;
            }
            other if other.starts_with("--") => return Err(format!("unknown option: {other}")),
            path => {
                if options.config_path.is_some() {
                    return Err(format!("unexpected argument: {path}"));
                }
                options.config_path = Some(PathBuf::from(path));
            }
        }
    }
    Ok(options)
}

/// Logs broadcasts instead of delivering them to viewers.
struct LogMessageSink;

impl MessageSink for LogMessageSink {
    fn broadcast(&self, about: &str, message: &str) {
        info!(about, message, "broadcast");
    }
}

struct DemoWorld {
    engine: ExposureEngine,
    directory: InMemoryEntityDirectory,
    effects: RecordingEffectApplier,
    walker_x: f64,
    walker_limit: f64,
}

impl DemoWorld {
    fn new(config: &HazardConfig) -> Result<Self, String> {
        let directory = InMemoryEntityDirectory::new();
        let zone_map = InMemoryZoneMap::new();
        for (index, zone) in config.zones.iter().enumerate() {
            let from_x = index as f64 * ZONE_SPACING;
            zone_map.add_region(ZoneRegion::hazard(
                format!("region-{}", zone.id),
                DEMO_WORLD,
                Cuboid::new(
                    WorldPos::new(from_x, 0.0, 0.0),
                    WorldPos::new(from_x + ZONE_WIDTH, 256.0, ZONE_WIDTH),
                ),
                Some(zone.id.as_str()),
            ));
        }
        let effects = RecordingEffectApplier::new();
        let capabilities = ExposureCapabilities {
            directory: Arc::new(directory.clone()),
            effects: Arc::new(effects.clone()),
            indicators: Arc::new(InMemoryIndicatorService::new()),
            messages: Arc::new(LogMessageSink),
            store: Arc::new(InMemoryAttachmentStore::new()),
        };
        let engine = ExposureEngine::from_config(
            config,
            capabilities,
            Arc::new(zone_map),
            Arc::new(InMemoryPermissions::new()),
        )
        .map_err(|err| err.to_string())?;
        Ok(Self {
            engine,
            directory,
            effects,
            walker_x: -WALKER_STEP,
            walker_limit: config.zones.len() as f64 * ZONE_SPACING,
        })
    }

    /// Places an unprotected entity and a protected one in the first zone,
    /// and a walker that crosses every zone.
    fn populate(&mut self, config: &HazardConfig) -> Result<(), String> {
        let inside = WorldPos::new(ZONE_WIDTH / 2.0, 64.0, ZONE_WIDTH / 2.0);
        for (entity_id, name) in [("e-1", "Ash"), ("e-2", "Birch"), ("e-3", "Cedar")] {
            self.directory.place(entity_id, DEMO_WORLD, inside);
            self.directory.set_display_name(entity_id, name);
            self.engine.connect(entity_id);
        }
        self.directory
            .place("e-3", DEMO_WORLD, WorldPos::new(self.walker_x, 64.0, ZONE_WIDTH / 2.0));

        if let Some(item) = config.mitigation_items.first() {
            self.engine
                .ledger()
                .append("e-2", item.effect())
                .map_err(|err| err.to_string())?;
            if let Some(message) = item.drink_message("Birch") {
                info!(
                    entity_id = "e-2",
                    item = item.id.as_str(),
                    message = message.as_str(),
                    "mitigation granted"
                );
            }
        }
        Ok(())
    }

    fn step(&mut self, elapsed_ms: u64) {
        let report = self.engine.advance(elapsed_ms);
        for evaluation in &report.evaluations {
            for transition in &evaluation.transitions {
                info!(
                    tick = evaluation.tick,
                    entity_id = transition.entity_id.as_str(),
                    zone_id = transition.zone_id.as_str(),
                    from = transition.from.as_str(),
                    to = transition.to.as_str(),
                    "zone state changed"
                );
            }
            self.walk();
        }
        for decay in &report.decays {
            for expired in &decay.expired {
                info!(
                    entity_id = expired.entity_id.as_str(),
                    effect_id = expired.effect_id.as_str(),
                    "mitigation expired"
                );
            }
        }
    }

    fn walk(&mut self) {
        self.walker_x += WALKER_STEP;
        if self.walker_x > self.walker_limit {
            self.walker_x = 0.0;
        }
        self.directory.place(
            "e-3",
            DEMO_WORLD,
            WorldPos::new(self.walker_x, 64.0, ZONE_WIDTH / 2.0),
        );
    }
}

fn run(options: DemoOptions) -> Result<(), String> {
    let config = match &options.config_path {
        Some(path) => HazardConfig::from_config_file(path),
        None => HazardConfig::from_default_sources(),
    }
    .map_err(|err| err.to_string())?;
    info!(
        zones = config.zones.len(),
        items = config.mitigation_items.len(),
        seconds = options.seconds,
        realtime = options.realtime,
        "starting hazard zone demo"
    );

    let mut world = DemoWorld::new(&config)?;
    world.populate(&config)?;
    if options.realtime {
        run_realtime(&mut world, options.seconds)?;
    } else {
        let step_ms = config.engine.evaluation_interval_ms;
        let total_ms = options.seconds.saturating_mul(1_000);
        let mut simulated_ms = 0;
        while simulated_ms < total_ms {
            let elapsed_ms = step_ms.min(total_ms - simulated_ms);
            world.step(elapsed_ms);
            simulated_ms += elapsed_ms;
        }
    }

    let snapshot = world.engine.snapshot();
    let destroyed = world.engine.shutdown();
    info!(
        effects_applied = world.effects.applied().len(),
        destroyed, "demo finished"
    );
    let json = snapshot.to_json().map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

fn run_realtime(world: &mut DemoWorld, seconds: u64) -> Result<(), String> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || stop_flag.store(true, Ordering::SeqCst))
        .map_err(|err| format!("install ctrl-c handler failed: {err}"))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|err| format!("build tokio runtime failed: {err}"))?;
    runtime.block_on(async {
        let deadline = Duration::from_secs(seconds);
        let started = Instant::now();
        let mut last = started;
        let mut interval = tokio::time::interval(Duration::from_millis(REALTIME_STEP_MS));
        while !stop.load(Ordering::SeqCst) && started.elapsed() < deadline {
            interval.tick().await;
            let now = Instant::now();
            let elapsed_ms = u64::try_from(now.duration_since(last).as_millis()).unwrap_or(u64::MAX);
            if elapsed_ms > 0 {
                last = now;
                world.step(elapsed_ms);
            }
        }
    });
    if stop.load(Ordering::SeqCst) {
        info!("interrupted, shutting down");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn options_default_to_simulated_run() {
        let options = parse_options(&[]).expect("options");
        assert_eq!(options.seconds, DEFAULT_DEMO_SECONDS);
        assert!(!options.realtime);
        assert!(options.config_path.is_none());
    }

    #[test]
    fn options_parse_path_seconds_and_realtime() {
        let options =
            parse_options(&args(&["zones.toml", "--seconds", "5", "--realtime"])).expect("options");
        assert_eq!(options.config_path, Some(PathBuf::from("zones.toml")));
        assert_eq!(options.seconds, 5);
        assert!(options.realtime);
    }

    #[test]
    fn options_reject_bad_input() {
        assert!(parse_options(&args(&["--seconds"])).is_err());
        assert!(parse_options(&args(&["--seconds", "soon"])).is_err());
        assert!(parse_options(&args(&["--verbose"])).is_err());
        assert!(parse_options(&args(&["a.toml", "b.toml"])).is_err());
    }

    #[test]
    fn builtin_demo_runs_to_completion() {
        let config = HazardConfig::builtin().expect("builtin config");
        let mut world = DemoWorld::new(&config).expect("demo world");
        world.populate(&config).expect("populate");
        for _ in 0..5 {
            world.step(1_000);
        }
        let snapshot = world.engine.snapshot();
        assert_eq!(snapshot.evaluation_ticks, 5);
        let default_zone = &snapshot.zones[0];
        assert!(default_zone.affected.contains(&"e-1".to_string()));
        assert!(default_zone.warned.contains(&"e-2".to_string()));
    }
}
