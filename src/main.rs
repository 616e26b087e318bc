use jianpu::config::PlayerConfig;
use jianpu::engine::{OfflineSpec, SampleBuffer, SoundEngine, SoundProducer};
use jianpu::playback::{format_time, Player, PlayerEvent, PlayerState, SystemClock};
use jianpu::presets::{FileStore, PresetStore};
use jianpu::render::render_to_buffer;
use jianpu::synth::SynthEngine;
use jianpu::{parse_with_diagnostics, InstrumentConfig, PitchSpec, PlayerError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;

const USAGE: &str = "\
Usage: jianpu render <score> [output.wav]
       jianpu play <score>
       jianpu timeline <score>
       jianpu presets [presets.json]

Options:
  --instrument <name>   built-in instrument (piano, guitar, guzheng, flute,
                        violin, xylophone, synth)
  --volume <gain>       linear output gain
  --config <file.yaml>  player configuration";

const DEFAULT_PRESETS_FILE: &str = "presets.json";
const TICK: Duration = Duration::from_millis(10);

struct Options {
    command: String,
    positional: Vec<String>,
    instrument: Option<String>,
    volume: Option<f64>,
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut positional = Vec::new();
    let mut instrument = None;
    let mut volume = None;
    let mut config = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--instrument" => {
                instrument = Some(iter.next().ok_or("--instrument needs a value")?.clone());
            }
            "--volume" => {
                let value = iter.next().ok_or("--volume needs a value")?;
                volume = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("invalid volume '{}'", value))?,
                );
            }
            "--config" => {
                config = Some(PathBuf::from(iter.next().ok_or("--config needs a value")?));
            }
            "-h" | "--help" => return Err(String::new()),
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    if positional.is_empty() {
        return Err("missing command".to_string());
    }
    let command = positional.remove(0);
    Ok(Options {
        command,
        positional,
        instrument,
        volume,
        config,
    })
}

fn run(options: &Options) -> Result<(), PlayerError> {
    let config = match &options.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };
    let instrument = match &options.instrument {
        Some(name) => InstrumentConfig::builtin(name)
            .ok_or_else(|| PlayerError::Config(format!("unknown instrument '{}'", name)))?,
        None => config.instrument_config()?,
    };
    let volume = options.volume.unwrap_or(config.volume);

    match options.command.as_str() {
        "render" => {
            let input = score_path(options)?;
            let output = options
                .positional
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| input.with_extension("wav"));
            let (score, _) = parse_with_diagnostics(&read_score(&input)?);
            let mut engine = SynthEngine::new();
            let buffer = render_to_buffer(
                &mut engine,
                &score,
                &instrument,
                volume,
                &config.render_settings(),
            )?;
            jianpu::wav::write(&output, &buffer)?;
            eprintln!(
                "Wrote {} ({})",
                output.display(),
                format_time(buffer.duration_seconds())
            );
            Ok(())
        }
        "play" => {
            let source = read_score(&score_path(options)?)?;
            play(&source, instrument, volume, &config)
        }
        "timeline" => {
            let source = read_score(&score_path(options)?)?;
            let (score, diagnostics) = parse_with_diagnostics(&source);
            for diagnostic in &diagnostics {
                eprintln!("warning: {}", diagnostic);
            }
            let timeline = jianpu::timeline::build_with(&score.events, &config.timing());
            println!("{}", serde_json::to_string_pretty(&timeline)?);
            Ok(())
        }
        "presets" => {
            let path = options
                .positional
                .first()
                .map(String::as_str)
                .unwrap_or(DEFAULT_PRESETS_FILE);
            let store = FileStore::new(path);
            let presets = PresetStore::load(&store)?;
            if presets.is_empty() {
                eprintln!("No presets in {}", path);
            }
            for name in presets.names() {
                if let Some(preset) = presets.get(name) {
                    println!("{}\t{:?}", name, preset.synth_type);
                }
            }
            Ok(())
        }
        other => Err(PlayerError::Config(format!("unknown command '{}'", other))),
    }
}

fn score_path(options: &Options) -> Result<PathBuf, PlayerError> {
    options
        .positional
        .first()
        .map(PathBuf::from)
        .ok_or_else(|| PlayerError::Config("missing score file".to_string()))
}

fn read_score(path: &Path) -> Result<String, PlayerError> {
    fs::read_to_string(path).map_err(|e| {
        log::error!("cannot read '{}': {}", path.display(), e);
        PlayerError::Io(e)
    })
}

fn play(
    source: &str,
    instrument: InstrumentConfig,
    volume: f64,
    config: &PlayerConfig,
) -> Result<(), PlayerError> {
    let mut options = config.player_options();
    options.volume = volume;
    let mut player = Player::new(ConsoleEngine, SystemClock::new(), instrument, options);
    player.play(source)?;

    let total = player.session().map_or(0.0, |s| s.total_duration);
    while player.state() == PlayerState::Playing {
        for event in player.tick() {
            match event {
                PlayerEvent::Cue { cue, .. } => println!("{}", cue),
                PlayerEvent::Progress(progress) => log::debug!(
                    "{} / {} ({:.0}%)",
                    format_time(progress * total),
                    format_time(total),
                    progress * 100.0
                ),
                PlayerEvent::TriggerFailed { pitch, message } => {
                    eprintln!("skipped {}: {}", pitch, message)
                }
                PlayerEvent::Finished => eprintln!("Finished ({})", format_time(total)),
            }
        }
        thread::sleep(TICK);
    }
    Ok(())
}

/// Terminal stand-in for an audio device: every note is logged.
struct ConsoleEngine;

struct ConsoleProducer;

impl SoundProducer for ConsoleProducer {
    fn trigger_attack_release(
        &mut self,
        pitches: &[PitchSpec],
        length: f64,
        at_time: f64,
    ) -> Result<(), PlayerError> {
        for pitch in pitches {
            log::info!("{} {:.2}s @ {:.3}", pitch, length, at_time);
        }
        Ok(())
    }

    fn release_all(&mut self) {}

    fn set_volume(&mut self, gain: f64) {
        log::debug!("volume {:.2}", gain);
    }

    fn dispose(&mut self) {}
}

impl SoundEngine for ConsoleEngine {
    fn is_ready(&self) -> bool {
        true
    }

    fn request_activation(&mut self) -> Result<(), PlayerError> {
        Ok(())
    }

    fn create_producer(
        &mut self,
        config: &InstrumentConfig,
    ) -> Result<Box<dyn SoundProducer>, PlayerError> {
        log::info!("instrument: {:?}", config.synth_type);
        Ok(Box::new(ConsoleProducer))
    }

    fn enter_offline(&mut self, _spec: OfflineSpec) -> Result<(), PlayerError> {
        Err(PlayerError::Render(
            "the console engine cannot render".to_string(),
        ))
    }

    fn render_offline(&mut self) -> Result<SampleBuffer, PlayerError> {
        Err(PlayerError::Render(
            "the console engine cannot render".to_string(),
        ))
    }

    fn restore_realtime(&mut self) {}
}
