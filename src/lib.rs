pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod instrument;
pub mod lexer;
pub mod parser;
pub mod playback;
pub mod presets;
pub mod render;
pub mod synth;
pub mod timeline;
pub mod wav;

pub use ast::*;
pub use error::*;
pub use instrument::{InstrumentConfig, SynthKind};
pub use parser::{parse, parse_with_diagnostics};
pub use timeline::Timeline;

use render::RenderSettings;
use synth::SynthEngine;

/// Render a score to a complete WAV file with the built-in synthesizer.
/// This is the main offline entry point for the library.
pub fn render_score_to_wav(
    source: &str,
    config: &InstrumentConfig,
    volume: f64,
) -> Result<Vec<u8>, PlayerError> {
    let score = parse(source);
    let mut engine = SynthEngine::new();
    let buffer = render::render_to_buffer(
        &mut engine,
        &score,
        config,
        volume,
        &RenderSettings::default(),
    )?;
    Ok(wav::encode(&buffer))
}

/// Parse a score and lay it out in time with the default timing.
pub fn schedule(source: &str) -> Timeline {
    timeline::build(&parse(source).events, timeline::BASE_TIME_UNIT_SECONDS)
}
