//! Speech-to-text transcription using whisper-rs.
//!
//! Converts inbound voice messages (OGG Opus from Telegram) to text.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Whisper transcription engine.
pub struct Transcriber {
    ctx: Arc<WhisperContext>,
}

impl Transcriber {
    /// Load a Whisper model from a .bin file.
    pub fn new(model_path: &Path) -> Result<Self, String> {
        info!("Loading Whisper model from {:?}", model_path);

        if !model_path.exists() {
            return Err(format!("Model file not found: {:?}", model_path));
        }

        let ctx = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;

        info!("Whisper model loaded successfully");
        Ok(Self { ctx: Arc::new(ctx) })
    }

    /// Transcribe audio data (OGG Opus format from Telegram).
    ///
    /// Converts to 16KHz mono PCM using ffmpeg, then runs Whisper with the
    /// given language hint. An empty transcription means the audio was
    /// unintelligible and is reported as an error.
    pub fn transcribe(&self, ogg_data: &[u8], language: &str) -> Result<String, String> {
        debug!("Transcribing {} bytes of audio", ogg_data.len());

        let pcm_data = convert_ogg_to_pcm(ogg_data)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language));
        params.set_translate(false);
        params.set_no_timestamps(true);
        params.set_single_segment(false);

        state
            .full(params, &pcm_data)
            .map_err(|e| format!("Whisper transcription failed: {e}"))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            if let Ok(s) = segment.to_str() {
                text.push_str(s);
                text.push(' ');
            }
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err("Audio produced no transcription".to_string());
        }

        let preview: String = text.chars().take(100).collect();
        info!("Transcribed: \"{}\"", preview);
        Ok(text)
    }
}

/// Convert OGG Opus audio to 16KHz mono f32 PCM samples using ffmpeg.
///
/// The temporary input file is removed on every path before returning.
fn convert_ogg_to_pcm(ogg_data: &[u8]) -> Result<Vec<f32>, String> {
    // ffmpeg needs seekable input for OGG, so spill to a temp file
    let temp_dir = std::env::temp_dir();
    let input_path = temp_dir.join(format!("vozbot_voice_{}.ogg", std::process::id()));

    std::fs::write(&input_path, ogg_data)
        .map_err(|e| format!("Failed to write temp input: {e}"))?;

    // 16-bit signed little-endian, 16KHz, mono, to stdout
    let output = Command::new("ffmpeg")
        .args([
            "-i",
            input_path.to_str().unwrap_or_default(),
            "-ar",
            "16000",
            "-ac",
            "1",
            "-f",
            "s16le",
            "-acodec",
            "pcm_s16le",
            "-y",
            "pipe:1",
        ])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .output();

    let _ = std::fs::remove_file(&input_path);

    let output = output.map_err(|e| format!("Failed to run ffmpeg: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("ffmpeg failed: {}", stderr));
    }

    let samples: Vec<f32> = output
        .stdout
        .chunks_exact(2)
        .map(|chunk| {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            sample as f32 / 32768.0
        })
        .collect();

    debug!("Converted to {} f32 samples", samples.len());
    Ok(samples)
}
