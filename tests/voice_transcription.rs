//! Integration tests for voice transcription.
//!
//! These tests require:
//! 1. A Whisper model file (ggml-base.bin recommended for tests)
//! 2. ffmpeg installed for audio conversion
//!
//! Run with: cargo test --features integ_test --test voice_transcription

#[cfg(feature = "integ_test")]
mod tests {
    use std::path::PathBuf;
    use vozbot::bot::whisper::Transcriber;

    /// Path to test Whisper model (set via env var or default location)
    fn get_test_model_path() -> PathBuf {
        std::env::var("WHISPER_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/test/ggml-base.bin"))
    }

    /// Path to test audio files
    fn get_test_audio_dir() -> PathBuf {
        PathBuf::from("data/test/audio")
    }

    /// Test that the Whisper model loads successfully.
    #[test]
    fn test_transcriber_loads() {
        let model_path = get_test_model_path();
        if !model_path.exists() {
            eprintln!("Skipping test: model not found at {:?}", model_path);
            eprintln!("Download from: https://huggingface.co/ggerganov/whisper.cpp/tree/main");
            return;
        }

        let transcriber = Transcriber::new(&model_path);
        assert!(transcriber.is_ok(), "Failed to load Whisper: {:?}", transcriber.err());
    }

    /// Test transcription of a simple audio file.
    ///
    /// Requires a test audio file at data/test/audio/ola.ogg containing
    /// someone saying "olá" or similar.
    #[test]
    fn test_transcribe_greeting() {
        let model_path = get_test_model_path();
        if !model_path.exists() {
            eprintln!("Skipping test: model not found");
            return;
        }

        let audio_path = get_test_audio_dir().join("ola.ogg");
        if !audio_path.exists() {
            eprintln!("Skipping test: test audio not found at {:?}", audio_path);
            eprintln!("Create a short voice recording saying 'olá' and save as ola.ogg");
            return;
        }

        let transcriber = Transcriber::new(&model_path).expect("Failed to load model");
        let audio_data = std::fs::read(&audio_path).expect("Failed to read audio file");

        let result = transcriber.transcribe(&audio_data, "pt");
        assert!(result.is_ok(), "Transcription failed: {:?}", result.err());

        let text = result.unwrap().to_lowercase();
        println!("Transcribed: {}", text);
        assert!(!text.is_empty(), "Transcription should not be empty");
    }

    /// Silence (or noise) must surface as an error, not an empty answer.
    #[test]
    fn test_unintelligible_audio_is_an_error() {
        let model_path = get_test_model_path();
        if !model_path.exists() {
            eprintln!("Skipping test: model not found");
            return;
        }

        let audio_path = get_test_audio_dir().join("silence.ogg");
        if !audio_path.exists() {
            eprintln!("Skipping test: audio not found at {:?}", audio_path);
            return;
        }

        let transcriber = Transcriber::new(&model_path).expect("Failed to load model");
        let audio_data = std::fs::read(&audio_path).expect("Failed to read test audio");

        let result = transcriber.transcribe(&audio_data, "pt");
        assert!(result.is_err(), "Silence should not transcribe to text");
    }
}
