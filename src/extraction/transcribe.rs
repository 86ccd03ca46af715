//! Audio transcription via the external `whisperx` CLI.
//!
//! The tool writes a diarized JSON transcript into the output directory;
//! per-word alignment data is stripped before the transcript is stored or
//! sent to the summarizer.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

use super::ExtractionError;

/// Transcribe an audio file and return the cleaned transcript JSON.
///
/// Blocking: callers on the async runtime wrap this in `spawn_blocking`.
pub fn transcribe_audio(
    transcriber: &str,
    file_path: &Path,
    output_dir: &Path,
) -> Result<Value, ExtractionError> {
    std::fs::create_dir_all(output_dir)?;

    let output = Command::new(transcriber)
        .arg(file_path)
        .args(["--model", "medium"])
        .arg("--output_dir")
        .arg(output_dir)
        .args(["--output_format", "json"])
        .arg("--diarize")
        .args(["--language", "en"])
        .args(["--compute_type", "int8"])
        .args(["--diarize_model", "pyannote/speaker-diarization-3.0"])
        .args(["--max_speakers", "2"])
        .output()?;

    if !output.status.success() {
        return Err(ExtractionError::TranscriberFailed {
            command: transcriber.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    // The tool names its output after the input file's stem
    let stem = file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let json_path = output_dir.join(format!("{stem}.json"));
    if !json_path.exists() {
        return Err(ExtractionError::TranscriptMissing(json_path.display().to_string()));
    }

    let raw = std::fs::read_to_string(&json_path)?;
    let mut transcript: Value = serde_json::from_str(&raw)?;
    clean_transcript(&mut transcript);

    // Overwrite with the cleaned version so stored transcripts stay small
    std::fs::write(&json_path, serde_json::to_string_pretty(&transcript)?)?;

    tracing::info!(path = %json_path.display(), "Transcription completed");
    Ok(transcript)
}

/// Strip per-word alignment: `words` from each segment and the top-level
/// `word_segments` field.
pub fn clean_transcript(transcript: &mut Value) {
    if let Some(segments) = transcript.get_mut("segments").and_then(|s| s.as_array_mut()) {
        for segment in segments {
            if let Some(obj) = segment.as_object_mut() {
                obj.remove("words");
            }
        }
    }
    if let Some(obj) = transcript.as_object_mut() {
        obj.remove("word_segments");
    }
}
