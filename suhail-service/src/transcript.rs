//! Meeting transcription: speech-to-text, speaker labelling and the text
//! layout stored with each transcript.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const OPENAI_TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_SPEAKER: &str = "Speaker 1";
pub const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("speech-to-text is not configured")]
    NotConfigured,
    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transcription service returned {status}: {body}")]
    Service { status: u16, body: String },
    #[error("unexpected transcription response: {0}")]
    Decode(String),
}

/// A span of recognized speech, in seconds from the start of the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A diarization turn: who spoke between `start` and `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerTurn {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub model: String,
    pub segments: Vec<Segment>,
    pub language: Option<String>,
    /// Whether the segments carry real timestamps
    pub timed: bool,
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<Transcription, TranscriptionError>;
}

pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Whisper models can return timestamped segments.
    fn verbose(&self) -> bool {
        self.model.contains("whisper")
    }
}

#[async_trait]
impl SpeechToText for OpenAiTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<Transcription, TranscriptionError> {
        let response_format = if self.verbose() { "verbose_json" } else { "json" };
        info!(model = %self.model, bytes = audio.len(), response_format, "Sending audio for transcription");

        let file = reqwest::multipart::Part::bytes(audio).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", response_format)
            .part("file", file);

        let response = self
            .client
            .post(OPENAI_TRANSCRIPTIONS_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Transcription request rejected");
            return Err(TranscriptionError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(segments_from_response(&self.model, &body, self.verbose()))
    }
}

/// Read segments from a `json` or `verbose_json` transcription body. Without
/// timed segments the whole text becomes one segment at zero.
pub fn segments_from_response(model: &str, body: &serde_json::Value, verbose: bool) -> Transcription {
    let language = body
        .get("language")
        .and_then(|l| l.as_str())
        .map(str::to_string);

    let timed: Option<Vec<Segment>> = verbose
        .then(|| body.get("segments").and_then(|s| s.as_array()))
        .flatten()
        .map(|segments| {
            segments
                .iter()
                .map(|s| Segment {
                    start: s.get("start").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    end: s.get("end").and_then(|v| v.as_f64()).unwrap_or(0.0),
                    text: s
                        .get("text")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                })
                .collect()
        });

    match timed {
        Some(segments) => Transcription {
            model: model.to_string(),
            segments,
            language,
            timed: true,
        },
        None => {
            let text = body
                .get("text")
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .trim()
                .to_string();
            Transcription {
                model: model.to_string(),
                segments: vec![Segment { start: 0.0, end: 0.0, text }],
                language,
                timed: false,
            }
        }
    }
}

fn overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

/// Label each segment with the turn it overlaps most. Segments with no
/// overlapping turn, or every segment when there are no turns, get `Speaker 1`.
pub fn assign_speakers(segments: &[Segment], turns: &[SpeakerTurn]) -> Vec<LabeledSegment> {
    segments
        .iter()
        .map(|segment| {
            let mut best: Option<&SpeakerTurn> = None;
            let mut best_overlap = 0.0;
            for turn in turns {
                let shared = overlap(segment.start, segment.end, turn.start, turn.end);
                if shared > best_overlap {
                    best_overlap = shared;
                    best = Some(turn);
                }
            }
            LabeledSegment {
                start: segment.start,
                end: segment.end,
                text: segment.text.clone(),
                speaker: best.map_or_else(|| DEFAULT_SPEAKER.to_string(), |t| t.speaker.clone()),
            }
        })
        .collect()
}

/// Rename speakers to `Speaker 1..N` in order of first appearance. Returns
/// the number of distinct speakers, at least one.
pub fn normalize_speakers(segments: &mut [LabeledSegment]) -> usize {
    let mut names: HashMap<String, String> = HashMap::new();
    for segment in segments.iter_mut() {
        let next = names.len() + 1;
        let label = names
            .entry(segment.speaker.clone())
            .or_insert_with(|| format!("Speaker {}", next))
            .clone();
        segment.speaker = label;
    }
    names.len().max(1)
}

pub fn hhmmss(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// `[HH:MM:SS–HH:MM:SS] Speaker N: text`, one line per segment.
pub fn render_lines(segments: &[LabeledSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{}–{}] {}: {}", hhmmss(s.start), hhmmss(s.end), s.speaker, s.text))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Title reduced to characters that are safe in a file name.
pub fn safe_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_end();
    if cleaned.is_empty() {
        "meeting".to_string()
    } else {
        cleaned.to_string()
    }
}

/// First 200 characters, with `...` when cut.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
