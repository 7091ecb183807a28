use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::{
    auth::CurrentUser,
    db::{NewTranscript, Transcript},
    error::{ApiError, ApiResult, bad_request_error, internal_error, not_found_error, repository_error, service_unavailable_error},
    pdf::{MetaItem, content_type_for},
    service::AppState,
    transcript::{assign_speakers, normalize_speakers, preview, render_lines},
};

pub const DEFAULT_TRANSCRIPT_TITLE: &str = "Live Meeting";
const DEFAULT_AUDIO_NAME: &str = "meeting.webm";

#[derive(Debug, Serialize)]
pub struct TranscriptEntry {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub preview: String,
    pub file_url: String,
}

fn download_url(id: i64) -> String {
    format!("/v1/transcripts/{}/download", id)
}

struct Upload {
    title: String,
    filename: String,
    audio: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut title = None;
    let mut audio = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("audio") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|f| !f.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_AUDIO_NAME.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request_error(&format!("Failed to read audio: {}", e)))?;
                audio = Some((filename, bytes.to_vec()));
            }
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request_error(&format!("Failed to read title: {}", e)))?;
                title = Some(text);
            }
            _ => {}
        }
    }

    let (filename, audio) = audio
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| bad_request_error("No audio file provided"))?;
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TRANSCRIPT_TITLE.to_string());

    Ok(Upload { title, filename, audio })
}

pub async fn transcribe(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> ApiResult<Value> {
    let speech = state
        .speech
        .clone()
        .ok_or_else(|| service_unavailable_error("Transcription is not configured"))?;
    let upload = read_upload(multipart).await?;

    info!(user_id = current.id(), bytes = upload.audio.len(), title = %upload.title, "Transcribing upload");
    let transcription = speech.transcribe(upload.audio, &upload.filename).await.map_err(|e| {
        error!(user_id = current.id(), error = %e, "Transcription failed");
        internal_error("Transcription failed", &e.to_string())
    })?;

    // No diarization backend: every segment starts as the default speaker.
    let mut labeled = assign_speakers(&transcription.segments, &[]);
    let speakers = normalize_speakers(&mut labeled);
    let text = render_lines(&labeled);

    let dir = state
        .config
        .upload_dir
        .join("transcripts")
        .join(current.id().to_string());
    let meta = [
        MetaItem::new("Model", transcription.model.clone()),
        MetaItem::new("Speakers", speakers.to_string()),
    ];
    let path = state
        .pdf
        .write_transcript(&dir, &upload.title, &text, &meta)
        .await
        .map_err(|e| {
            error!(user_id = current.id(), error = %e, "Transcript export failed");
            internal_error("Failed to export transcript", &e.to_string())
        })?;

    let transcript = state
        .transcripts
        .create(NewTranscript {
            user_id: current.id(),
            chat_id: None,
            title: upload.title.clone(),
            text,
            file_path: Some(path.to_string_lossy().to_string()),
            speakers_count: Some(speakers as i64),
            language: transcription.language,
        })
        .await
        .map_err(|e| repository_error("Failed to save transcript", e))?;

    info!(user_id = current.id(), transcript_id = transcript.id, speakers, "Transcript saved");
    Ok(Json(json!({
        "success": true,
        "transcript_id": transcript.id,
        "title": transcript.title,
        "file_url": download_url(transcript.id),
        "speakers": speakers
    })))
}

pub async fn list(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<TranscriptEntry>> {
    let transcripts = state
        .transcripts
        .list_for_user(current.id())
        .await
        .map_err(|e| repository_error("Failed to list transcripts", e))?;

    Ok(Json(
        transcripts
            .into_iter()
            .map(|t| TranscriptEntry {
                id: t.id,
                preview: preview(&t.text),
                file_url: download_url(t.id),
                title: t.title,
                created_at: t.created_at,
            })
            .collect(),
    ))
}

async fn owned_transcript(state: &AppState, id: i64, user_id: i64) -> Result<Transcript, ApiError> {
    state
        .transcripts
        .find_for_user(id, user_id)
        .await
        .map_err(|e| repository_error("Failed to load transcript", e))?
        .ok_or_else(|| not_found_error("Not found"))
}

pub async fn download(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(transcript_id): Path<i64>,
) -> Result<Response, ApiError> {
    let transcript = owned_transcript(&state, transcript_id, current.id()).await?;
    let file_path = transcript.file_path.ok_or_else(|| not_found_error("Not found"))?;
    let path = FsPath::new(&file_path);

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        warn!(transcript_id, path = %file_path, error = %e, "Transcript file unavailable");
        not_found_error("Not found")
    })?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("transcript_{}", transcript_id));

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(path).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.replace('"', "")),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(transcript_id): Path<i64>,
) -> ApiResult<Value> {
    let transcript = owned_transcript(&state, transcript_id, current.id()).await?;

    if let Some(file_path) = &transcript.file_path {
        if let Err(e) = tokio::fs::remove_file(file_path).await {
            warn!(transcript_id, path = %file_path, error = %e, "Failed to delete transcript file");
        }
    }

    state
        .transcripts
        .delete(transcript.id, current.id())
        .await
        .map_err(|e| repository_error("Failed to delete transcript", e))?;

    info!(user_id = current.id(), transcript_id, "Transcript deleted");
    Ok(Json(json!({ "success": true })))
}
