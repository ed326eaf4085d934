//! YouTube caption source implementation.
//!
//! Caption tracks are discovered through `yt-dlp --dump-json` and fetched
//! over HTTP in the `json3` timedtext format. No audio or video data is
//! ever downloaded.

use super::{LanguageInfo, Transcript, TranscriptOutcome, TranscriptSnippet, TranscriptSource};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Timeout for a yt-dlp metadata probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for fetching a single caption track.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// YouTube transcript source.
pub struct YoutubeTranscriptSource {
    http: reqwest::Client,
    video_id_regex: Regex,
}

/// One caption format entry as listed by yt-dlp.
#[derive(Debug, Clone, Deserialize)]
struct TrackFormat {
    url: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Caption-related fields of a yt-dlp metadata dump.
///
/// `BTreeMap` keys make "first available" a deterministic, lexicographic
/// choice rather than whatever order the provider happened to emit.
#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    subtitles: BTreeMap<String, Vec<TrackFormat>>,
    #[serde(default)]
    automatic_captions: BTreeMap<String, Vec<TrackFormat>>,
}

/// All caption tracks offered for a video, manual tracks first.
#[derive(Debug, Default)]
struct CaptionCatalog {
    tracks: Vec<CatalogTrack>,
}

#[derive(Debug, Clone)]
struct CatalogTrack {
    language_code: String,
    language_name: Option<String>,
    is_generated: bool,
    formats: Vec<TrackFormat>,
}

impl CaptionCatalog {
    fn from_info(info: VideoInfo) -> Self {
        let mut tracks = Vec::new();

        for (code, formats) in info.subtitles {
            if formats.is_empty() {
                continue;
            }
            tracks.push(CatalogTrack {
                language_name: formats.iter().find_map(|f| f.name.clone()),
                language_code: code,
                is_generated: false,
                formats,
            });
        }

        for (code, formats) in original_auto_tracks(info.automatic_captions) {
            if formats.is_empty() {
                continue;
            }
            tracks.push(CatalogTrack {
                language_name: formats.iter().find_map(|f| f.name.clone()),
                language_code: code,
                is_generated: true,
                formats,
            });
        }

        Self { tracks }
    }

    fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Reduce yt-dlp's `automatic_captions` map to the tracks that were actually
/// spoken in the video. Recent yt-dlp lists every translation target there;
/// the real auto tracks carry an `-orig` suffix. Older output lists only the
/// spoken language, with plain codes.
fn original_auto_tracks(
    auto: BTreeMap<String, Vec<TrackFormat>>,
) -> BTreeMap<String, Vec<TrackFormat>> {
    let has_orig = auto.keys().any(|k| k.ends_with("-orig"));
    if !has_orig {
        return auto;
    }

    auto.into_iter()
        .filter(|(code, _)| code.ends_with("-orig"))
        .map(|(code, formats)| (code.trim_end_matches("-orig").to_string(), formats))
        .collect()
}

/// Pick the caption track to fetch: English first (manual over generated),
/// then the first available track in catalog order.
fn select_track(catalog: &CaptionCatalog) -> Option<&CatalogTrack> {
    let english = |t: &&CatalogTrack| super::is_english(&t.language_code);

    catalog
        .tracks
        .iter()
        .filter(|t| !t.is_generated)
        .find(english)
        .or_else(|| catalog.tracks.iter().filter(|t| t.is_generated).find(english))
        .or_else(|| catalog.tracks.iter().find(|t| !t.is_generated))
        .or_else(|| catalog.tracks.first())
}

/// Resolve the URL to fetch a track in the json3 format.
fn caption_url(track: &CatalogTrack) -> Result<String> {
    if let Some(format) = track
        .formats
        .iter()
        .find(|f| f.ext.as_deref() == Some("json3"))
    {
        return Ok(format.url.clone());
    }

    // No json3 entry listed; rewrite the fmt parameter on the first format.
    let first = track.formats.first().ok_or_else(|| {
        SvarError::Transcript(format!(
            "Caption track '{}' has no fetchable formats",
            track.language_code
        ))
    })?;

    let mut url = url::Url::parse(&first.url)
        .map_err(|e| SvarError::Transcript(format!("Invalid caption URL: {}", e)))?;

    let params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(params)
        .append_pair("fmt", "json3");

    Ok(url.into())
}

// json3 timedtext payload: a flat list of caption events, each holding
// UTF-8 segments.

#[derive(Debug, Deserialize)]
struct Json3Body {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    t_start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a json3 timedtext body into ordered snippets.
fn parse_json3(body: &str) -> Result<Vec<TranscriptSnippet>> {
    let parsed: Json3Body = serde_json::from_str(body)?;

    let mut snippets = Vec::with_capacity(parsed.events.len());
    for event in parsed.events {
        let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        snippets.push(TranscriptSnippet {
            text: text.to_string(),
            start_seconds: event.t_start_ms as f64 / 1000.0,
            duration_seconds: event.d_duration_ms as f64 / 1000.0,
        });
    }

    Ok(snippets)
}

impl YoutubeTranscriptSource {
    pub fn new() -> Self {
        // Matches various YouTube URL formats and bare video IDs
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                # Full YouTube URLs
                (?:https?://)?
                (?:www\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex");

        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            video_id_regex,
        }
    }

    /// Extract a video ID from a YouTube URL or bare ID.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let caps = self.video_id_regex.captures(input.trim())?;

        // Try group 1 (URL format) then group 2 (bare ID)
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }

    /// Inspect a video's caption tracks with yt-dlp.
    ///
    /// `Ok(None)` means the video itself could not be inspected (deleted,
    /// private, region-locked); an empty catalog means the video exists but
    /// offers no captions. Both end as `NotAvailable` for acquisition.
    async fn probe(&self, video_id: &str) -> Result<Option<CaptionCatalog>> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let mut command = tokio::process::Command::new("yt-dlp");
        command.args([
            "--dump-json",
            "--no-download",
            "--no-warnings",
            "--ignore-errors",
            &url,
        ]);

        let output = tokio::time::timeout(PROBE_TIMEOUT, command.output())
            .await
            .map_err(|_| SvarError::ToolFailed("yt-dlp timed out".to_string()))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SvarError::ToolNotFound("yt-dlp".to_string())
                } else {
                    SvarError::Transcript(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "yt-dlp could not inspect video {}: {}",
                video_id,
                stderr.lines().next().unwrap_or("unknown error")
            );
            return Ok(None);
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        let info: VideoInfo = serde_json::from_str(&json_str)
            .map_err(|e| SvarError::Transcript(format!("Failed to parse yt-dlp output: {}", e)))?;

        Ok(Some(CaptionCatalog::from_info(info)))
    }

    /// Download and parse one caption track.
    async fn fetch_track(&self, track: &CatalogTrack) -> Result<Vec<TranscriptSnippet>> {
        let url = caption_url(track)?;
        debug!("Fetching caption track '{}'", track.language_code);

        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_json3(&body)
    }
}

impl Default for YoutubeTranscriptSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    #[instrument(skip(self))]
    async fn acquire(&self, video_id: &str) -> Result<TranscriptOutcome> {
        let video_id = self.extract_video_id(video_id).ok_or_else(|| {
            SvarError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", video_id))
        })?;

        let catalog = match self.probe(&video_id).await? {
            Some(catalog) => catalog,
            None => {
                return Ok(TranscriptOutcome::NotAvailable(
                    "Video is unavailable or inaccessible".to_string(),
                ))
            }
        };

        let track = match select_track(&catalog) {
            Some(track) => track,
            None => {
                return Ok(TranscriptOutcome::NotAvailable(
                    "Captions are disabled or no caption track exists for this video".to_string(),
                ))
            }
        };

        let snippets = self.fetch_track(track).await?;
        if snippets.is_empty() {
            return Ok(TranscriptOutcome::NotAvailable(format!(
                "Caption track '{}' is empty",
                track.language_code
            )));
        }

        debug!(
            "Acquired {} snippets in '{}' (generated: {})",
            snippets.len(),
            track.language_code,
            track.is_generated
        );

        Ok(TranscriptOutcome::Found(Transcript {
            video_id,
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            // Translation runs through the chat model, which accepts any
            // source language.
            is_translatable: true,
            snippets,
        }))
    }

    #[instrument(skip(self))]
    async fn list_languages(&self, video_id: &str) -> Result<Option<Vec<LanguageInfo>>> {
        let video_id = self.extract_video_id(video_id).ok_or_else(|| {
            SvarError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", video_id))
        })?;

        let catalog = match self.probe(&video_id).await? {
            Some(catalog) if !catalog.is_empty() => catalog,
            _ => return Ok(None),
        };

        Ok(Some(
            catalog
                .tracks
                .iter()
                .map(|t| LanguageInfo {
                    language_code: t.language_code.clone(),
                    language_name: t.language_name.clone(),
                    is_generated: t.is_generated,
                    is_translatable: true,
                })
                .collect(),
        ))
    }
}
