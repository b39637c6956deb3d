//! YouTube caption fetcher.
//!
//! Resolves the caption tracks of a video through the innertube player API and
//! downloads the chosen track as timed-text XML.

use super::{Transcript, TranscriptSegment, TranscriptSource};
use crate::config::TranscriptSettings;
use crate::error::{Result, TubechatError};
use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const CONSENT_FORM: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const BOT_CHECK_REASON: &str = "not a bot";
const UNAVAILABLE_REASON: &str = "This video is unavailable";
const PO_TOKEN_MARKER: &str = "&exp=xpe";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

static INNERTUBE_API_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("api key pattern is valid")
});
static CONSENT_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).expect("consent pattern is valid"));
static SELF_CLOSING_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<text\b[^>]*/>").expect("self-closing pattern is valid"));
static TEXT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<text\b([^>]*)>(.*?)</text>").expect("text element pattern is valid")
});
static START_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bstart="([^"]*)""#).expect("start pattern is valid"));
static DUR_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdur="([^"]*)""#).expect("dur pattern is valid"));
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("entity pattern is valid")
});

/// Fetches captions from YouTube.
pub struct YoutubeTranscriptFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl YoutubeTranscriptFetcher {
    /// Create a fetcher from transcript settings.
    pub fn new(settings: &TranscriptSettings) -> Result<Self> {
        let client = crate::openai::create_http_client(Duration::from_secs(settings.timeout_secs))?;
        Ok(Self::with_client(client, &settings.base_url))
    }

    /// Create a fetcher with a custom HTTP client and YouTube origin.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_video_html(&self, video_id: &str) -> Result<String> {
        let html = self.fetch_html(video_id, None).await?;
        if !html.contains(CONSENT_FORM) {
            return Ok(html);
        }

        debug!("Accepting cookie consent for {}", video_id);
        let consent = CONSENT_VALUE
            .captures(&html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                TubechatError::Transcript("failed to accept cookie consent".to_string())
            })?;

        let html = self
            .fetch_html(video_id, Some(&format!("CONSENT=YES+{}", consent)))
            .await?;
        if html.contains(CONSENT_FORM) {
            return Err(TubechatError::Transcript(
                "failed to accept cookie consent".to_string(),
            ));
        }
        Ok(html)
    }

    async fn fetch_html(&self, video_id: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = self
            .client
            .get(format!("{}/watch", self.base_url))
            .query(&[("v", video_id)])
            .header(ACCEPT_LANGUAGE, "en-US");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(TubechatError::RequestBlocked(video_id.to_string()));
        }
        Ok(response.error_for_status()?.text().await?)
    }

    async fn fetch_player(&self, video_id: &str, api_key: &str) -> Result<PlayerResponse> {
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(format!("{}/youtubei/v1/player", self.base_url))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(TubechatError::RequestBlocked(video_id.to_string()));
        }

        Ok(response.error_for_status()?.json().await?)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>> {
        if track.base_url.contains(PO_TOKEN_MARKER) {
            return Err(TubechatError::Transcript(
                "caption track requires a PO token".to_string(),
            ));
        }

        let url = strip_format_param(&track.base_url)?;
        let xml = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, "en-US")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_timed_text(&xml))
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptFetcher {
    #[instrument(skip(self, languages))]
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<Transcript> {
        let html = self.fetch_video_html(video_id).await?;
        let api_key = extract_api_key(&html, video_id)?;

        let player = self.fetch_player(video_id, &api_key).await?;
        check_playability(&player, video_id)?;

        let tracks = player
            .captions
            .and_then(|c| c.renderer)
            .map(|r| r.caption_tracks)
            .unwrap_or_default();
        if tracks.is_empty() {
            return Err(TubechatError::CaptionsDisabled(video_id.to_string()));
        }

        let track = select_track(&tracks, languages).ok_or_else(|| {
            TubechatError::NoTranscriptFound {
                video_id: video_id.to_string(),
                requested: languages.to_vec(),
                available: tracks.iter().map(CaptionTrack::describe).collect(),
            }
        })?;

        debug!(
            "Using {} caption track '{}'",
            if track.is_generated() { "generated" } else { "manual" },
            track.language_code
        );

        let segments = self.fetch_track(track).await?;
        Ok(Transcript::new(
            video_id.to_string(),
            track.language_code.clone(),
            track.is_generated(),
            segments,
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer", default)]
    renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn describe(&self) -> String {
        if self.is_generated() {
            format!("{} (generated)", self.language_code)
        } else {
            self.language_code.clone()
        }
    }
}

fn extract_api_key(html: &str, video_id: &str) -> Result<String> {
    if let Some(key) = INNERTUBE_API_KEY.captures(html).and_then(|c| c.get(1)) {
        return Ok(key.as_str().to_string());
    }
    if html.contains(RECAPTCHA_MARKER) {
        return Err(TubechatError::RequestBlocked(video_id.to_string()));
    }
    Err(TubechatError::Transcript(format!(
        "could not parse the watch page of video {}",
        video_id
    )))
}

fn check_playability(player: &PlayerResponse, video_id: &str) -> Result<()> {
    let Some(status) = &player.playability_status else {
        return Ok(());
    };
    if status.status == "OK" {
        return Ok(());
    }

    let reason = status.reason.clone().unwrap_or_default();
    match status.status.as_str() {
        "LOGIN_REQUIRED" if reason.contains(BOT_CHECK_REASON) => {
            Err(TubechatError::RequestBlocked(video_id.to_string()))
        }
        "ERROR" if reason == UNAVAILABLE_REASON => {
            Err(TubechatError::VideoUnavailable(video_id.to_string()))
        }
        other => Err(TubechatError::Transcript(format!(
            "video {} is unplayable ({}): {}",
            video_id, other, reason
        ))),
    }
}

/// Pick a track for the first matching language; manual tracks win over
/// generated ones for the same language.
fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|code| {
        let mut matching = tracks.iter().filter(|t| &t.language_code == code);
        let manual = matching.clone().find(|t| !t.is_generated());
        manual.or_else(|| matching.next())
    })
}

fn strip_format_param(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    Ok(url)
}

/// Parse YouTube timed-text XML into segments.
fn parse_timed_text(xml: &str) -> Vec<TranscriptSegment> {
    let xml = SELF_CLOSING_TEXT.replace_all(xml, "");

    TEXT_ELEMENT
        .captures_iter(&xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let raw = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

            // Entities are escaped once for XML and once more for HTML.
            let text = decode_entities(&decode_entities(raw));
            let text = MARKUP_TAG.replace_all(&text, "");
            let text = text.trim();
            if text.is_empty() {
                return None;
            }

            Some(TranscriptSegment::new(
                text,
                numeric_attr(&START_ATTR, attrs),
                numeric_attr(&DUR_ATTR, attrs),
            ))
        })
        .collect()
}

fn numeric_attr(pattern: &Regex, attrs: &str) -> f64 {
    pattern
        .captures(attrs)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => None,
                }
            };

            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WATCH_HTML: &str =
        r#"<html><script>ytcfg.set({"INNERTUBE_API_KEY": "test-key_123"});</script></html>"#;

    const TIMED_TEXT: &str = r##"<?xml version="1.0" encoding="utf-8" ?><transcript>
<text start="0.0" dur="1.5">Hey there</text>
<text start="1.5" dur="2.0">how &amp;amp; why</text>
<text start="3.5" dur="1.0"></text>
<text start="4.0" dur="1.0"/>
<text start="5.0" dur="2.25">it&amp;#39;s <font color="#fff">great</font></text>
</transcript>"##;

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.com/api/timedtext?lang={}", lang),
            language_code: lang.to_string(),
            kind: kind.map(String::from),
        }
    }

    fn languages(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    async fn mount_watch_page(server: &MockServer, video_id: &str) {
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", video_id))
            .respond_with(ResponseTemplate::new(200).set_body_string(WATCH_HTML))
            .mount(server)
            .await;
    }

    async fn mount_player(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/youtubei/v1/player"))
            .and(query_param("key", "test-key_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn fetcher(server: &MockServer) -> YoutubeTranscriptFetcher {
        YoutubeTranscriptFetcher::with_client(reqwest::Client::new(), &server.uri())
    }

    #[test]
    fn test_parse_timed_text() {
        let segments = parse_timed_text(TIMED_TEXT);

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], TranscriptSegment::new("Hey there", 0.0, 1.5));
        assert_eq!(segments[1].text, "how & why");
        assert_eq!(segments[2].text, "it's great");
        assert_eq!(segments[2].start_seconds, 5.0);
        assert_eq!(segments[2].duration_seconds, 2.25);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#39;c&#x27; &bogus;"), "a <b> 'c' &bogus;");
    }

    #[test]
    fn test_select_track_prefers_language_order_then_manual() {
        let tracks = vec![
            track("en", Some("asr")),
            track("de", None),
            track("en", None),
            track("en-US", Some("asr")),
        ];

        let chosen = select_track(&tracks, &languages(&["en-US", "en"])).unwrap();
        assert_eq!(chosen.language_code, "en-US");

        let chosen = select_track(&tracks, &languages(&["en"])).unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(!chosen.is_generated());

        assert!(select_track(&tracks, &languages(&["fr"])).is_none());
    }

    #[test]
    fn test_strip_format_param() {
        let url = strip_format_param("https://example.com/api/timedtext?v=abc&fmt=srv3&lang=en")
            .unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/timedtext?v=abc&lang=en");

        let url = strip_format_param("https://example.com/api/timedtext?fmt=srv3").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/timedtext");
    }

    #[test]
    fn test_extract_api_key_failures() {
        assert!(matches!(
            extract_api_key(r#"<div class="g-recaptcha"></div>"#, "abc"),
            Err(TubechatError::RequestBlocked(_))
        ));
        assert!(matches!(
            extract_api_key("<html></html>", "abc"),
            Err(TubechatError::Transcript(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_transcript_end_to_end() {
        let server = MockServer::start().await;
        mount_watch_page(&server, "abcdefghijk").await;
        mount_player(
            &server,
            serde_json::json!({
                "playabilityStatus": {"status": "OK"},
                "captions": {
                    "playerCaptionsTracklistRenderer": {
                        "captionTracks": [
                            {
                                "baseUrl": format!("{}/api/timedtext?v=abcdefghijk&lang=en&fmt=srv3", server.uri()),
                                "languageCode": "en",
                                "kind": "asr"
                            }
                        ]
                    }
                }
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("lang", "en"))
            .and(query_param_is_missing("fmt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TIMED_TEXT))
            .mount(&server)
            .await;

        let transcript = fetcher(&server)
            .fetch("abcdefghijk", &languages(&["en-US", "en"]))
            .await
            .unwrap();

        assert_eq!(transcript.language_code, "en");
        assert!(transcript.is_generated);
        assert_eq!(transcript.full_text, "Hey there how & why it's great");
    }

    #[tokio::test]
    async fn test_missing_caption_tracks_means_captions_disabled() {
        let server = MockServer::start().await;
        mount_watch_page(&server, "nocaptions1").await;
        mount_player(&server, serde_json::json!({"playabilityStatus": {"status": "OK"}})).await;

        let err = fetcher(&server)
            .fetch("nocaptions1", &languages(&["en"]))
            .await
            .unwrap_err();

        assert!(err.is_captions_disabled());
    }

    #[tokio::test]
    async fn test_unavailable_video() {
        let server = MockServer::start().await;
        mount_watch_page(&server, "gone0000000").await;
        mount_player(
            &server,
            serde_json::json!({
                "playabilityStatus": {"status": "ERROR", "reason": "This video is unavailable"}
            }),
        )
        .await;

        let err = fetcher(&server)
            .fetch("gone0000000", &languages(&["en"]))
            .await
            .unwrap_err();

        assert!(matches!(err, TubechatError::VideoUnavailable(id) if id == "gone0000000"));
    }

    #[tokio::test]
    async fn test_no_transcript_in_requested_languages() {
        let server = MockServer::start().await;
        mount_watch_page(&server, "german00000").await;
        mount_player(
            &server,
            serde_json::json!({
                "captions": {
                    "playerCaptionsTracklistRenderer": {
                        "captionTracks": [
                            {"baseUrl": format!("{}/api/timedtext?lang=de", server.uri()), "languageCode": "de"}
                        ]
                    }
                }
            }),
        )
        .await;

        let err = fetcher(&server)
            .fetch("german00000", &languages(&["en-US", "en"]))
            .await
            .unwrap_err();

        match err {
            TubechatError::NoTranscriptFound { available, requested, .. } => {
                assert_eq!(available, vec!["de".to_string()]);
                assert_eq!(requested, languages(&["en-US", "en"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limited_watch_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = fetcher(&server)
            .fetch("limited0000", &languages(&["en"]))
            .await
            .unwrap_err();

        assert!(matches!(err, TubechatError::RequestBlocked(_)));
    }
}
