//! Media shelf: recent channel videos, short clips, podcasts and lectures.
//!
//! Channel listings are cached on disk for a configurable time. Every kind
//! has a bundled list that is shown whenever nothing fresher is available.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{SiteError, SiteResult};

static YOUTUBE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^(?:https?://)?(?:www\.)?(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .expect("valid youtube id regex")
});

static TIKTOK_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)tiktok\.com/@[^/]+/video/(\d+)").expect("valid tiktok id regex"));

pub const PLACEHOLDER_THUMBNAIL: &str = "https://picsum.photos/280/158";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Youtube,
    Tiktok,
    Podcasts,
    Lectures,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Youtube,
        MediaKind::Tiktok,
        MediaKind::Podcasts,
        MediaKind::Lectures,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
            Self::Podcasts => "podcasts",
            Self::Lectures => "lectures",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown media kind `{s}`"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
}

/// How an item is played once selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    YouTube { embed_url: String },
    TikTok { url: String, video_id: Option<String> },
    Audio { url: String },
    Video { url: String },
    Unsupported { url: String },
}

impl MediaItem {
    fn bundled(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            ..Self::default()
        }
    }

    fn is_youtube(&self) -> bool {
        self.url.contains("youtube.com") || self.url.contains("youtu.be")
    }

    fn is_tiktok(&self) -> bool {
        self.url.contains("tiktok.com")
    }

    /// Id parsed from the URL, else the id the listing carried.
    pub fn video_id(&self) -> Option<String> {
        extract_video_id(&self.url).or_else(|| self.id.clone())
    }

    pub fn thumbnail_url(&self) -> String {
        if let Some(thumb) = self.thumbnail.as_ref().filter(|t| !t.is_empty()) {
            return thumb.clone();
        }
        match self.video_id() {
            Some(id) if self.is_youtube() => format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg"),
            _ => PLACEHOLDER_THUMBNAIL.to_string(),
        }
    }

    pub fn playback(&self) -> Playback {
        let url = self.url.clone();
        let video_id = self.video_id();
        if self.is_youtube() {
            if let Some(id) = &video_id {
                return Playback::YouTube {
                    embed_url: format!("https://www.youtube.com/embed/{id}?autoplay=1&rel=0"),
                };
            }
        }
        if self.is_tiktok() {
            Playback::TikTok { url, video_id }
        } else if url.ends_with(".mp3") {
            Playback::Audio { url }
        } else if url.ends_with(".mp4") {
            Playback::Video { url }
        } else {
            Playback::Unsupported { url }
        }
    }
}

/// 11-character YouTube id or numeric TikTok id from a share URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    YOUTUBE_ID_RE
        .captures(url)
        .or_else(|| TIKTOK_ID_RE.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Compact view count: `950`, `1.2K`, `15K`, `3.4M`. Zero renders as nothing.
pub fn format_views(count: u64) -> String {
    const UNITS: [(f64, &str); 3] = [(1e9, "B"), (1e6, "M"), (1e3, "K")];

    if count == 0 {
        return String::new();
    }
    if count < 1_000 {
        return count.to_string();
    }

    let value = count as f64;
    let round = |scale: f64| (value / scale * 10.0).round() / 10.0;
    let mut idx = UNITS
        .iter()
        .position(|(scale, _)| value >= *scale)
        .unwrap_or(UNITS.len() - 1);
    let mut scaled = round(UNITS[idx].0);
    // 999_950 rounds to 1000K; show it as 1M.
    if scaled >= 1_000.0 && idx > 0 {
        idx -= 1;
        scaled = round(UNITS[idx].0);
    }

    let suffix = UNITS[idx].1;
    if scaled.fract() == 0.0 {
        format!("{}{suffix}", scaled as u64)
    } else {
        format!("{scaled:.1}{suffix}")
    }
}

/// Lists shipped with the site.
pub fn bundled(kind: MediaKind) -> Vec<MediaItem> {
    let items: &[(&str, &str)] = match kind {
        MediaKind::Youtube => &[
            ("የዶክተር አለማየሁ ዋሴ አስደናቂ የሕወት ምልከታ", "https://youtu.be/6LQaMIEVYMI"),
            ("የሰው ደም የነካው መሬት ዘር አያበቅልም", "https://youtu.be/ximA2zFndlY"),
            ("በአዲስ አበባ ላይ የተጋረጠው አደጋ", "https://youtu.be/2zbM1XW2ql0?si=xKwJNpAAkuWLG499"),
            ("የፀሐይ ከተማ እንዴት ትመለስ?", "https://youtu.be/saEEsejoMoo"),
        ],
        MediaKind::Tiktok => &[
            (
                "TikTok Video 1: Orthodoxy Insights",
                "https://www.tiktok.com/@melkahiwot/video/7392411616882576682",
            ),
            (
                "TikTok Video 2: Life Design Tips",
                "https://www.tiktok.com/@melkahiwot/video/987654321",
            ),
            (
                "TikTok Video 3: Spiritual Growth",
                "https://www.tiktok.com/@melkahiwot/video/456789123",
            ),
            (
                "TikTok Video 4: Quick Inspiration",
                "https://www.tiktok.com/@melkahiwot/video/789123456",
            ),
        ],
        MediaKind::Podcasts => &[
            (
                "Podcast Episode 1: Exploring Orthodoxy",
                "https://example.com/podcasts/episode1.mp3",
            ),
            (
                "Podcast Episode 2: Life Design Principles",
                "https://example.com/podcasts/episode2.mp3",
            ),
            (
                "Podcast Episode 3: Spiritual Balance",
                "https://example.com/podcasts/episode3.mp3",
            ),
            (
                "Podcast Episode 4: Human Existence",
                "https://example.com/podcasts/episode4.mp3",
            ),
        ],
        MediaKind::Lectures => &[
            (
                "Lecture 1: Foundations of Orthodoxy",
                "https://example.com/lectures/lecture1.mp4",
            ),
            (
                "Lecture 2: Designing Your Life",
                "https://example.com/lectures/lecture2.mp4",
            ),
            (
                "Lecture 3: Spiritual Innovation",
                "https://example.com/lectures/lecture3.mp4",
            ),
            (
                "Lecture 4: Human Systems",
                "https://example.com/lectures/lecture4.mp4",
            ),
        ],
    };
    items
        .iter()
        .map(|(title, url)| MediaItem::bundled(title, url))
        .collect()
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    saved_at: DateTime<Utc>,
    items: Vec<MediaItem>,
}

/// One JSON file per kind, `<dir>/<kind>_media.json`, stamped with the time
/// it was written.
#[derive(Debug, Clone)]
pub struct MediaCache {
    dir: PathBuf,
    ttl: Duration,
}

impl MediaCache {
    pub fn new<P: AsRef<Path>>(dir: P, ttl: Duration) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ttl,
        }
    }

    /// `<cache dir>/haile/media`, or `./media-cache` without a cache dir.
    pub fn default_location(ttl: Duration) -> Self {
        let dir = dirs::cache_dir()
            .map(|base| base.join("haile").join("media"))
            .unwrap_or_else(|| PathBuf::from("media-cache"));
        Self::new(dir, ttl)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, kind: MediaKind) -> PathBuf {
        self.dir.join(format!("{kind}_media.json"))
    }

    pub fn get(&self, kind: MediaKind) -> SiteResult<Option<Vec<MediaItem>>> {
        self.get_at(kind, Utc::now())
    }

    /// Items saved less than the TTL before `now`. Entries stamped in the
    /// future count as stale. An unreadable entry is a miss.
    pub fn get_at(
        &self,
        kind: MediaKind,
        now: DateTime<Utc>,
    ) -> SiteResult<Option<Vec<MediaItem>>> {
        let raw = match std::fs::read_to_string(self.path(kind)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%kind, "discarding unreadable media cache: {err}");
                return Ok(None);
            }
        };

        match (now - entry.saved_at).to_std() {
            Ok(age) if age < self.ttl => Ok(Some(entry.items)),
            _ => Ok(None),
        }
    }

    pub fn put(&self, kind: MediaKind, items: &[MediaItem]) -> SiteResult<()> {
        self.put_at(kind, items, Utc::now())
    }

    pub fn put_at(
        &self,
        kind: MediaKind,
        items: &[MediaItem],
        now: DateTime<Utc>,
    ) -> SiteResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            saved_at: now,
            items: items.to_vec(),
        };
        std::fs::write(self.path(kind), serde_json::to_string(&entry)?)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Library
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: SearchId,
    #[serde(default)]
    snippet: Option<Snippet>,
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
}

impl SearchItem {
    /// Channel and playlist hits carry no video id and are skipped.
    fn into_media(self) -> Option<MediaItem> {
        let video_id = self.id.video_id.filter(|id| !id.is_empty())?;
        let (title, thumbnail) = match self.snippet {
            Some(snippet) => (
                snippet.title,
                snippet.thumbnails.and_then(|t| t.medium).map(|t| t.url),
            ),
            None => (String::new(), None),
        };
        Some(MediaItem {
            url: format!("https://www.youtube.com/watch?v={video_id}"),
            id: Some(video_id),
            title,
            thumbnail,
            views: self
                .statistics
                .and_then(|s| s.view_count)
                .and_then(|v| v.parse().ok()),
        })
    }
}

#[derive(Debug, Clone)]
struct Channel {
    api_key: String,
    channel_id: String,
    endpoint: String,
    max_results: u32,
}

pub struct MediaLibrary {
    http: reqwest::Client,
    channel: Option<Channel>,
    cache: MediaCache,
}

impl MediaLibrary {
    pub fn new(config: &MediaConfig) -> SiteResult<Self> {
        let cache = match &config.cache_dir {
            Some(dir) => MediaCache::new(dir, config.cache_ttl()),
            None => MediaCache::default_location(config.cache_ttl()),
        };
        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: &MediaConfig, cache: MediaCache) -> SiteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| SiteError::ConfigError(format!("media client: {err}")))?;

        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        let channel = match (
            non_empty(&config.youtube_api_key),
            non_empty(&config.youtube_channel_id),
        ) {
            (Some(api_key), Some(channel_id)) => Some(Channel {
                api_key,
                channel_id,
                endpoint: config.youtube_endpoint.clone(),
                max_results: config.youtube_max_results,
            }),
            _ => None,
        };

        Ok(Self {
            http,
            channel,
            cache,
        })
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    /// Items for a kind: a fresh cache entry, then the channel listing, then
    /// the bundled list. Never empty.
    pub async fn items(&self, kind: MediaKind) -> Vec<MediaItem> {
        let found = match kind {
            MediaKind::Youtube => self.channel_videos().await,
            MediaKind::Tiktok | MediaKind::Podcasts | MediaKind::Lectures => None,
        };

        match found {
            Some(items) if !items.is_empty() => items,
            _ => {
                debug!(%kind, "using bundled media list");
                bundled(kind)
            }
        }
    }

    async fn channel_videos(&self) -> Option<Vec<MediaItem>> {
        let kind = MediaKind::Youtube;
        match self.cache.get(kind) {
            Ok(Some(items)) => return Some(items),
            Ok(None) => {}
            Err(err) => warn!("media cache read failed: {err}"),
        }

        let channel = match &self.channel {
            Some(channel) => channel,
            None => {
                debug!("no channel configured");
                return None;
            }
        };

        match self.search(channel).await {
            Ok(items) => {
                info!(count = items.len(), "channel videos fetched");
                if let Err(err) = self.cache.put(kind, &items) {
                    warn!("media cache write failed: {err}");
                }
                Some(items)
            }
            Err(err) => {
                warn!("channel listing failed: {err}");
                None
            }
        }
    }

    async fn search(&self, channel: &Channel) -> SiteResult<Vec<MediaItem>> {
        let max_results = channel.max_results.to_string();
        let resp = self
            .http
            .get(&channel.endpoint)
            .query(&[
                ("key", channel.api_key.as_str()),
                ("channelId", channel.channel_id.as_str()),
                ("part", "snippet,id"),
                ("order", "date"),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(|err| SiteError::Internal(format!("channel listing: {err}")))?;

        if !resp.status().is_success() {
            return Err(SiteError::Internal(format!(
                "channel listing: HTTP {}",
                resp.status().as_u16()
            )));
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|err| SiteError::Internal(format!("channel listing body: {err}")))?;
        Ok(body
            .items
            .into_iter()
            .filter_map(SearchItem::into_media)
            .collect())
    }
}
