//! Classification of a resource's file/link into something a view can show

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use serde::Serialize;

/// What the resource view renders when the resource carries no quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceContent {
    Video { source: String, embed_url: Option<String> },
    Pdf { url: String },
    Image { url: String },
    Unavailable,
}

const VIDEO_HOSTS: [&str; 4] = [
    "youtube.com/watch",
    "youtu.be/",
    "vimeo.com/",
    "drive.google.com/",
];

pub fn is_video_link(url: &str) -> bool {
    VIDEO_HOSTS.iter().any(|host| url.contains(host))
}

fn drive_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-\w]{25,}").expect("drive id pattern"))
}

/// Player URL for a supported video link, `None` when no id can be found
pub fn embed_url(url: &str) -> Option<String> {
    if let Some((_, rest)) = url.split_once("youtu.be/") {
        let video_id = rest.split(['?', '&', '#']).next().unwrap_or_default();
        return youtube_embed(video_id);
    }
    if url.contains("youtube.com/watch") {
        let parsed = Url::parse(url).ok()?;
        let video_id = parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?;
        return youtube_embed(&video_id);
    }
    if let Some((_, rest)) = url.split_once("vimeo.com/") {
        let video_id = rest.split(['?', '#']).next().unwrap_or_default();
        if video_id.is_empty() {
            return None;
        }
        return Some(format!(
            "https://player.vimeo.com/video/{}?controls=1&background=0&byline=0&title=0&portrait=0&loop=0",
            video_id
        ));
    }
    if url.contains("drive.google.com/") {
        let file_id = drive_id_pattern().find(url)?;
        return Some(format!(
            "https://drive.google.com/file/d/{}/preview",
            file_id.as_str()
        ));
    }
    None
}

fn youtube_embed(video_id: &str) -> Option<String> {
    if video_id.is_empty() {
        return None;
    }
    Some(format!(
        "https://www.youtube.com/embed/{}?controls=1&rel=0&modestbranding=1",
        video_id
    ))
}

pub fn classify(url: Option<&str>) -> ResourceContent {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return ResourceContent::Unavailable;
    };

    if is_video_link(url) {
        ResourceContent::Video {
            source: url.to_string(),
            embed_url: embed_url(url),
        }
    } else if url.to_ascii_lowercase().ends_with(".pdf") {
        ResourceContent::Pdf {
            url: url.to_string(),
        }
    } else if url.starts_with("http") {
        ResourceContent::Image {
            url: url.to_string(),
        }
    } else {
        ResourceContent::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_links() {
        assert_eq!(
            embed_url("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ?controls=1&rel=0&modestbranding=1")
        );
        assert_eq!(
            embed_url("https://www.youtube.com/watch?v=abc123&t=10").as_deref(),
            Some("https://www.youtube.com/embed/abc123?controls=1&rel=0&modestbranding=1")
        );
        assert_eq!(embed_url("https://www.youtube.com/watch?list=xyz"), None);
    }

    #[test]
    fn test_vimeo_and_drive_links() {
        assert!(embed_url("https://vimeo.com/76979871")
            .unwrap()
            .starts_with("https://player.vimeo.com/video/76979871?"));
        assert_eq!(
            embed_url("https://drive.google.com/file/d/1AbCdEfGhIjKlMnOpQrStUvWxYz_12345/view").as_deref(),
            Some("https://drive.google.com/file/d/1AbCdEfGhIjKlMnOpQrStUvWxYz_12345/preview")
        );
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify(Some("https://youtu.be/x1")),
            ResourceContent::Video { .. }
        ));
        assert_eq!(
            classify(Some("https://cdn.example.com/notes.PDF")),
            ResourceContent::Pdf {
                url: "https://cdn.example.com/notes.PDF".to_string()
            }
        );
        assert!(matches!(
            classify(Some("https://cdn.example.com/diagram.png")),
            ResourceContent::Image { .. }
        ));
        assert_eq!(classify(Some("  ")), ResourceContent::Unavailable);
        assert_eq!(classify(None), ResourceContent::Unavailable);
        assert_eq!(classify(Some("ftp://old")), ResourceContent::Unavailable);
    }
}
