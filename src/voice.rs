use reqwest::Url;
use serde::Serialize;
use tracing::warn;

/// A voice the dubbing backend can speak with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceOption {
    pub id: &'static str,
    pub name: &'static str,
    pub language: &'static str,
}

const VOICES: &[VoiceOption] = &[
    VoiceOption { id: "default", name: "Default voice", language: "pt-BR" },
    VoiceOption { id: "male1", name: "Male voice 1", language: "pt-BR" },
    VoiceOption { id: "female1", name: "Female voice 1", language: "pt-BR" },
    VoiceOption { id: "female2", name: "Female voice 2", language: "pt-BR" },
    VoiceOption { id: "male_es", name: "Spanish male voice", language: "es-ES" },
    VoiceOption { id: "female_fr", name: "French female voice", language: "fr-FR" },
];

/// Hosts recognised as video platforms
const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "facebook.com",
    "fb.watch",
    "tiktok.com",
];

pub fn voices() -> &'static [VoiceOption] {
    VOICES
}

pub fn find_voice(id: &str) -> Option<&'static VoiceOption> {
    VOICES.iter().find(|v| v.id == id)
}

/// Language to dub into for `voice_id`, unless the caller picked one explicitly.
///
/// Unknown voices are forwarded to the backend as-is; without an explicit
/// language they fall back to the default voice's language.
pub fn resolve_language(voice_id: &str, explicit: Option<&str>) -> String {
    if let Some(lang) = explicit.map(str::trim).filter(|l| !l.is_empty()) {
        return lang.to_string();
    }
    match find_voice(voice_id) {
        Some(voice) => voice.language.to_string(),
        None => {
            warn!("Unknown voice '{}', passing it to the server unchanged", voice_id);
            VOICES[0].language.to_string()
        }
    }
}

/// Whether `url` looks like a link to a video the backend can download.
pub fn is_supported_video_url(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let has_target = parsed.path().len() > 1 || parsed.query().is_some();

    if VIDEO_HOSTS.contains(&host) && has_target {
        return true;
    }

    url.contains("video")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_platforms_accepted() {
        assert!(is_supported_video_url("https://youtube.com/watch?v=abc"));
        assert!(is_supported_video_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_supported_video_url("https://youtu.be/abc"));
        assert!(is_supported_video_url("https://vimeo.com/123456"));
        assert!(is_supported_video_url("http://fb.watch/xyz"));
        assert!(is_supported_video_url("https://www.tiktok.com/@user/video/1"));
    }

    #[test]
    fn test_generic_video_link_accepted() {
        assert!(is_supported_video_url("https://media.example.com/videos/clip.mp4"));
    }

    #[test]
    fn test_rejected_links() {
        assert!(!is_supported_video_url("youtube.com/watch?v=abc"));
        assert!(!is_supported_video_url("https://youtube.com/"));
        assert!(!is_supported_video_url("https://example.com/page"));
        assert!(!is_supported_video_url("ftp://example.com/video.mp4"));
    }

    #[test]
    fn test_resolve_language() {
        assert_eq!(resolve_language("male_es", None), "es-ES");
        assert_eq!(resolve_language("female_fr", Some("fr-CA")), "fr-CA");
        assert_eq!(resolve_language("default", Some("  ")), "pt-BR");
        assert_eq!(resolve_language("robot", None), "pt-BR");
    }

    #[test]
    fn test_catalogue() {
        assert_eq!(voices().len(), 6);
        assert_eq!(find_voice("female2").map(|v| v.language), Some("pt-BR"));
        assert!(find_voice("nobody").is_none());
    }
}
