//! Meeting platform detection by URL hostname substring.

use serde::Serialize;

const MEETING_PLATFORMS: &[(&str, &str)] = &[
    ("meet.google.com", "Google Meet"),
    ("zoom.us", "Zoom"),
    ("teams.microsoft.com", "Microsoft Teams"),
    ("webex.com", "Webex"),
    ("skype.com", "Skype"),
];

#[derive(Debug, Clone, Serialize)]
pub struct MeetingInfo {
    pub platform: Option<String>,
    pub url: String,
}

pub fn meeting_info(url: &str) -> MeetingInfo {
    MeetingInfo {
        platform: detect_platform(url).map(str::to_string),
        url: url.to_string(),
    }
}

/// Match the URL's host portion against the known platform domains.
pub fn detect_platform(url: &str) -> Option<&'static str> {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or("");

    MEETING_PLATFORMS
        .iter()
        .find(|(domain, _)| host.contains(domain))
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_platforms() {
        assert_eq!(
            detect_platform("https://meet.google.com/abc-defg-hij"),
            Some("Google Meet")
        );
        assert_eq!(detect_platform("https://us02web.zoom.us/j/123"), Some("Zoom"));
        assert_eq!(
            detect_platform("https://teams.microsoft.com/l/meetup"),
            Some("Microsoft Teams")
        );
    }

    #[test]
    fn test_unknown_platform() {
        assert_eq!(detect_platform("https://example.com/call"), None);
    }

    #[test]
    fn test_path_does_not_match() {
        // The domain only counts in the host portion
        assert_eq!(detect_platform("https://example.com/zoom.us"), None);
    }
}
