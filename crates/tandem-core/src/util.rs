//! Small text helpers shared by config, models and the HTTP clients.

/// Longest error body echoed back in a message.
const MAX_ECHOED_CHARS: usize = 160;

/// Trim optional text; blank text becomes `None`.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.len() > scheme.len() && value.starts_with(scheme))
}

/// Collapse whitespace runs and cap the length, for echoing response bodies.
pub fn compact_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_ECHOED_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" dinner at eight ".to_string())),
            Some("dinner at eight".to_string())
        );
    }

    #[test]
    fn http_url_needs_scheme_and_host() {
        assert!(is_http_url("https://demo.supabase.co"));
        assert!(is_http_url("http://localhost:54321"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("demo.supabase.co"));
    }

    #[test]
    fn compact_text_flattens_html_bodies() {
        assert_eq!(compact_text("<h1>Bad\n  Gateway</h1>\n"), "<h1>Bad Gateway</h1>");
        assert_eq!(compact_text(&"x ".repeat(400)).chars().count(), MAX_ECHOED_CHARS);
    }
}
