//! Contact email extraction from page text.

use regex::Regex;
use std::sync::LazyLock;

static AT_OBFUSCATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[\[\(]\s*at\s*[\]\)]\s*").ok());
static DOT_OBFUSCATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\s*[\[\(]\s*dot\s*[\]\)]\s*").ok());
static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9._-]+\.[a-z]{2,}\b").ok());

/// First plausible email address in `text`, lowercased.
///
/// Understands `name [at] domain [dot] com` style obfuscation.
pub fn extract_email(text: &str) -> Option<String> {
    let (Some(at), Some(dot), Some(email)) =
        (AT_OBFUSCATION.as_ref(), DOT_OBFUSCATION.as_ref(), EMAIL.as_ref())
    else {
        return None;
    };

    let cleaned = at.replace_all(text, "@");
    let cleaned = dot.replace_all(&cleaned, ".");

    email
        .find_iter(&cleaned)
        .map(|m| m.as_str().trim_matches('.').to_lowercase())
        .find(|candidate| {
            let Some((local, domain)) = candidate.split_once('@') else {
                return false;
            };
            (5..=254).contains(&candidate.len())
                && !local.is_empty()
                && domain.rsplit_once('.').is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
                // Asset names like logo@2x.png look like addresses
                && !domain.ends_with(".png")
                && !domain.ends_with(".jpg")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_email() {
        assert_eq!(
            extract_email("For business: Team@Creator-Studio.io thanks").as_deref(),
            Some("team@creator-studio.io")
        );
    }

    #[test]
    fn test_obfuscated_email() {
        assert_eq!(
            extract_email("mail me: jane [at] example (dot) com").as_deref(),
            Some("jane@example.com")
        );
    }

    #[test]
    fn test_skips_asset_names() {
        assert_eq!(
            extract_email(r#"<img src="logo@2x.png"> contact: hi@example.org"#).as_deref(),
            Some("hi@example.org")
        );
        assert!(extract_email("no address here").is_none());
    }
}
