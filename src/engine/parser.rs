use crate::config::LocaleConfig;
use crate::engine::identifier::Identifier;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LEADING_NUMBER: Regex = Regex::new(r"\d+").unwrap();
    // Example: ".../photos/12345@n07/5550001/in/explore/" -> ".../photos/12345@n07/5550001/"
    static ref PHOTO_WITH_SLASH: Regex = Regex::new(r".*/(\d+)/").unwrap();
    static ref PHOTO_NO_SLASH: Regex = Regex::new(r".*/(\d+)").unwrap();
    // Example: ".../photos/12345@n07/5550001/"
    static ref NUMERIC_OWNER: Regex = Regex::new(r"^(.*)/(\d+@n\d+)/(\d+)/$").unwrap();
    // Example: "https://www.flickr.com/people/alice"
    static ref PEOPLE_URL: Regex = Regex::new(r"(?i)^(.*)/people/(.*)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Months,
    Years,
}

/// The "last upload" cell of a contact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastUpload {
    /// No digit in the text, e.g. no upload at all.
    Never,
    /// A count of months or years.
    Elapsed { count: u32, unit: TimeUnit },
    /// Digits in some finer unit (days, weeks) or none at all.
    Recent { count: u32 },
}

impl LastUpload {
    pub fn elapsed(&self) -> u32 {
        match self {
            LastUpload::Never => 0,
            LastUpload::Elapsed { count, .. } | LastUpload::Recent { count } => *count,
        }
    }

    /// Months and years are compared raw against the same threshold.
    pub fn is_inactive(&self, threshold: u32) -> bool {
        match self {
            LastUpload::Never => true,
            LastUpload::Elapsed { count, .. } => *count == 0 || *count > threshold,
            LastUpload::Recent { .. } => false,
        }
    }
}

fn matches_token(word: &str, tokens: &[String]) -> bool {
    tokens.iter().any(|t| t.eq_ignore_ascii_case(word))
}

pub fn parse_last_upload(text: &str, locale: &LocaleConfig) -> LastUpload {
    let text = text.trim();
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return LastUpload::Never;
    }

    let count = LEADING_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0);

    for word in text.split_whitespace() {
        if matches_token(word, &locale.month_tokens) {
            return LastUpload::Elapsed { count, unit: TimeUnit::Months };
        }
        if matches_token(word, &locale.year_tokens) {
            return LastUpload::Elapsed { count, unit: TimeUnit::Years };
        }
    }
    LastUpload::Recent { count }
}

/// Canonical photo page URL, ending with the numeric photo id and a slash.
/// `None` when `url` does not name a photo.
pub fn normalize_photo_url(url: &str) -> Option<String> {
    let lower = url.trim().to_lowercase();
    let parsed = url::Url::parse(&lower).ok()?;
    if parsed.cannot_be_a_base() {
        return None;
    }

    let photo = if let Some(m) = PHOTO_WITH_SLASH.find(&lower) {
        m.as_str().to_string()
    } else if let Some(m) = PHOTO_NO_SLASH.find(&lower) {
        format!("{}/", m.as_str())
    } else {
        return None;
    };

    // Numeric owner ids are case sensitive on the site: "12345@N07".
    if let Some(caps) = NUMERIC_OWNER.captures(&photo) {
        return Some(format!("{}/{}/{}/", &caps[1], caps[2].to_uppercase(), &caps[3]));
    }
    Some(photo)
}

/// "Favorited by" listing URL for a normalized photo URL.
pub fn favorites_url(photo_url: &str, suffix: &str) -> String {
    format!("{}{}", photo_url.trim_end_matches('/'), suffix)
}

/// Photo stream URL of the owner, derived from their `/people/` URL.
pub fn myself_from_owner(owner: &Identifier) -> Option<Identifier> {
    let caps = PEOPLE_URL.captures(owner.as_str().trim_end_matches('/'))?;
    Some(Identifier::new(format!("{}/photos/{}/", &caps[1], &caps[2])))
}
