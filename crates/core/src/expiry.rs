//! Expiry rule resolution.
//!
//! Turns a relative preset or a custom absolute timestamp string into an
//! absolute deadline. Pure apart from a structured warning when an
//! unparsable custom value falls back to the shortest preset.

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// Custom timestamps may also omit the offset, in which case they are
/// interpreted as UTC.
const CUSTOM_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Relative expiry presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpiryPreset {
    #[serde(rename = "10m")]
    TenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    TwentyFourHours,
}

impl ExpiryPreset {
    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "10m" => Ok(Self::TenMinutes),
            "1h" => Ok(Self::OneHour),
            "24h" => Ok(Self::TwentyFourHours),
            _ => Err(crate::Error::InvalidExpiryPreset(s.to_string())),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TenMinutes => "10m",
            Self::OneHour => "1h",
            Self::TwentyFourHours => "24h",
        }
    }

    /// The duration this preset adds to "now" at resolution time.
    pub fn duration(&self) -> Duration {
        match self {
            Self::TenMinutes => Duration::minutes(10),
            Self::OneHour => Duration::hours(1),
            Self::TwentyFourHours => Duration::hours(24),
        }
    }
}

/// How a share's expiry deadline is specified at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum ExpiryRule {
    /// A relative preset, added to "now" at resolution time.
    Preset(ExpiryPreset),
    /// A custom absolute timestamp string (RFC 3339, or
    /// `YYYY-MM-DDTHH:mm:ss` interpreted as UTC).
    Custom(String),
}

/// A resolved expiry deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedExpiry {
    /// The absolute deadline.
    pub expires_at: OffsetDateTime,
    /// Whether an unparsable custom value fell back to the `10m` preset.
    /// Surfaced so callers can warn the user that the share is shorter
    /// than intended.
    pub fell_back: bool,
}

/// Resolve an expiry rule against the current time.
///
/// A custom value that fails to parse falls back to the `10m` preset
/// rather than failing the operation. The fallback is explicit: the
/// result is flagged and a warning is emitted, since it silently
/// shortens an intended long-lived share otherwise.
pub fn resolve_expiry(rule: &ExpiryRule, now: OffsetDateTime) -> ResolvedExpiry {
    match rule {
        ExpiryRule::Preset(preset) => ResolvedExpiry {
            expires_at: now + preset.duration(),
            fell_back: false,
        },
        ExpiryRule::Custom(raw) => match parse_custom(raw) {
            Some(expires_at) => ResolvedExpiry {
                expires_at,
                fell_back: false,
            },
            None => {
                tracing::warn!(
                    raw = raw.as_str(),
                    fallback = ExpiryPreset::TenMinutes.as_str(),
                    "unparsable custom expiry, falling back to shortest preset"
                );
                ResolvedExpiry {
                    expires_at: now + ExpiryPreset::TenMinutes.duration(),
                    fell_back: true,
                }
            }
        },
    }
}

fn parse_custom(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt);
    }
    PrimitiveDateTime::parse(raw, CUSTOM_FORMAT)
        .map(|dt| dt.assume_utc())
        .ok()
}
