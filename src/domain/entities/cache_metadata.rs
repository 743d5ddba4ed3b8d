//! Freshness metadata derived from HTTP caching headers.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{CACHE_CONTROL, DATE, ETAG, EXPIRES, HeaderMap, LAST_MODIFIED};

/// Upper bound for directive lifetimes (ten years).
const MAX_DIRECTIVE_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Caching information attached to a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetadata {
    /// Entity tag for conditional requests.
    pub etag: Option<String>,
    /// Server `Date` header.
    pub server_date: Option<DateTime<Utc>>,
    /// Server `Last-Modified` header.
    pub last_modified: Option<DateTime<Utc>>,
    /// After this instant the entry should be refreshed.
    pub soft_expires: Option<DateTime<Utc>>,
    /// After this instant the entry must not be used.
    pub expires: Option<DateTime<Utc>>,
}

impl CacheMetadata {
    /// Extracts caching metadata from response headers.
    ///
    /// Returns `None` when `Cache-Control` contains `no-cache` or `no-store`.
    /// `Cache-Control` takes precedence over `Expires`, which is only honored
    /// relative to the server `Date`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Self> {
        let server_date = header_date(headers, DATE.as_str());
        let last_modified = header_date(headers, LAST_MODIFIED.as_str());
        let server_expires = header_date(headers, EXPIRES.as_str());
        let etag = header_str(headers, ETAG.as_str()).map(str::to_owned);

        let mut has_cache_control = false;
        let mut max_age = 0i64;
        let mut stale_while_revalidate = 0i64;
        let mut must_revalidate = false;

        if let Some(cache_control) = header_str(headers, CACHE_CONTROL.as_str()) {
            has_cache_control = true;
            for token in cache_control.split(',').map(str::trim) {
                let lower = token.to_ascii_lowercase();
                if lower == "no-cache" || lower == "no-store" {
                    return None;
                } else if let Some(value) = lower.strip_prefix("max-age=") {
                    max_age = parse_seconds(value);
                } else if let Some(value) = lower.strip_prefix("stale-while-revalidate=") {
                    stale_while_revalidate = parse_seconds(value);
                } else if lower == "must-revalidate" || lower == "proxy-revalidate" {
                    must_revalidate = true;
                }
            }
        }

        let (soft_expires, expires) = if has_cache_control {
            let soft = now + Duration::seconds(max_age);
            let hard = if must_revalidate {
                soft
            } else {
                soft + Duration::seconds(stale_while_revalidate)
            };
            (Some(soft), Some(hard))
        } else {
            match (server_date, server_expires) {
                (Some(date), Some(expires)) if expires >= date => {
                    let soft = now + (expires - date);
                    (Some(soft), Some(soft))
                }
                _ => (None, None),
            }
        };

        Some(Self {
            etag,
            server_date,
            last_modified,
            soft_expires,
            expires,
        })
    }

    /// Returns true if the entry must not be used anymore.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_none_or(|expires| expires < now)
    }

    /// Returns true if the entry should be refreshed.
    #[must_use]
    pub fn refresh_needed(&self, now: DateTime<Utc>) -> bool {
        self.soft_expires.is_none_or(|soft| soft < now)
    }
}

fn parse_seconds(value: &str) -> i64 {
    value
        .trim()
        .parse::<i64>()
        .unwrap_or(0)
        .clamp(0, MAX_DIRECTIVE_SECS)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn header_date(headers: &HeaderMap, name: &str) -> Option<DateTime<Utc>> {
    let value = header_str(headers, name)?;
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_no_store_disables_caching() {
        let map = headers(&[("cache-control", "public, no-store")]);
        assert!(CacheMetadata::from_headers(&map, now()).is_none());
    }

    #[test]
    fn test_max_age_and_stale_while_revalidate() {
        let map = headers(&[
            ("cache-control", "max-age=60, stale-while-revalidate=30"),
            ("etag", "\"abc\""),
        ]);
        let meta = CacheMetadata::from_headers(&map, now()).unwrap();
        assert_eq!(meta.etag.as_deref(), Some("\"abc\""));
        assert_eq!(meta.soft_expires, Some(now() + Duration::seconds(60)));
        assert_eq!(meta.expires, Some(now() + Duration::seconds(90)));
        assert!(!meta.refresh_needed(now()));
        assert!(meta.refresh_needed(now() + Duration::seconds(61)));
        assert!(!meta.is_expired(now() + Duration::seconds(61)));
    }

    #[test]
    fn test_must_revalidate_ignores_stale_window() {
        let map = headers(&[(
            "cache-control",
            "max-age=10, stale-while-revalidate=30, must-revalidate",
        )]);
        let meta = CacheMetadata::from_headers(&map, now()).unwrap();
        assert_eq!(meta.expires, meta.soft_expires);
    }

    #[test]
    fn test_expires_relative_to_server_date() {
        let map = headers(&[
            ("date", "Wed, 01 May 2024 10:00:00 GMT"),
            ("expires", "Wed, 01 May 2024 10:05:00 GMT"),
            ("last-modified", "Tue, 30 Apr 2024 08:00:00 GMT"),
        ]);
        let meta = CacheMetadata::from_headers(&map, now()).unwrap();
        assert_eq!(meta.soft_expires, Some(now() + Duration::minutes(5)));
        assert!(meta.server_date.is_some());
        assert!(meta.last_modified.is_some());
    }

    #[test]
    fn test_no_headers_is_immediately_stale() {
        let meta = CacheMetadata::from_headers(&HeaderMap::new(), now()).unwrap();
        assert!(meta.is_expired(now()));
        assert!(meta.refresh_needed(now()));
    }
}
