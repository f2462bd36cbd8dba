//! Display formatters and small helpers shared by the CLI and view models

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::storage::{get_non_empty, KeyValueStore, StorageError, DEVICE_ID_KEY};

/// Placeholder for a missing phone number or size
pub const EMPTY_DASH: &str = "-";
/// Placeholder for a missing date or OMR code
pub const EMPTY_EM_DASH: &str = "—";

const KST_OFFSET_SECS: i32 = 9 * 3600;

fn non_digits() -> &'static Regex {
    static NON_DIGITS: OnceLock<Regex> = OnceLock::new();
    NON_DIGITS.get_or_init(|| Regex::new(r"[^0-9]").expect("Invalid regex pattern"))
}

fn digits_of(raw: &str) -> String {
    non_digits().replace_all(raw, "").into_owned()
}

/// Korean phone number display
///
/// Mobile numbers become `010-1234-5678`, Seoul landlines `02-1234-5678`,
/// other 10-digit numbers `031-123-4567`. Anything else comes back as given.
pub fn format_phone(phone: Option<&str>) -> String {
    let Some(raw) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return EMPTY_DASH.to_string();
    };
    let d = digits_of(raw);
    match d.len() {
        11 => format!("{}-{}-{}", &d[..3], &d[3..7], &d[7..]),
        10 if d.starts_with("02") => format!("{}-{}-{}", &d[..2], &d[2..6], &d[6..]),
        10 => format!("{}-{}-{}", &d[..3], &d[3..6], &d[6..]),
        _ => raw.to_string(),
    }
}

/// OMR identification code as `1234-5678`
pub fn format_omr_code(code: Option<&str>) -> String {
    let Some(raw) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return EMPTY_EM_DASH.to_string();
    };
    let d = digits_of(raw);
    match d.len() {
        0..=3 => raw.to_string(),
        4..=8 => format!("{}-{}", &d[..4], &d[4..]),
        _ => format!("{}-{}", &d[..4], &d[4..8]),
    }
}

fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).expect("KST offset in range")
}

/// Parse a backend timestamp into Korea Standard Time
///
/// Offset-less datetimes and bare dates are taken as already local.
pub fn parse_kst(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&kst()));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    naive.and_local_timezone(kst()).single()
}

/// `YYYY.MM.DD` in KST
pub fn format_date(raw: Option<&str>) -> String {
    raw.and_then(parse_kst)
        .map_or_else(|| EMPTY_EM_DASH.to_string(), |dt| dt.format("%Y.%m.%d").to_string())
}

/// `YYYY.MM.DD HH:mm` in KST
pub fn format_date_time(raw: Option<&str>) -> String {
    raw.and_then(parse_kst).map_or_else(
        || EMPTY_EM_DASH.to_string(),
        |dt| dt.format("%Y.%m.%d %H:%M").to_string(),
    )
}

/// Human-readable file size, `-` for zero
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return EMPTY_DASH.to_string();
    }
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        return format!("{kb:.1} KB");
    }
    let mb = kb / 1024.0;
    if mb < 1024.0 {
        return format!("{mb:.1} MB");
    }
    format!("{:.2} GB", mb / 1024.0)
}

/// Stable identifier of this installation, created on first use
pub fn generate_device_id(store: &dyn KeyValueStore) -> Result<String, StorageError> {
    if let Some(existing) = get_non_empty(store, DEVICE_ID_KEY) {
        return Ok(existing);
    }
    let id = uuid::Uuid::new_v4().to_string();
    store.set(DEVICE_ID_KEY, &id)?;
    tracing::debug!(device_id = %id, "Generated device id");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone(Some("01012345678")), "010-1234-5678");
        assert_eq!(format_phone(Some("0212345678")), "02-1234-5678");
        assert_eq!(format_phone(Some("031-123-4567")), "031-123-4567");
        assert_eq!(format_phone(Some("0311234567")), "031-123-4567");
        assert_eq!(format_phone(Some("  ")), "-");
        assert_eq!(format_phone(None), "-");
        assert_eq!(format_phone(Some("12345")), "12345");
    }

    #[test]
    fn test_non_ascii_digits_are_dropped() {
        // Arabic-Indic zero is a Unicode digit but not part of a phone number
        assert_eq!(format_phone(Some("12٠1234567")), "12٠1234567");
        assert_eq!(format_phone(Some("010٠1234٠5678")), "010-1234-5678");
        assert_eq!(format_omr_code(Some("123٠")), "123٠");
        assert_eq!(format_omr_code(Some("１２３４５６７８")), "１２３４５６７８");
    }

    #[test]
    fn test_format_omr_code() {
        assert_eq!(format_omr_code(Some("12345678")), "1234-5678");
        assert_eq!(format_omr_code(Some("123")), "123");
        assert_eq!(format_omr_code(Some("123456")), "1234-56");
        assert_eq!(format_omr_code(Some("1234567890")), "1234-5678");
        assert_eq!(format_omr_code(None), "—");
    }

    #[test]
    fn test_dates_in_kst() {
        assert_eq!(format_date(Some("2024-03-01T16:30:00Z")), "2024.03.02");
        assert_eq!(
            format_date_time(Some("2024-03-01T16:30:00+00:00")),
            "2024.03.02 01:30"
        );
        assert_eq!(format_date(Some("2024-03-05")), "2024.03.05");
        assert_eq!(format_date(Some("not a date")), "—");
        assert_eq!(format_date_time(None), "—");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "-");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_device_id_is_stable() {
        let store = MemoryStore::new();
        let first = generate_device_id(&store).unwrap();
        let second = generate_device_id(&store).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.get(DEVICE_ID_KEY).as_deref(), Some(first.as_str()));
    }
}
