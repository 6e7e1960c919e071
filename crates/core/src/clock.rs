use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Wall-clock time as fractional UNIX epoch seconds.
pub(crate) fn epoch_secs() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1_000_000_000.0
}

/// Wall-clock time as an RFC 3339 UTC string.
pub(crate) fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_is_utc() {
        let stamp = now_rfc3339();
        assert!(stamp.ends_with('Z'), "expected UTC suffix in {stamp}");
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }

    #[test]
    fn epoch_secs_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(epoch_secs() > 1_577_836_800.0);
    }
}
