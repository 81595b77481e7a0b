use std::sync::OnceLock;

use regex::Regex;

static DURATION_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn duration_regex() -> Option<&'static Regex> {
    DURATION_RE
        .get_or_init(|| Regex::new(r"^P(?:(\d+)D)?T?(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").ok())
        .as_ref()
}

/// Total seconds of an ISO-8601 duration such as `PT1H2M3S` or `P1DT5M`.
/// Absent components count as zero; anything unparseable or too large is 0.
pub fn parse_iso_duration(value: &str) -> i64 {
    let Some(caps) = duration_regex().and_then(|re| re.captures(value.trim())) else {
        return 0;
    };

    let part = |i: usize| -> i64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };

    [(1, 86_400), (2, 3_600), (3, 60), (4, 1)]
        .into_iter()
        .try_fold(0i64, |total, (i, unit)| {
            part(i).checked_mul(unit).and_then(|secs| total.checked_add(secs))
        })
        .unwrap_or(0)
}
