use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref UNIT: Regex = Regex::new(r"(?i)(\d+)\s*([dhm])").expect("valid regex");
}

/// Parse a cooking time such as "1 h 30 m", "PT1H30M" or "1 hour 20 minutes" into
/// minutes. Returns `None` when no day/hour/minute group is present.
pub fn parse_duration(text: &str) -> Option<u32> {
    let mut minutes: Option<u32> = None;
    for caps in UNIT.captures_iter(text) {
        let Ok(value) = caps[1].parse::<u32>() else { continue };
        let scale = match caps[2].to_ascii_lowercase().as_str() {
            "d" => 1440,
            "h" => 60,
            _ => 1,
        };
        let total = minutes.unwrap_or(0).saturating_add(value.saturating_mul(scale));
        minutes = Some(total);
    }
    minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(parse_duration("1 h 30 m"), Some(90));
        assert_eq!(parse_duration("PT1H30M"), Some(90));
        assert_eq!(parse_duration("P1DT2H"), Some(1560));
        assert_eq!(parse_duration("45 mins"), Some(45));
        assert_eq!(parse_duration("1 hour 20 minutes"), Some(80));
        assert_eq!(parse_duration("2d"), Some(2880));
    }

    #[test]
    fn unknown_text_is_absent() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("overnight"), None);
        assert_eq!(parse_duration("30"), None);
    }
}
