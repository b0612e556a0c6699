//! Human-readable interval strings: `90s`, `5m`, `1h`, `1d` or raw seconds.

/// Unit suffixes, smallest first.
const UNITS: [(char, u64); 4] = [('s', 1), ('m', 60), ('h', 3_600), ('d', 86_400)];

/// Longest accepted poll interval (30 days).
pub const MAX_INTERVAL_SECS: u64 = 30 * 86_400;

pub fn parse_interval(input: &str) -> Result<u64, String> {
    let input = input.trim().to_lowercase();

    let (count, unit_secs) = match input.chars().last() {
        Some(suffix) if suffix.is_ascii_alphabetic() => {
            let unit_secs = UNITS
                .iter()
                .find(|(unit, _)| *unit == suffix)
                .map(|(_, secs)| *secs)
                .ok_or_else(|| format!("Unknown interval unit '{}', expected s, m, h or d", suffix))?;
            (&input[..input.len() - suffix.len_utf8()], unit_secs)
        }
        _ => (input.as_str(), 1),
    };

    let count: u64 = count
        .parse()
        .map_err(|_| format!("Invalid interval: {}. Use format like '60s', '5m', '1h'", input))?;

    let secs = count
        .checked_mul(unit_secs)
        .filter(|secs| *secs <= MAX_INTERVAL_SECS)
        .ok_or_else(|| {
            format!(
                "Interval {} is longer than the maximum of {}",
                input,
                format_interval(MAX_INTERVAL_SECS)
            )
        })?;

    if secs == 0 {
        return Err("Interval must be greater than zero".to_string());
    }
    Ok(secs)
}

/// Renders `secs` in the largest unit that divides it evenly.
pub fn format_interval(secs: u64) -> String {
    let (unit, unit_secs) = UNITS
        .iter()
        .rev()
        .find(|(_, unit_secs)| secs >= *unit_secs && secs % unit_secs == 0)
        .copied()
        .unwrap_or(UNITS[0]);
    format!("{}{}", secs / unit_secs, unit)
}
