use regex::Regex;
use std::sync::OnceLock;

pub fn normalize_token(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join("_")
}

/// "flowrate" -> "Flowrate", "inlet_temperature" -> "Inlet Temperature".
pub fn quantity_label(token: &str) -> String {
    normalize_token(token)
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyStat {
    Average,
    StdDev,
    Min,
    Max,
    Median,
}

fn legacy_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(avg|std|min|max|median)_([a-z0-9_]+)$").expect("regex"))
}

/// Splits a flat legacy key such as `avg_flowrate` into its statistic and
/// quantity label.
pub fn split_legacy_stat_key(key: &str) -> Option<(LegacyStat, String)> {
    let normalized = normalize_token(key);
    let caps = legacy_key_regex().captures(&normalized)?;
    let stat = match &caps[1] {
        "avg" => LegacyStat::Average,
        "std" => LegacyStat::StdDev,
        "min" => LegacyStat::Min,
        "max" => LegacyStat::Max,
        "median" => LegacyStat::Median,
        _ => return None,
    };
    Some((stat, quantity_label(&caps[2])))
}
