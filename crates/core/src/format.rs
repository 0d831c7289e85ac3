//! Display helpers for identifiers stored in machine form.

/// Turn `SCREAMING_SNAKE` or `snake_case` into title case:
/// `CREATE_SEIZURE` becomes `Create Seizure`.
#[must_use]
pub fn humanize(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shorten `text` to at most `max` characters, ending in `...` when cut.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("CREATE_SEIZURE"), "Create Seizure");
        assert_eq!(humanize("update_status"), "Update Status");
        assert_eq!(humanize("warehouse_manager"), "Warehouse Manager");
        assert_eq!(humanize("custody__chain_"), "Custody Chain");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Please confirm the transfer", 12), "Please co...");
    }
}
