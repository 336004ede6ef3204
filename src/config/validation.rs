//! Config validation: unknown-key detection with Levenshtein suggestions.
//!
//! The raw TOML is first parsed into `toml::Value` and its key tree is
//! compared against the known field names. Unknown keys produce warnings
//! with "did you mean?" suggestions; they never make loading fail.

use std::collections::HashSet;

/// A non-fatal config warning (typo, unknown section).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `QaConfig`.
///
/// Any new field added to `QaConfig` must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [server]
        "server",
        "server.addr",
        "server.cors_origins",
        "server.session_idle_timeout_secs",
        "server.max_sessions",
        // [database]
        "database",
        "database.url",
        "database.max_connections",
        "database.seed_sample_machine",
        // [auth]
        "auth",
        "auth.bcrypt_cost",
        // [report]
        "report",
        "report.output_dir",
        // [assistant]
        "assistant",
        "assistant.enabled",
        "assistant.base_url",
        "assistant.model",
        "assistant.api_key",
        "assistant.timeout_secs",
        "assistant.suggestion_temperature",
        "assistant.suggestion_max_tokens",
        "assistant.chat_temperature",
        "assistant.chat_max_tokens",
        // [logging]
        "logging",
        "logging.json",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively collect all dotted key paths of a `toml::Value` tree.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Entry Point
// ============================================================================

/// Warnings for every unknown key in a raw TOML document.
///
/// Parse errors return no warnings; serde reports them afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("model", "model"), 0);
        assert_eq!(levenshtein("modle", "model"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn test_typo_gets_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
[assistant]
modle = "llama"
"#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "assistant.modle");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("assistant.model"));
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_known_keys_produce_no_warnings() {
        let warnings = validate_unknown_keys(
            r#"
[server]
addr = "0.0.0.0:8501"
cors_origins = ["http://localhost:5173"]

[database]
url = "sqlite::memory:"

[logging]
json = true
"#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_unrelated_section_has_no_suggestion() {
        let warnings = validate_unknown_keys("[dashboard]\ntheme = \"dark\"\n");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }
}
