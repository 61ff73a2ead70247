//! Metadata template placeholder syntax (spec §6). Rendering itself lives in
//! `castforge-services`'s metadata-template renderer; this module only
//! validates that a template string is well-formed before it is stored.

use regex::Regex;
use std::sync::OnceLock;

/// The fixed placeholder vocabulary recognized by the renderer. Unknown
/// placeholders are left literally in the output — they are not a
/// validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    DisplayName,
    Themes,
    Topics,
    Duration,
    SourceName,
    RecordTime,
    PublishTime,
    Topic,
}

pub fn known_placeholders() -> &'static [&'static str] {
    &[
        "display_name",
        "themes",
        "topics",
        "duration",
        "source_name",
        "record_time",
        "publish_time",
        "topic",
    ]
}

/// Valid inline format tokens for `{record_time[:fmt]}` / `{publish_time[:fmt]}`.
const FMT_TOKENS: &[&str] = &["DD", "MM", "YY", "YYYY", "hh", "mm", "ss", "date", "time", "datetime"];

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-zA-Z_]+)(:[^}]*)?\}").unwrap())
}

/// Validate brace syntax and, for the two templated placeholders
/// (`record_time`, `publish_time`), that every `:fmt` token used is one of
/// the recognized tokens. Returns `Err` describing the first problem found.
pub fn validate_template_string(template: &str) -> Result<(), String> {
    let mut depth = 0i32;
    for ch in template.chars() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err("unmatched '}' in template".to_string());
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unmatched '{' in template".to_string());
    }

    for caps in placeholder_re().captures_iter(template) {
        let name = &caps[1];
        if name != "record_time" && name != "publish_time" {
            continue;
        }
        if let Some(fmt_match) = caps.get(2) {
            let fmt = fmt_match.as_str().trim_start_matches(':');
            for token in split_fmt_tokens(fmt) {
                if !FMT_TOKENS.contains(&token.as_str()) {
                    return Err(format!("unknown format token '{}' in {{{}}}", token, name));
                }
            }
        }
    }

    Ok(())
}

fn split_fmt_tokens(fmt: &str) -> Vec<String> {
    // Tokens are letter runs; separators (. / : -) are literal passthrough.
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in fmt.chars() {
        if ch.is_ascii_alphabetic() {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_placeholders_with_no_fmt() {
        assert!(validate_template_string("{display_name} - {themes}").is_ok());
    }

    #[test]
    fn accepts_valid_record_time_fmt() {
        assert!(validate_template_string("{record_time:DD.MM.YYYY}").is_ok());
    }

    #[test]
    fn rejects_unknown_fmt_token() {
        let err = validate_template_string("{record_time:XX.MM.YYYY}").unwrap_err();
        assert!(err.contains("XX"));
    }

    #[test]
    fn unknown_placeholder_name_is_not_an_error() {
        assert!(validate_template_string("{unknown_thing}").is_ok());
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert!(validate_template_string("{display_name").is_err());
        assert!(validate_template_string("display_name}").is_err());
    }
}
