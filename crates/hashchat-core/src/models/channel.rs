//! Channel name rules shared by user input and relay-sourced tags.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::SECONDARY_CHANNEL_PREFIX;

static CHANNEL_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[\p{L}\p{N}]{1,12}|_)$").expect("channel name regex should compile")
});

/// A channel name is `_`, or 1 to 12 Unicode letters/digits and nothing else.
pub fn is_valid_channel_name(name: &str) -> bool {
    name == "_" || CHANNEL_NAME_REGEX.is_match(name)
}

/// Turn user-typed channel input into a registry identifier.
///
/// Leading `#` markers are dropped. Names in the geohash namespace (`bc_<name>`)
/// are accepted when the part after the prefix is itself valid, so channels
/// derived from geohash messages can be selected by hand.
pub fn normalize_channel_input(input: &str) -> Option<String> {
    let bare = input.trim().trim_start_matches('#');
    if is_valid_channel_name(bare) {
        return Some(format!("#{}", bare));
    }

    let geo_prefix = &SECONDARY_CHANNEL_PREFIX[1..];
    match bare.strip_prefix(geo_prefix) {
        Some(geo) if is_valid_channel_name(geo) && geo != "_" => Some(format!("#{}", bare)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_is_the_only_symbol_allowed() {
        assert!(is_valid_channel_name("_"));
        assert!(!is_valid_channel_name("__"));
        assert!(!is_valid_channel_name("a_b"));
    }

    #[test]
    fn test_letters_and_digits_up_to_twelve() {
        assert!(is_valid_channel_name("general"));
        assert!(is_valid_channel_name("zone1"));
        assert!(is_valid_channel_name("123456789012"));
        assert!(!is_valid_channel_name("1234567890123"));
    }

    #[test]
    fn test_unicode_letters_count_as_characters() {
        assert!(is_valid_channel_name("日本語"));
        assert!(is_valid_channel_name("ñandú"));
        // twelve two-byte characters is still twelve characters
        assert!(is_valid_channel_name("ääääääääääää"));
        assert!(!is_valid_channel_name("äääääääääääää"));
    }

    #[test]
    fn test_rejects_empty_symbols_and_control_characters() {
        assert!(!is_valid_channel_name(""));
        assert!(!is_valid_channel_name("bad!name"));
        assert!(!is_valid_channel_name("two words"));
        assert!(!is_valid_channel_name("line\nbreak"));
        assert!(!is_valid_channel_name("#general"));
        assert!(!is_valid_channel_name("a-b"));
    }

    #[test]
    fn test_normalize_strips_leading_marker() {
        assert_eq!(normalize_channel_input("general"), Some("#general".to_string()));
        assert_eq!(normalize_channel_input("#general"), Some("#general".to_string()));
        assert_eq!(normalize_channel_input("_"), Some("#_".to_string()));
        assert_eq!(normalize_channel_input("bad!name"), None);
        assert_eq!(normalize_channel_input(""), None);
    }

    #[test]
    fn test_normalize_accepts_geohash_namespace() {
        assert_eq!(normalize_channel_input("#bc_zone1"), Some("#bc_zone1".to_string()));
        assert_eq!(normalize_channel_input("bc_"), None);
        assert_eq!(normalize_channel_input("bc__"), None);
        assert_eq!(normalize_channel_input("bc_bad!"), None);
    }
}
