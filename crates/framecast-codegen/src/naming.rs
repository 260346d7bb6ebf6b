//! Identifier helpers shared by the emitters

use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]+").unwrap());

/// `profile card` -> `ProfileCard`. Empty when the input has no usable
/// characters; prefixed with `C` when it would start with a digit.
pub fn pascal_case(raw: &str) -> String {
    let joined: String = WORD
        .find_iter(raw)
        .map(|word| {
            let mut chars = word.as_str().chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if joined.starts_with(|c: char| c.is_ascii_digit()) {
        format!("C{}", joined)
    } else {
        joined
    }
}

/// `Button Label` -> `buttonLabel`
pub fn camel_case(raw: &str) -> String {
    let pascal = pascal_case(raw);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `color/Primary 500` -> `color-primary-500`
pub fn slug(raw: &str) -> String {
    WORD.find_iter(raw)
        .map(|word| word.as_str().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Style-rule key for a node: `Title` + `1:2` -> `title_1_2`
pub fn style_key(name: &str, id: &str) -> String {
    let starts_with_word = WORD
        .find(name)
        .is_some_and(|word| !word.as_str().starts_with(|c: char| c.is_ascii_digit()));
    let base = if starts_with_word {
        camel_case(name)
    } else {
        "node".to_string()
    };
    let suffix = WORD
        .find_iter(id)
        .map(|word| word.as_str())
        .collect::<Vec<_>>()
        .join("_");
    format!("{}_{}", base, suffix)
}

/// Component identifier for a run, falling back to `GeneratedComponent`
pub fn component_identifier(raw: &str) -> String {
    let name = pascal_case(raw);
    if name.is_empty() {
        "GeneratedComponent".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("profile card", "ProfileCard")]
    #[case("ProfileCard", "ProfileCard")]
    #[case("button/primary", "ButtonPrimary")]
    #[case("1:1", "C11")]
    #[case("!!", "")]
    fn test_pascal_case(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(pascal_case(raw), expected);
    }

    #[test]
    fn test_camel_case_strips_separators() {
        assert_eq!(camel_case("Button Label"), "buttonLabel");
        assert_eq!(camel_case("has-icon"), "hasIcon");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("color/Primary 500"), "color-primary-500");
    }

    #[test]
    fn test_style_key() {
        assert_eq!(style_key("Title", "1:2"), "title_1_2");
        assert_eq!(style_key("", "1:2"), "node_1_2");
        assert_eq!(style_key("1:1", "1:1"), "node_1_1");
    }

    #[test]
    fn test_component_identifier_fallback() {
        assert_eq!(component_identifier("---"), "GeneratedComponent");
        assert_eq!(component_identifier("login screen"), "LoginScreen");
    }
}
