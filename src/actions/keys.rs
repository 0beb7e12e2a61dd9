//! Key value normalization.
//!
//! WebDriver encodes non-printable keys as private-use code points
//! (U+E000..U+E05D). A raw key value is accepted either as exactly one code
//! point, or as one of the names below, which is mapped to its code point.

/// Named keys and their normalized code points.
const NAMED_KEYS: &[(&str, char)] = &[
    ("Unidentified", '\u{E000}'),
    ("Cancel", '\u{E001}'),
    ("Help", '\u{E002}'),
    ("Backspace", '\u{E003}'),
    ("Tab", '\u{E004}'),
    ("Clear", '\u{E005}'),
    ("Return", '\u{E006}'),
    ("Enter", '\u{E007}'),
    ("Shift", '\u{E008}'),
    ("Control", '\u{E009}'),
    ("Alt", '\u{E00A}'),
    ("Pause", '\u{E00B}'),
    ("Escape", '\u{E00C}'),
    ("Space", '\u{E00D}'),
    ("PageUp", '\u{E00E}'),
    ("PageDown", '\u{E00F}'),
    ("End", '\u{E010}'),
    ("Home", '\u{E011}'),
    ("ArrowLeft", '\u{E012}'),
    ("ArrowUp", '\u{E013}'),
    ("ArrowRight", '\u{E014}'),
    ("ArrowDown", '\u{E015}'),
    ("Insert", '\u{E016}'),
    ("Delete", '\u{E017}'),
    ("Semicolon", '\u{E018}'),
    ("Equals", '\u{E019}'),
    ("Numpad0", '\u{E01A}'),
    ("Numpad1", '\u{E01B}'),
    ("Numpad2", '\u{E01C}'),
    ("Numpad3", '\u{E01D}'),
    ("Numpad4", '\u{E01E}'),
    ("Numpad5", '\u{E01F}'),
    ("Numpad6", '\u{E020}'),
    ("Numpad7", '\u{E021}'),
    ("Numpad8", '\u{E022}'),
    ("Numpad9", '\u{E023}'),
    ("Multiply", '\u{E024}'),
    ("Add", '\u{E025}'),
    ("Separator", '\u{E026}'),
    ("Subtract", '\u{E027}'),
    ("Decimal", '\u{E028}'),
    ("Divide", '\u{E029}'),
    ("F1", '\u{E031}'),
    ("F2", '\u{E032}'),
    ("F3", '\u{E033}'),
    ("F4", '\u{E034}'),
    ("F5", '\u{E035}'),
    ("F6", '\u{E036}'),
    ("F7", '\u{E037}'),
    ("F8", '\u{E038}'),
    ("F9", '\u{E039}'),
    ("F10", '\u{E03A}'),
    ("F11", '\u{E03B}'),
    ("F12", '\u{E03C}'),
    ("Meta", '\u{E03D}'),
    ("ZenkakuHankaku", '\u{E040}'),
    ("RightShift", '\u{E050}'),
    ("RightControl", '\u{E051}'),
    ("RightAlt", '\u{E052}'),
    ("RightMeta", '\u{E053}'),
];

/// Which modifier a key value toggles, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Shift,
    Control,
    Alt,
    Meta,
}

/// Normalize a raw key value. Returns `None` when it is neither a single code
/// point nor a recognized key name.
pub fn normalize_key(raw: &str) -> Option<String> {
    let mut chars = raw.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c.to_string());
    }
    NAMED_KEYS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map(|(_, c)| c.to_string())
}

/// Modifier toggled by a normalized key value.
pub fn modifier_of(key: &str) -> Option<Modifier> {
    match key {
        "\u{E008}" | "\u{E050}" => Some(Modifier::Shift),
        "\u{E009}" | "\u{E051}" => Some(Modifier::Control),
        "\u{E00A}" | "\u{E052}" => Some(Modifier::Alt),
        "\u{E03D}" | "\u{E053}" => Some(Modifier::Meta),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_code_points_pass_through() {
        assert_eq!(normalize_key("a").as_deref(), Some("a"));
        assert_eq!(normalize_key("é").as_deref(), Some("é"));
        assert_eq!(normalize_key("\u{E007}").as_deref(), Some("\u{E007}"));
    }

    #[test]
    fn names_map_to_private_use_points() {
        assert_eq!(normalize_key("Enter").as_deref(), Some("\u{E007}"));
        assert_eq!(normalize_key("shift").as_deref(), Some("\u{E008}"));
        assert_eq!(normalize_key("F12").as_deref(), Some("\u{E03C}"));
    }

    #[test]
    fn rejects_empty_and_multi_char_values() {
        assert_eq!(normalize_key(""), None);
        assert_eq!(normalize_key("ab"), None);
        assert_eq!(normalize_key("NotAKey"), None);
    }

    #[test]
    fn modifiers_cover_both_sides() {
        assert_eq!(modifier_of("\u{E008}"), Some(Modifier::Shift));
        assert_eq!(modifier_of("\u{E053}"), Some(Modifier::Meta));
        assert_eq!(modifier_of("a"), None);
    }
}
