/// Code point → physical key table for on-screen keyboard commits.
///
/// Maps a committed character to the US-layout key that produces it and
/// whether SHIFT has to be held. Characters outside the table have no key.
use msx_events::KeyCode;

/// Key for `c`, plus whether it needs SHIFT.
pub fn key_for_char(c: char) -> Option<(KeyCode, bool)> {
    match c {
        '\n' | '\r' => return Some((KeyCode::RETURN, false)),
        '\t' => return Some((KeyCode::TAB, false)),
        ' ' => return Some((KeyCode::SPACE, false)),
        _ => {}
    }
    if let Some(key) = KeyCode::letter(c) {
        return Some((key, false));
    }
    if c.is_ascii_uppercase() {
        return KeyCode::letter(c.to_ascii_lowercase()).map(|key| (key, true));
    }
    if let Some(key) = KeyCode::digit(c) {
        return Some((key, false));
    }
    let unshifted = match c {
        '\'' => Some(KeyCode::QUOTE),
        '`' => Some(KeyCode::BACKQUOTE),
        '-' => Some(KeyCode::MINUS),
        '=' => Some(KeyCode::EQUALS),
        '[' => Some(KeyCode::LEFTBRACKET),
        ']' => Some(KeyCode::RIGHTBRACKET),
        '\\' => Some(KeyCode::BACKSLASH),
        ';' => Some(KeyCode::SEMICOLON),
        ',' => Some(KeyCode::COMMA),
        '.' => Some(KeyCode::PERIOD),
        '/' => Some(KeyCode::SLASH),
        _ => None,
    };
    if let Some(key) = unshifted {
        return Some((key, false));
    }
    let shifted = match c {
        '"' => KeyCode::QUOTE,
        '^' => KeyCode::NUM_6,
        '~' => KeyCode::BACKQUOTE,
        '!' => KeyCode::NUM_1,
        '@' => KeyCode::NUM_2,
        '#' => KeyCode::NUM_3,
        '$' => KeyCode::NUM_4,
        '%' => KeyCode::NUM_5,
        '&' => KeyCode::NUM_7,
        '*' => KeyCode::NUM_8,
        '(' => KeyCode::NUM_9,
        ')' => KeyCode::NUM_0,
        '_' => KeyCode::MINUS,
        '+' => KeyCode::EQUALS,
        '{' => KeyCode::LEFTBRACKET,
        '}' => KeyCode::RIGHTBRACKET,
        '|' => KeyCode::BACKSLASH,
        ':' => KeyCode::SEMICOLON,
        '<' => KeyCode::COMMA,
        '>' => KeyCode::PERIOD,
        '?' => KeyCode::SLASH,
        _ => return None,
    };
    Some((shifted, true))
}
