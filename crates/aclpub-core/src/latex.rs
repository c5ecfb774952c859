//! String helpers for text that ends up inside LaTeX templates.

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Escape the handful of characters that routinely break the templates.
///
/// Also repairs the UTF-8/CP-1252 mojibake for a right single quote that
/// shows up in metadata exported from submission systems.
pub fn normalize_latex_string(text: &str) -> String {
    text.replace("â€™", "'")
        .replace('&', "\\&")
        .replace('_', "\\_")
}

/// Normalize every string stored directly in a JSON object, leaving other values untouched.
pub fn normalize_string_fields(map: &mut serde_json::Map<String, Value>) {
    for value in map.values_mut() {
        if let Value::String(text) = value {
            *text = normalize_latex_string(text);
        }
    }
}

/// Lower-cased index letter for a name, with diacritics folded away.
///
/// The first character is decomposed (NFKD) and its base letter kept. Stroked letters
/// have no decomposition and are mapped to their base by hand. Returns `None` for an
/// empty name.
pub fn index_letter(name: &str) -> Option<char> {
    let base = name.trim_start().nfkd().find(|c| !is_combining_mark(*c))?;
    let lower = base.to_lowercase().next().unwrap_or(base);
    Some(match lower {
        'ł' => 'l',
        'ø' => 'o',
        'đ' => 'd',
        'ı' => 'i',
        other => other,
    })
}
