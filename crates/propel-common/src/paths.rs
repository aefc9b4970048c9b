//! Helpers for dotted package paths ("ui.login.attempts").

/// All strict ancestor packages of a dotted identifier, outermost last.
/// "a.b.c" yields ["a", "a.b"]; a bare name yields nothing.
pub fn subpackages_of(identifier: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (i, b) in identifier.bytes().enumerate() {
        if b == b'.' {
            out.push(identifier[..i].to_string());
        }
    }
    out
}

/// Ancestor packages plus the identifier itself.
pub fn package_and_subpackages_of(identifier: &str) -> Vec<String> {
    let mut out = subpackages_of(identifier);
    out.push(identifier.to_string());
    out
}

/// Splits "a.b.c" into ("a.b", "c"). A bare name maps to ("", name).
pub fn split_last_segment(identifier: &str) -> (&str, &str) {
    match identifier.rfind('.') {
        Some(i) => (&identifier[..i], &identifier[i + 1..]),
        None => ("", identifier),
    }
}

/// Uppercases the first character; ASCII identifiers only in practice.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
