//! Case conversions for grammar names (snake_case, with the odd `_hidden` or
//! `camelCase` entry) into Java names.

/// `first_second` → `firstSecond`; the character after each `_` is upper-cased.
pub fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '_' {
            if let Some(next) = chars.next() {
                out.extend(next.to_uppercase());
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `firstSecond` / `first_second` → `FIRST_SECOND`.
///
/// A `_` is inserted at each switch from a lower case letter to anything
/// else; a `_` or `-` right at that switch is consumed by it.
pub fn constant_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut was_lower = false;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        let is_lower = c.is_lowercase();
        if was_lower && !is_lower {
            out.push('_');
            if c == '_' || c == '-' {
                // the separator itself is replaced; the char after it is
                // copied without looking at its case
                if let Some(next) = chars.next() {
                    out.push(next);
                }
                was_lower = false;
                continue
            }
        }
        out.push(c);
        was_lower = is_lower;
    }
    out.to_uppercase()
}

/// Grammar type name → UpperCamel, dropping the leading `_` of hidden types.
pub fn type_name_to_upper_camel(type_name: &str) -> String {
    let type_name = type_name.strip_prefix('_').unwrap_or(type_name);
    upper_first(&snake_to_camel(type_name))
}
