//! `$name` / `${name}` substitution over prompt fragments.
//!
//! Substitution is always "safe": placeholders with no value in the mapping, and anything that
//! only looks like a placeholder, are copied through untouched.

use std::collections::BTreeMap;

use serde_json::Value;

/// Placeholder name -> value. Non-string values are rendered as compact JSON.
pub type TemplateVars = BTreeMap<String, Value>;

/// Builds a [`TemplateVars`] from `(name, value)` pairs.
pub fn vars<I, K, V>(pairs: I) -> TemplateVars
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Canonical text form of a template value.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Length in bytes of the identifier at the start of `s` (0 if none).
fn ident_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Substitutes every known placeholder in `template`.
pub fn substitute(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        // `$$` escapes a literal dollar.
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        // `${name}`
        if let Some(braced) = after.strip_prefix('{') {
            let n = ident_len(braced);
            if n > 0
                && braced[n..].starts_with('}')
                && let Some(value) = vars.get(&braced[..n])
            {
                out.push_str(&render_value(value));
                rest = &braced[n + 1..];
                continue;
            }
            out.push('$');
            rest = after;
            continue;
        }

        // `$name`
        let n = ident_len(after);
        if n > 0
            && let Some(value) = vars.get(&after[..n])
        {
            out.push_str(&render_value(value));
            rest = &after[n..];
            continue;
        }

        out.push('$');
        rest = after;
    }

    out.push_str(rest);
    out
}
