//! Metric label normalization
//!
//! Resource tag keys are free-form (`kubernetes.io/cluster`, `CostCenter`).
//! Prometheus label names only allow `[a-zA-Z0-9_]`, so tag keys are turned
//! into snake_case label names before they are used in a descriptor. Tag
//! values are never normalized.

/// Convert `s` into a valid snake_case prometheus label name.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, a `_` is inserted at
/// each lowercase/digit to uppercase boundary, and the result is lowercased.
/// The transform is idempotent.
pub fn to_prometheus_naming_format(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;

    for c in s.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' };

        if c.is_ascii_uppercase()
            && matches!(prev, Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
        prev = Some(c);
    }

    out
}

/// Whether `name` can be used as a prometheus label name.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
