//! Reference data encoding.
//!
//! Reference values are escaped (`\` becomes `\\`, `,` becomes `\,`) and
//! joined with `,`. [`split`] reverses both steps.

/// Escape one reference value.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == ',' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape and join reference values.
pub fn join<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| escape(value.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a joined reference string back into its unescaped values.
///
/// Only commas not preceded by an escaping backslash delimit values.
pub fn split(reference: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut chars = reference.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            ',' => values.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    values.push(current);
    values
}
