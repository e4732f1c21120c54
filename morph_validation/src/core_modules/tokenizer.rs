// THEORY:
// The tokenizer is the small shared helper used to pull fields out of manifest
// lines. It is deliberately not `str::split`: runs of delimiters collapse into a
// single boundary, and an input with no usable token comes back whole as a
// single element. Callers index into the result, so it is never empty.

/// Splits `text` on `delimiter`, dropping empty tokens.
///
/// If no token survives (no delimiter at all, or nothing but delimiters), the
/// original input is returned unchanged as the only element. That includes the
/// empty string, which yields `[""]`.
pub fn split(text: &str, delimiter: char) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch == delimiter {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    if tokens.is_empty() {
        tokens.push(text.to_string());
    }

    tokens
}
