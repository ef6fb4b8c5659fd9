//! Text-level JSON repair and extraction.
//!
//! Embedded page state and model replies are frequently "almost JSON".
//! These helpers run before `serde_json` so extractors can stay strict.

/// Best-effort repair of JavaScript-flavored JSON.
///
/// Outside string literals, bare `undefined` becomes `null` and trailing
/// commas before `}` or `]` are dropped. String contents are never touched.
pub fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            'u' if is_bare_word(&chars, i, "undefined") => {
                out.push_str("null");
                i += "undefined".len();
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

fn is_bare_word(chars: &[char], at: usize, word: &str) -> bool {
    let len = word.chars().count();
    if at + len > chars.len() {
        return false;
    }
    if !chars[at..at + len].iter().copied().eq(word.chars()) {
        return false;
    }
    let boundary =
        |c: Option<&char>| c.map_or(true, |c| !(c.is_alphanumeric() || *c == '_' || *c == '$'));
    let before = if at == 0 { None } else { chars.get(at - 1) };
    boundary(before) && boundary(chars.get(at + len))
}

/// Return the first balanced `{...}` region in `text`.
///
/// Braces inside string literals are ignored, so prose or markdown fences
/// around the object do not matter. A `{` that never closes is skipped and
/// the scan resumes at the next one.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(found) = text[from..].find('{') {
        let start = from + found;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        from = start + 1;
    }
    None
}

/// Byte length of the balanced object that `text` starts with.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    None
}
