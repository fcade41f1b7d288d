// src/sources/lines.rs

//! Best-effort line lookups for formats whose parsers do not report positions.
//! Every function returns `None` instead of failing; callers fall back to line `0`.

/// Converts a byte offset into a 1-based line number.
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()
        .get(..end)
        .map_or(0, |head| head.iter().filter(|&&b| b == b'\n').count())
        + 1
}

/// Finds the line declaring `"key":` inside the `"block":` object at the root of a JSON
/// document. Objects named `block` at any other depth are ignored.
pub fn locate_json_key(text: &str, block: &str, key: &str) -> Option<usize> {
    let mut chars = text.chars();
    let mut line = 1;
    let mut depth = 0usize;
    // The last string literal and the line it started on, until something other than
    // whitespace or `:` follows it.
    let mut last_string: Option<(String, usize)> = None;
    let mut awaiting_block = false;
    let mut in_block = false;

    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                line += 1;
                continue;
            }
            c if c.is_whitespace() => continue,
            '"' => {
                let start = line;
                last_string = Some((read_string(&mut chars, &mut line), start));
                awaiting_block = false;
                continue;
            }
            ':' => {
                if let Some((name, name_line)) = last_string.take() {
                    if in_block && depth == 2 && name == key {
                        return Some(name_line);
                    }
                    awaiting_block = !in_block && depth == 1 && name == block;
                }
                continue;
            }
            '{' => {
                depth += 1;
                in_block |= awaiting_block;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if in_block && depth < 2 {
                    return None;
                }
            }
            _ => {}
        }
        awaiting_block = false;
        last_string = None;
    }
    None
}

/// Consumes a string literal whose opening quote was already read and returns its raw
/// contents, counting the newlines it spans.
fn read_string(chars: &mut std::str::Chars<'_>, line: &mut usize) -> String {
    let mut literal = String::new();
    let mut escaped = false;
    for c in chars.by_ref() {
        if c == '\n' {
            *line += 1;
        }
        match c {
            _ if escaped => {
                literal.push(c);
                escaped = false;
            }
            '\\' => escaped = true,
            '"' => break,
            _ => literal.push(c),
        }
    }
    literal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_of_offset() {
        let text = "a\nbb\nccc";
        assert_eq!(line_of_offset(text, 0), 1);
        assert_eq!(line_of_offset(text, 2), 2);
        assert_eq!(line_of_offset(text, 5), 3);
        assert_eq!(line_of_offset(text, 999), 3);
    }

    #[test]
    fn test_locate_json_key_inside_scripts_block() {
        let text = r#"{
  "name": "demo",
  "config": { "build": "not a script" },
  "scripts": {
    "build": "tsc -p .",
    "fmt": "prettier --write '{src,test}/**'",
    "test": "jest"
  },
  "test": true
}"#;
        assert_eq!(locate_json_key(text, "scripts", "build"), Some(5));
        assert_eq!(locate_json_key(text, "scripts", "test"), Some(7));
        assert_eq!(locate_json_key(text, "scripts", "missing"), None);
    }

    #[test]
    fn test_locate_json_key_ignores_nested_blocks() {
        let text = r#"{
  "workspaces": {
    "scripts": { "build": "nested" }
  },
  "scripts":

  {
    "lint": "eslint .",
    "build": "tsc"
  }
}"#;
        assert_eq!(locate_json_key(text, "scripts", "build"), Some(9));
        assert_eq!(locate_json_key(text, "scripts", "lint"), Some(8));
    }

    #[test]
    fn test_locate_json_key_skips_string_values_named_like_the_block() {
        let text = "{\n  \"name\": \"scripts\",\n  \"scripts\": {\"dev\": \"vite\"}\n}";
        assert_eq!(locate_json_key(text, "scripts", "dev"), Some(3));
        assert_eq!(locate_json_key(text, "scripts", "name"), None);
    }

    #[test]
    fn test_locate_json_key_without_block() {
        assert_eq!(locate_json_key("{\"name\": \"x\"}", "scripts", "x"), None);
    }
}
