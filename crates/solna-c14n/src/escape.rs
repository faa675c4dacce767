#![forbid(unsafe_code)]

//! Character escaping for canonical output.
//!
//! - Text nodes: `&`, `<`, `>` and `\r` are replaced by references
//! - Attribute values: `&`, `<`, `"`, `\t`, `\n` and `\r`
//! - Processing instruction data: `\r` only

/// Append text node content, escaped.
pub fn push_text(out: &mut Vec<u8>, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '\r' => out.extend_from_slice(b"&#xD;"),
            _ => push_char(out, ch),
        }
    }
}

/// Append an attribute value, escaped.
pub fn push_attr(out: &mut Vec<u8>, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '"' => out.extend_from_slice(b"&quot;"),
            '\t' => out.extend_from_slice(b"&#x9;"),
            '\n' => out.extend_from_slice(b"&#xA;"),
            '\r' => out.extend_from_slice(b"&#xD;"),
            _ => push_char(out, ch),
        }
    }
}

/// Append processing instruction data, escaped.
pub fn push_pi(out: &mut Vec<u8>, s: &str) {
    for ch in s.chars() {
        if ch == '\r' {
            out.extend_from_slice(b"&#xD;");
        } else {
            push_char(out, ch);
        }
    }
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> String {
        let mut out = Vec::new();
        push_text(&mut out, s);
        String::from_utf8(out).unwrap()
    }

    fn attr(s: &str) -> String {
        let mut out = Vec::new();
        push_attr(&mut out, s);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_references() {
        assert_eq!(text("plain é"), "plain é");
        assert_eq!(text("a&b<c>d\r"), "a&amp;b&lt;c&gt;d&#xD;");
    }

    #[test]
    fn test_attr_references() {
        assert_eq!(attr("x>y"), "x>y");
        assert_eq!(attr("\"q\"\t\n\r&<"), "&quot;q&quot;&#x9;&#xA;&#xD;&amp;&lt;");
    }
}
