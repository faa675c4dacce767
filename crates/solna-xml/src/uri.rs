#![forbid(unsafe_code)]

//! Same-document URI references used by XML-DSig.
//!
//! Only the forms that appear in a Reference's `URI` attribute are
//! handled:
//! - `""` and `#xpointer(/)`: the whole document
//! - `#id-value`: a bare-name pointer to an element ID
//! - `#xpointer(id('id-value'))`: the scheme-based equivalent

/// Whether the URI selects the whole document.
pub fn is_document_ref(uri: &str) -> bool {
    let uri = uri.trim();
    uri.is_empty() || uri == "#xpointer(/)"
}

/// Whether the URI is a scheme-based XPointer (`#xpointer(...)`).
pub fn is_xpointer(uri: &str) -> bool {
    uri.starts_with("#xpointer(")
}

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}

/// Parse an `xpointer(id('...'))` expression and return the ID value.
///
/// Both quote styles are accepted.
pub fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id(")?.strip_suffix("))")?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

/// Resolve a reference URI to the ID it points at, if it names one.
pub fn referenced_id(uri: &str) -> Option<&str> {
    let fragment = parse_same_document_ref(uri)?;
    if fragment.starts_with("xpointer(") {
        parse_xpointer_id(fragment)
    } else if fragment.is_empty() {
        None
    } else {
        Some(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_refs() {
        assert!(is_document_ref(""));
        assert!(is_document_ref("#xpointer(/)"));
        assert!(!is_document_ref("#abc"));
    }

    #[test]
    fn test_referenced_id() {
        assert_eq!(referenced_id("#abc"), Some("abc"));
        assert_eq!(referenced_id("#xpointer(id('abc'))"), Some("abc"));
        assert_eq!(referenced_id("#xpointer(id(\"abc\"))"), Some("abc"));
        assert_eq!(referenced_id("#xpointer(/)"), None);
        assert_eq!(referenced_id("abc"), None);
        assert!(is_xpointer("#xpointer(id('abc'))"));
        assert!(!is_xpointer("#abc"));
    }
}
