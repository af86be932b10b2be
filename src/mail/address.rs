//! Heuristics over raw `From` header values.

use std::sync::LazyLock;

use regex::Regex;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("bracketed address pattern compiles"));

/// The content of the first non-empty `<...>` pair, or the whole value
/// trimmed when there is none.
///
/// `"Jane Doe" <jane@example.com>` gives `jane@example.com`.
pub fn extract_address(from: &str) -> &str {
    BRACKETED
        .captures(from)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
        .unwrap_or_else(|| from.trim())
}

/// Everything after the last `@` of the extracted address, as written.
pub fn extract_domain(from: &str) -> Option<&str> {
    extract_address(from)
        .rsplit_once('@')
        .map(|(_, domain)| domain)
}

/// Grouping key for sender counts: the lower-cased address when it looks
/// like one (an `@` followed by a dotted domain), otherwise the whole raw
/// header lower-cased.
pub fn sender_key(from: &str) -> String {
    let address = extract_address(from);
    match address.rsplit_once('@') {
        Some((_, domain)) if domain.contains('.') => address.to_lowercase(),
        _ => from.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bracketed_address() {
        assert_eq!(
            extract_address("\"Jane Doe\" <jane@example.com>"),
            "jane@example.com"
        );
        assert_eq!(extract_domain("\"Jane Doe\" <jane@example.com>"), Some("example.com"));
    }

    #[test]
    fn falls_back_to_trimmed_value() {
        assert_eq!(extract_address("  bob@example.org \t"), "bob@example.org");
        assert_eq!(extract_address("Mailer Daemon"), "Mailer Daemon");
    }

    #[test]
    fn skips_empty_brackets() {
        assert_eq!(extract_address("<> Team <team@example.net>"), "team@example.net");
    }

    #[test]
    fn domain_uses_last_at_sign() {
        assert_eq!(extract_domain("odd@name@mail.example.com"), Some("mail.example.com"));
        assert_eq!(extract_domain("No Address Here"), None);
    }

    #[test]
    fn domain_keeps_original_case() {
        assert_eq!(extract_domain("News <news@Example.COM>"), Some("Example.COM"));
    }

    #[test]
    fn sender_key_lowercases_addresses() {
        assert_eq!(sender_key("News <News@Example.COM>"), "news@example.com");
    }

    #[test]
    fn sender_key_keeps_whole_header_without_dotted_domain() {
        assert_eq!(sender_key("Root <root@localhost>"), "root <root@localhost>");
        assert_eq!(sender_key("Mailer Daemon"), "mailer daemon");
    }
}
