//! Syntax predicates for addresses and hosts.
//!
//! These are pure checks used by the SMTP engine before any I/O happens:
//! nothing here resolves names or touches the network.

/// Checks that `s` is made only of ASCII alphanumerics and the characters in
/// `extra`.
fn is_alnum_plus(s: &str, extra: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || extra.contains(c))
}

/// Tells whether `s` is a syntactically valid IPv4 literal.
pub fn is_valid_ipv4(s: &str) -> bool {
    s.parse::<std::net::Ipv4Addr>().is_ok()
}

/// Tells whether `s` is a syntactically valid hostname.
///
/// Requires at least two dot-separated labels, no empty labels, no label
/// starting or ending with `-`, and an alphabetic top-level label of 2 to 6
/// characters.
pub fn is_valid_hostname(s: &str) -> bool {
    if !is_alnum_plus(s, "-.") {
        return false;
    }
    let labels: Vec<&str> = s.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    for label in &labels {
        if label.is_empty() || label.starts_with('-') || label.ends_with('-') {
            return false;
        }
    }
    let tld = labels[labels.len() - 1];
    (2..=6).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Tells whether `s` is a syntactically valid email address.
///
/// The local part may contain alphanumerics and `_-.+`; the domain must be a
/// valid hostname or an IPv4 literal.
pub fn is_valid_email(s: &str) -> bool {
    let mut parts = s.splitn(2, '@');
    let (local, domain) = match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => (local, domain),
        _ => return false,
    };
    if domain.contains('@') {
        return false;
    }
    is_alnum_plus(local, "_-.+") && (is_valid_hostname(domain) || is_valid_ipv4(domain))
}

/// Tells whether `s` names a host the SMTP engine will connect to:
/// `localhost`, an IPv4 literal, or a valid hostname.
pub fn is_valid_host(s: &str) -> bool {
    s == "localhost" || is_valid_ipv4(s) || is_valid_hostname(s)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ipv4() {
        assert!(is_valid_ipv4("127.0.0.1"));
        assert!(is_valid_ipv4("255.255.255.255"));
        assert!(!is_valid_ipv4("256.0.0.1"));
        assert!(!is_valid_ipv4("1.2.3"));
        assert!(!is_valid_ipv4("a.b.c.d"));
        assert!(!is_valid_ipv4(""));
    }

    #[test]
    fn hostname() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("mx-1.mail.example.org"));
        assert!(!is_valid_hostname("localhost"));
        assert!(!is_valid_hostname("example..com"));
        assert!(!is_valid_hostname("example-.com"));
        assert!(!is_valid_hostname("example.-com"));
        assert!(!is_valid_hostname("example.c"));
        assert!(!is_valid_hostname("example.1234"));
        assert!(!is_valid_hostname("exa_mple.com"));
        assert!(!is_valid_hostname(""));
    }

    #[test]
    fn email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(is_valid_email("user@127.0.0.1"));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email("user@localhost"));
    }

    #[test]
    fn host() {
        assert!(is_valid_host("localhost"));
        assert!(is_valid_host("10.0.0.1"));
        assert!(is_valid_host("smtp.example.com"));
        assert!(!is_valid_host("not a host"));
    }
}
