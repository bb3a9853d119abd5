//! Address-prefix routing between the two sites

/// Which of the two routers owns an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    /// Router A
    Primary,
    /// Router B
    Secondary,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Primary => "primary",
            Site::Secondary => "secondary",
        }
    }
}

/// Checked in order; the first matching prefix wins.
/// Each prefix ends at an octet boundary so `192.168.` never matches `192.1680.`.
const PREFIX_RULES: [(&str, Site); 4] = [
    ("193.168.", Site::Secondary),
    ("192.168.", Site::Primary),
    ("123.123.", Site::Primary),
    ("172.16.", Site::Primary),
];

/// Map a dotted IPv4 string to its site by plain byte-prefix comparison
pub fn select_site(ip: &str) -> Option<Site> {
    PREFIX_RULES
        .iter()
        .find(|(prefix, _)| ip.starts_with(prefix))
        .map(|(_, site)| *site)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_prefixes() {
        assert_eq!(select_site("192.168.1.50"), Some(Site::Primary));
        assert_eq!(select_site("123.123.0.9"), Some(Site::Primary));
        assert_eq!(select_site("172.16.200.1"), Some(Site::Primary));
    }

    #[test]
    fn test_secondary_prefix() {
        assert_eq!(select_site("193.168.10.7"), Some(Site::Secondary));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(select_site("10.0.0.1"), None);
        assert_eq!(select_site("172.17.0.1"), None);
        assert_eq!(select_site(""), None);
    }

    #[test]
    fn test_prefix_must_start_at_first_byte() {
        assert_eq!(select_site("1193.168.1.1"), None);
        assert_eq!(select_site("0192.168.1.1"), None);
    }

    #[test]
    fn test_prefix_respects_octet_boundary() {
        assert_eq!(select_site("192.1680.1.1"), None);
        assert_eq!(select_site("172.160.0.1"), None);
        assert_eq!(select_site("193.168"), None);
    }

    #[test]
    fn test_case_and_whitespace_are_not_normalized() {
        assert_eq!(select_site(" 192.168.1.1"), None);
    }
}
