//! Interpreter version matching.
//!
//! `lumo --version` output is free text; the first whitespace-separated token
//! that parses as semver is taken as the installed version and compared
//! exactly against the required one.

use semver::Version;

/// Extract the first semver-looking token from version output.
pub fn parse_reported(output: &str) -> Option<Version> {
    output
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|token| token.trim_start_matches('v'))
        .find_map(|token| Version::parse(token).ok())
}

/// True when the reported version is exactly the required one.
pub fn matches(required: &Version, reported_output: &str) -> bool {
    parse_reported(reported_output).is_some_and(|installed| &installed == required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reported() {
        assert_eq!(
            parse_reported("Lumo 1.8.0-beta\n"),
            Some(Version::parse("1.8.0-beta").unwrap())
        );
        assert_eq!(parse_reported("v1.9.0"), Some(Version::new(1, 9, 0)));
        assert_eq!(parse_reported("no version here"), None);
    }

    #[test]
    fn test_exact_match_only() {
        let required = Version::parse("1.8.0-beta").unwrap();
        assert!(matches(&required, "1.8.0-beta"));
        // Substring containment would have accepted both of these.
        assert!(!matches(&required, "11.8.0-beta"));
        assert!(!matches(&required, "1.8.0-beta.2"));
        assert!(!matches(&required, "1.8.0"));
    }
}
