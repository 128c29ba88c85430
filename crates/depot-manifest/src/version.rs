//! The `major.minor` version-bump rule.

/// Bump a manifest version string by one minor step.
///
/// The version is `<major>[.<minor>]`. A missing minor counts as zero, so
/// `"1"` becomes `"1.1"`. Anything that does not parse -- including a
/// missing version -- defaults to `"1.1"`: the manifest is self-healing and
/// a malformed version just restarts the sequence.
pub fn bump_version(current: Option<&str>) -> String {
    const DEFAULT: &str = "1.1";

    let Some(current) = current else {
        return DEFAULT.to_string();
    };

    let (major_part, minor_part) = match current.split_once('.') {
        Some((major, minor)) => (major, Some(minor)),
        None => (current, None),
    };

    let Ok(major) = major_part.parse::<u64>() else {
        return DEFAULT.to_string();
    };
    let minor = match minor_part {
        Some(minor) => match minor.parse::<u64>() {
            Ok(minor) => minor,
            Err(_) => return DEFAULT.to_string(),
        },
        None => 0,
    };

    format!("{major}.{}", minor + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_major_gains_minor() {
        assert_eq!(bump_version(Some("1")), "1.1");
        assert_eq!(bump_version(Some("3")), "3.1");
    }

    #[test]
    fn minor_increments() {
        assert_eq!(bump_version(Some("1.0")), "1.1");
        assert_eq!(bump_version(Some("2.1")), "2.2");
        assert_eq!(bump_version(Some("10.99")), "10.100");
    }

    #[test]
    fn malformed_defaults() {
        assert_eq!(bump_version(Some("not-a-number")), "1.1");
        assert_eq!(bump_version(Some("1.x")), "1.1");
        assert_eq!(bump_version(Some("1.2.3")), "1.1");
        assert_eq!(bump_version(Some("")), "1.1");
        assert_eq!(bump_version(None), "1.1");
    }
}
