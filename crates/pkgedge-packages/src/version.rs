//! Version specs.
//!
//! The mirror understands the common shapes of a version segment:
//! concrete versions, partial versions (`18`, `18.2`, `18.x`), caret and
//! tilde ranges, and `*`. Anything else is treated as a dist-tag.
//! Prereleases only match when named exactly.

use std::cmp::Ordering;
use std::fmt;

/// A concrete `major.minor.patch[-pre]` version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Prerelease tag, without the `-`.
    pub pre: Option<String>,
}

impl Version {
    /// Parses a concrete version. Build metadata (`+...`) is dropped.
    ///
    /// ```
    /// use pkgedge_packages::version::Version;
    ///
    /// let v = Version::parse("18.3.0-canary.1+sha").unwrap();
    /// assert_eq!((v.major, v.minor, v.patch), (18, 3, 0));
    /// assert_eq!(v.pre.as_deref(), Some("canary.1"));
    /// assert!(Version::parse("18.x").is_none());
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().trim_start_matches('v');
        let input = input.split_once('+').map_or(input, |(core, _)| core);
        let (core, pre) = match input.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return None,
            None => (input, None),
        };

        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    /// Returns true for prerelease versions.
    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

/// A range of acceptable versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// Any release.
    Any,
    /// Exactly this version.
    Exact(Version),
    /// Same major, and same minor when given (`18`, `18.2`, `18.2.x`).
    Partial {
        /// Required major.
        major: u64,
        /// Required minor, if any.
        minor: Option<u64>,
    },
    /// `^x.y.z`: at least `x.y.z`, below the next breaking release.
    Caret(Version),
    /// `~x.y.z`: at least `x.y.z`, same major and minor.
    Tilde(Version),
}

impl VersionRange {
    /// Parses a version segment, or returns `None` for a dist-tag.
    ///
    /// ```
    /// use pkgedge_packages::version::{Version, VersionRange};
    ///
    /// let range = VersionRange::parse("^18.2.0").unwrap();
    /// assert!(range.matches(&Version::parse("18.3.1").unwrap()));
    /// assert!(!range.matches(&Version::parse("19.0.0").unwrap()));
    /// assert!(VersionRange::parse("next").is_none());
    /// ```
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if matches!(spec, "" | "*" | "x" | "X") {
            return Some(Self::Any);
        }
        if let Some(rest) = spec.strip_prefix('^') {
            return Version::parse(rest).map(Self::Caret);
        }
        if let Some(rest) = spec.strip_prefix('~') {
            return Version::parse(rest).map(Self::Tilde);
        }
        if let Some(version) = Version::parse(spec) {
            return Some(Self::Exact(version));
        }
        Self::parse_partial(spec)
    }

    fn parse_partial(spec: &str) -> Option<Self> {
        let is_wild = |part: &str| matches!(part, "x" | "X" | "*");
        let mut parts = spec.trim_start_matches('v').split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            None => None,
            Some(part) if is_wild(part) => None,
            Some(part) => Some(part.parse().ok()?),
        };
        match parts.next() {
            None => {}
            Some(part) if is_wild(part) => {}
            Some(_) => return None,
        }
        if parts.next().is_some() {
            return None;
        }
        Some(Self::Partial { major, minor })
    }

    /// Returns true if `version` satisfies the range.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        if let Self::Exact(exact) = self {
            return exact == version;
        }
        if version.is_prerelease() {
            return false;
        }
        match self {
            Self::Any => true,
            Self::Exact(_) => false,
            Self::Partial { major, minor } => {
                version.major == *major && minor.map_or(true, |minor| version.minor == minor)
            }
            Self::Caret(base) => {
                version >= base
                    && if base.major > 0 {
                        version.major == base.major
                    } else if base.minor > 0 {
                        version.major == 0 && version.minor == base.minor
                    } else {
                        version.major == 0 && version.minor == 0 && version.patch == base.patch
                    }
            }
            Self::Tilde(base) => {
                version >= base && version.major == base.major && version.minor == base.minor
            }
        }
    }

    /// The highest version in `candidates` that satisfies the range.
    pub fn max_satisfying<'a, I>(&self, candidates: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        candidates.into_iter().filter(|v| self.matches(v)).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(list: &[&str]) -> Vec<Version> {
        list.iter().map(|v| Version::parse(v).unwrap()).collect()
    }

    #[test]
    fn test_ordering() {
        let mut list = versions(&["1.10.0", "1.2.0", "1.2.0-beta.1", "0.9.9"]);
        list.sort();
        let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["0.9.9", "1.2.0-beta.1", "1.2.0", "1.10.0"]);
    }

    #[test]
    fn test_max_satisfying() {
        let list = versions(&["17.0.2", "18.0.0", "18.2.0", "18.3.0-canary.1", "19.0.0"]);
        let pick = |spec: &str| {
            VersionRange::parse(spec)
                .and_then(|range| range.max_satisfying(&list).map(ToString::to_string))
        };

        assert_eq!(pick("18").as_deref(), Some("18.2.0"));
        assert_eq!(pick("18.x").as_deref(), Some("18.2.0"));
        assert_eq!(pick("^17.0.0").as_deref(), Some("17.0.2"));
        assert_eq!(pick("~18.0.0").as_deref(), Some("18.0.0"));
        assert_eq!(pick("*").as_deref(), Some("19.0.0"));
        assert_eq!(pick("18.3.0-canary.1").as_deref(), Some("18.3.0-canary.1"));
        assert_eq!(pick("^20.0.0"), None);
    }

    #[test]
    fn test_caret_zero_major() {
        let range = VersionRange::parse("^0.2.3").unwrap();
        assert!(range.matches(&Version::parse("0.2.9").unwrap()));
        assert!(!range.matches(&Version::parse("0.3.0").unwrap()));
    }

    #[test]
    fn test_tags_are_not_ranges() {
        assert!(VersionRange::parse("latest").is_none());
        assert!(VersionRange::parse("1.2.3.4").is_none());
        assert!(VersionRange::parse("1.2.3-").is_none());
    }
}
