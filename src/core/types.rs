//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`Fingerprint`] - Stable hash of a change-set for cheap poll comparison
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so callers never hand malformed names to the
//! underlying Git engine.
//!
//! # Examples
//!
//! ```
//! use gitpane::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! assert_eq!(branch.as_str(), "feature/my-branch");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// Substrings that may not appear anywhere in a branch name.
const FORBIDDEN_SEQUENCES: [&str; 3] = ["..", "@{", "//"];

/// Characters that may not appear anywhere in a branch name.
const FORBIDDEN_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// A validated Git branch name.
///
/// Follows `git check-ref-format --branch`:
/// - not empty, not exactly `@`
/// - no leading `-`, no trailing `/`
/// - no `..`, `@{`, `//`, spaces, `~ ^ : \ ? * [` or control characters
/// - no path component starting with `.` or ending with `.lock`
///
/// # Example
///
/// ```
/// use gitpane::core::types::BranchName;
///
/// assert!(BranchName::new("user@feature").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` naming the first rule violated.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if let Some(reason) = Self::violation(&name) {
            return Err(TypeError::InvalidBranchName(format!("'{name}': {reason}")));
        }
        Ok(Self(name))
    }

    /// Return the first refname rule `name` breaks, if any.
    fn violation(name: &str) -> Option<String> {
        if name.is_empty() {
            return Some("name cannot be empty".into());
        }
        if name == "@" {
            return Some("'@' is reserved".into());
        }
        if name.starts_with('-') {
            return Some("cannot start with '-'".into());
        }
        if name.ends_with('/') {
            return Some("cannot end with '/'".into());
        }
        if name.ends_with('.') {
            return Some("cannot end with '.'".into());
        }
        if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|seq| name.contains(**seq)) {
            return Some(format!("cannot contain '{seq}'"));
        }
        if let Some(c) = name
            .chars()
            .find(|c| FORBIDDEN_CHARS.contains(c) || c.is_ascii_control())
        {
            return Some(if c.is_ascii_control() {
                "cannot contain control characters".into()
            } else {
                format!("cannot contain '{c}'")
            });
        }
        name.split('/')
            .filter(|component| !component.is_empty())
            .find_map(|component| {
                if component.starts_with('.') {
                    Some("path component cannot start with '.'".to_string())
                } else if component.ends_with(".lock") {
                    Some("path component cannot end with '.lock'".to_string())
                } else {
                    None
                }
            })
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full ref name under `refs/heads/`.
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A full Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// # Example
///
/// ```
/// use gitpane::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` unless the input is 40 or 64 hex digits.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Abbreviated form: the first `len` characters (or the whole id).
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stable SHA-256 over `(path, status)` entries.
///
/// Two change-sets with equal entries in equal order always produce the
/// same fingerprint, so a poller can compare hex strings instead of
/// holding the previous snapshot.
///
/// # Example
///
/// ```
/// use gitpane::core::types::Fingerprint;
///
/// let a = Fingerprint::compute([("a.txt", "modified"), ("b.txt", "added")]);
/// let b = Fingerprint::compute([("a.txt", "modified"), ("b.txt", "added")]);
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash entries in the order given.
    pub fn compute<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut hasher = Sha256::new();
        for (path, status) in entries {
            hasher.update(path.as_bytes());
            hasher.update(b"\0");
            hasher.update(status.as_bytes());
            hasher.update(b"\n");
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn accepts_common_names() {
            for name in [
                "main",
                "feature/foo",
                "fix-123",
                "user@feature",
                "CamelCase",
                "with.dot",
                "a/b/c/d",
            ] {
                assert!(BranchName::new(name).is_ok(), "{name} should be valid");
            }
        }

        #[test]
        fn rejects_refname_violations() {
            for name in [
                "",
                "@",
                "-flag",
                ".hidden",
                "foo/.hidden",
                "branch.lock",
                "foo/bar.lock/baz",
                "trailing/",
                "trailing.",
                "a..b",
                "a@{b",
                "a//b",
                "has space",
                "tilde~1",
                "caret^",
                "colon:x",
                "back\\slash",
                "what?",
                "star*",
                "open[",
                "ctrl\u{7}",
            ] {
                assert!(BranchName::new(name).is_err(), "{name:?} should be rejected");
            }
        }

        #[test]
        fn error_names_the_rule() {
            let err = BranchName::new("a..b").unwrap_err();
            assert!(err.to_string().contains("'..'"));
        }

        #[test]
        fn local_ref_prefix() {
            let name = BranchName::new("feature/x").unwrap();
            assert_eq!(name.local_ref(), "refs/heads/feature/x");
        }

        #[test]
        fn serde_rejects_invalid() {
            let parsed: Result<BranchName, _> = serde_json::from_str("\"bad name\"");
            assert!(parsed.is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn accepts_sha1_and_sha256() {
            assert!(Oid::new("a".repeat(40)).is_ok());
            assert!(Oid::new("b".repeat(64)).is_ok());
        }

        #[test]
        fn rejects_wrong_length_or_non_hex() {
            assert!(Oid::new("abc").is_err());
            assert!(Oid::new("g".repeat(40)).is_err());
        }

        #[test]
        fn short_clamps() {
            let oid = Oid::new("0123456789abcdef0123456789abcdef01234567").unwrap();
            assert_eq!(oid.short(4), "0123");
            assert_eq!(oid.short(100).len(), 40);
        }
    }

    mod fingerprint {
        use super::*;

        #[test]
        fn order_sensitive() {
            let a = Fingerprint::compute([("a", "added"), ("b", "added")]);
            let b = Fingerprint::compute([("b", "added"), ("a", "added")]);
            assert_ne!(a, b);
        }

        #[test]
        fn status_sensitive() {
            let a = Fingerprint::compute([("a", "added")]);
            let b = Fingerprint::compute([("a", "modified")]);
            assert_ne!(a, b);
        }

        #[test]
        fn separator_prevents_ambiguity() {
            let a = Fingerprint::compute([("ab", "c")]);
            let b = Fingerprint::compute([("a", "bc")]);
            assert_ne!(a, b);
        }
    }
}
