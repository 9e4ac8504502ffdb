//! Access scope tokens.

use std::collections::BTreeSet;

/// The visibility a caller has over owned records for one call.
///
/// Computed once per call and never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeToken {
    /// The caller sees every record.
    Unrestricted,
    /// The caller sees records owned by one of these identifiers. An empty set
    /// means the caller sees nothing.
    RestrictedTo(BTreeSet<String>),
}

impl ScopeToken {
    /// A restricted scope that admits nothing.
    #[must_use]
    pub fn nobody() -> Self {
        Self::RestrictedTo(BTreeSet::new())
    }

    /// Creates a restricted scope from owner identifiers.
    pub fn restricted<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RestrictedTo(owners.into_iter().map(Into::into).collect())
    }

    /// Returns `true` for [`ScopeToken::Unrestricted`].
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// Returns whether records owned by `owner` are visible.
    #[must_use]
    pub fn allows(&self, owner: &str) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::RestrictedTo(owners) => owners.contains(owner),
        }
    }

    /// Number of owners for restricted scopes, `None` when unrestricted.
    #[must_use]
    pub fn owner_count(&self) -> Option<usize> {
        match self {
            Self::Unrestricted => None,
            Self::RestrictedTo(owners) => Some(owners.len()),
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unrestricted => "unrestricted",
            Self::RestrictedTo(_) => "restricted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nobody_allows_nothing() {
        let scope = ScopeToken::nobody();
        assert!(!scope.allows(""));
        assert!(!scope.allows("root"));
        assert_eq!(scope.owner_count(), Some(0));
    }

    #[test]
    fn test_restricted_allows_members() {
        let scope = ScopeToken::restricted(["a@x.io", "b@x.io"]);
        assert!(scope.allows("a@x.io"));
        assert!(!scope.allows("c@x.io"));
        assert_eq!(scope.kind(), "restricted");
    }

    #[test]
    fn test_unrestricted() {
        assert!(ScopeToken::Unrestricted.allows("anyone"));
        assert_eq!(ScopeToken::Unrestricted.owner_count(), None);
    }
}
