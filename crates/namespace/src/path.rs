use crate::error::NamespaceError;
use loft_domain::constants::ROOT_PATH;
use std::fmt;

/// An absolute, `/`-separated path with `.` and `..` collapsed and no trailing
/// slash (except the root itself).
///
/// `..` never climbs above the root. Paths holding NUL or `\` are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_PATH.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_PATH
    }

    /// The containing directory. `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_owned())),
        }
    }

    /// The last segment; `/` for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.is_root() {
            return ROOT_PATH;
        }
        self.0.rsplit('/').next().unwrap_or(ROOT_PATH)
    }

    /// Whether `self` is `ancestor` or lies beneath it.
    ///
    /// Segment-aware: `/docalpha` is not within `/doc`.
    #[must_use]
    pub fn is_within(&self, ancestor: &Self) -> bool {
        is_within(&self.0, &ancestor.0)
    }

    /// Whether `self` lies strictly beneath `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self != ancestor && self.is_within(ancestor)
    }

    /// Replaces the `from` prefix of `self` with `to`, keeping every suffix segment.
    /// `None` if `self` is not within `from`.
    #[must_use]
    pub fn rebase(&self, from: &Self, to: &Self) -> Option<Self> {
        rebase(&self.0, &from.0, &to.0).map(Self)
    }
}

/// Segment-aware prefix test over normalized path strings.
pub(crate) fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT_PATH {
        return true;
    }
    path.strip_prefix(ancestor).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub(crate) fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if !is_within(path, from) {
        return None;
    }
    let suffix = if from == ROOT_PATH { path } else { &path[from.len()..] };
    match (to == ROOT_PATH, suffix.is_empty()) {
        (true, true) => Some(ROOT_PATH.to_owned()),
        (true, false) => Some(suffix.to_owned()),
        (false, _) => Some(format!("{to}{suffix}")),
    }
}

fn normalize(raw: &str) -> Result<String, NamespaceError> {
    if raw.is_empty() {
        return Err(NamespaceError::invalid("Empty path"));
    }
    if raw.contains(['\0', '\\']) {
        return Err(NamespaceError::invalid(format!("Forbidden character in path: {raw:?}")));
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }

    Ok(format!("/{}", segments.join("/")))
}

impl TryFrom<&str> for NormalizedPath {
    type Error = NamespaceError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        normalize(raw).map(Self)
    }
}

impl TryFrom<String> for NormalizedPath {
    type Error = NamespaceError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::try_from(raw.as_str())
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn norm(raw: &str) -> String {
        NormalizedPath::try_from(raw).unwrap().as_str().to_owned()
    }

    #[test]
    fn collapses_dots_and_slashes() {
        assert_eq!(norm("/"), "/");
        assert_eq!(norm("docs"), "/docs");
        assert_eq!(norm("/docs/"), "/docs");
        assert_eq!(norm("//docs///a/./b/"), "/docs/a/b");
        assert_eq!(norm("/docs/a/../b"), "/docs/b");
    }

    #[test]
    fn dot_dot_is_clamped_at_root() {
        assert_eq!(norm("/.."), "/");
        assert_eq!(norm("/../../etc"), "/etc");
        assert_eq!(norm("a/../../b"), "/b");
    }

    #[test]
    fn rejects_empty_and_foreign_characters() {
        for raw in ["", "/a\0b", "\\docs", "/a\\b"] {
            let err = NormalizedPath::try_from(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{raw:?}");
        }
    }

    #[test]
    fn parent_and_name() {
        let path = NormalizedPath::try_from("/a/b/c.txt").unwrap();
        assert_eq!(path.name(), "c.txt");
        assert_eq!(path.parent().unwrap().as_str(), "/a/b");

        let top = NormalizedPath::try_from("/a").unwrap();
        assert_eq!(top.parent(), Some(NormalizedPath::root()));
        assert_eq!(NormalizedPath::root().parent(), None);
        assert_eq!(NormalizedPath::root().name(), "/");
    }

    #[test]
    fn prefix_test_respects_segments() {
        assert!(is_within("/doc", "/doc"));
        assert!(is_within("/doc/a", "/doc"));
        assert!(!is_within("/docalpha", "/doc"));
        assert!(!is_within("/do", "/doc"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn rebase_keeps_suffixes() {
        assert_eq!(rebase("/a", "/a", "/b").as_deref(), Some("/b"));
        assert_eq!(rebase("/a/y/z", "/a", "/b/c").as_deref(), Some("/b/c/y/z"));
        assert_eq!(rebase("/ab", "/a", "/b"), None);
    }

    #[test]
    fn descendant_is_strict() {
        let a = NormalizedPath::try_from("/a").unwrap();
        let ax = NormalizedPath::try_from("/a/x").unwrap();
        assert!(ax.is_descendant_of(&a));
        assert!(!a.is_descendant_of(&a));
        assert!(a.is_within(&a));
    }
}
