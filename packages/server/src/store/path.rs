//! Parsing of client-facing item paths.
//!
//! Paths are written `root:/a/b/c:`. The bare word `root` (or `root:/:`)
//! addresses the synthetic root, which owns no item of its own. The
//! resolved form is the `name` stored in the `item` table: the segments
//! joined with `/`, without the `root:/` prefix or the closing `:`.

use std::fmt;

/// Upper bound on the byte length of a resolved name.
pub const MAX_NAME_LEN: usize = 1024;

const ROOT: &str = "root";
const OPEN: &str = ":/";
const CLOSE: char = ':';
const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Path must start with 'root'")]
    MissingRoot,
    #[error("Path has an unbalanced ':' delimiter")]
    UnbalancedDelimiter,
    #[error("Path contains an empty segment")]
    EmptySegment,
    #[error("Path segments '.' and '..' are not allowed")]
    Traversal,
    #[error("Path must not contain backslashes")]
    Backslash,
    #[error("Path must not contain control characters")]
    ControlCharacter,
    #[error("Path exceeds maximum length of {MAX_NAME_LEN} bytes")]
    TooLong,
    #[error("Wildcard '*' is only allowed as a whole segment of a listing path")]
    Wildcard,
    #[error("The root path does not address an item")]
    Root,
}

/// Split a raw path into its segments, checking everything except wildcards.
fn split_segments(raw: &str) -> Result<Vec<&str>, PathError> {
    if raw.chars().any(char::is_control) {
        return Err(PathError::ControlCharacter);
    }
    if raw.contains('\\') {
        return Err(PathError::Backslash);
    }

    let Some(rest) = raw.strip_prefix(ROOT) else {
        return Err(PathError::MissingRoot);
    };
    if rest.is_empty() {
        return Ok(Vec::new());
    }

    let Some(inner) = rest.strip_prefix(OPEN) else {
        return Err(if rest.starts_with(CLOSE) {
            PathError::UnbalancedDelimiter
        } else {
            PathError::MissingRoot
        });
    };
    let Some(inner) = inner.strip_suffix(CLOSE) else {
        return Err(PathError::UnbalancedDelimiter);
    };
    if inner.contains(CLOSE) {
        return Err(PathError::UnbalancedDelimiter);
    }
    // `root:/:`
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    if inner.len() > MAX_NAME_LEN {
        return Err(PathError::TooLong);
    }

    let segments: Vec<&str> = inner.split('/').collect();
    for segment in &segments {
        match *segment {
            "" => return Err(PathError::EmptySegment),
            "." | ".." => return Err(PathError::Traversal),
            _ => {}
        }
    }
    Ok(segments)
}

/// A resolved, wildcard-free item path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemPath {
    name: String,
}

impl ItemPath {
    pub fn resolve(raw: &str) -> Result<Self, PathError> {
        let segments = split_segments(raw)?;
        if segments.iter().any(|s| s.contains(WILDCARD)) {
            return Err(PathError::Wildcard);
        }
        Ok(Self {
            name: segments.join("/"),
        })
    }

    pub fn root() -> Self {
        Self {
            name: String::new(),
        }
    }

    /// Rebuild a path from a stored name.
    pub fn from_name(name: &str) -> Result<Self, PathError> {
        if name.is_empty() {
            return Ok(Self::root());
        }
        Self::resolve(&format!("{ROOT}{OPEN}{name}{CLOSE}"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.name.split('/').filter(|s| !s.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// `None` for the root.
    pub fn parent(&self) -> Option<ItemPath> {
        if self.is_root() {
            return None;
        }
        let name = match self.name.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        };
        Some(Self { name })
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Whether `name` is this path or lies beneath it. The root contains
    /// every name.
    pub fn contains(&self, name: &str) -> bool {
        if self.is_root() {
            return true;
        }
        match name.strip_prefix(self.name.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('/'),
            None => false,
        }
    }

    /// Fails with [`PathError::Root`] for the root, which owns no item.
    pub fn require_item(&self) -> Result<&str, PathError> {
        if self.is_root() {
            Err(PathError::Root)
        } else {
            Ok(&self.name)
        }
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(ROOT)
        } else {
            write!(f, "{ROOT}{OPEN}{}{CLOSE}", self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Any,
}

impl Segment {
    fn matches(&self, value: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == value,
            Segment::Any => true,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(literal) => f.write_str(literal),
            Segment::Any => f.write_str(WILDCARD),
        }
    }
}

fn join_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// A listing path whose segments may be `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn resolve(raw: &str) -> Result<Self, PathError> {
        let segments = split_segments(raw)?
            .into_iter()
            .map(|s| match s {
                WILDCARD => Ok(Segment::Any),
                s if s.contains(WILDCARD) => Err(PathError::Wildcard),
                s => Ok(Segment::Literal(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_wildcard(&self) -> bool {
        self.segments.contains(&Segment::Any)
    }

    /// Matcher for names `depth` levels below the pattern. A trailing `*`
    /// already stands for the first of those levels.
    pub fn children(&self, depth: usize) -> ChildMatcher {
        let mut segments = self.segments.clone();
        let extra = match segments.last() {
            Some(Segment::Any) => depth.saturating_sub(1),
            _ => depth,
        };
        segments.extend(std::iter::repeat_n(Segment::Any, extra));
        ChildMatcher { segments }
    }
}

impl From<&ItemPath> for PathPattern {
    fn from(path: &ItemPath) -> Self {
        Self {
            segments: path
                .segments()
                .map(|s| Segment::Literal(s.to_string()))
                .collect(),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            f.write_str(ROOT)
        } else {
            write!(f, "{ROOT}{OPEN}{}{CLOSE}", join_segments(&self.segments))
        }
    }
}

/// Exact predicate over stored names, produced by [`PathPattern::children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildMatcher {
    segments: Vec<Segment>,
}

impl ChildMatcher {
    pub fn matches(&self, name: &str) -> bool {
        let mut parts = name.split('/');
        for segment in &self.segments {
            match parts.next() {
                Some(part) if !part.is_empty() && segment.matches(part) => {}
                _ => return false,
            }
        }
        parts.next().is_none()
    }

    /// Literal leading part shared by every matching name, ending in `/`
    /// when further segments follow. Empty when the first segment is `*`.
    pub fn literal_prefix(&self) -> String {
        let mut prefix = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    prefix.push_str(literal);
                    prefix.push('/');
                }
                Segment::Any => return prefix,
            }
        }
        // All literal: the name is exactly the prefix without its slash.
        prefix.pop();
        prefix
    }

    /// True when only the final segment is a wildcard, so that "starts with
    /// the literal prefix and has no further `/`" is already exact.
    pub fn is_single_level(&self) -> bool {
        match self.segments.split_last() {
            Some((Segment::Any, rest)) => rest.iter().all(|s| matches!(s, Segment::Literal(_))),
            _ => false,
        }
    }
}

impl fmt::Display for ChildMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_segments(&self.segments))
    }
}
