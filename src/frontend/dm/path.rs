//! Type paths such as `/obj/item`, `proc/foo` or `.child`

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How a path is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathKind {
    /// `/a/b`
    #[default]
    Absolute,
    /// `a/b`, resolved against the enclosing object
    Relative,
    /// `:a`, nearest descendant named `a`
    DownwardSearch,
    /// `.a`, nearest type up the tree with a child `a`
    UpwardSearch,
}

/// A type path.
///
/// Equality and hashing look only at the elements, so `/obj` and `obj`
/// compare equal once both are resolved.
#[derive(Debug, Clone, Default)]
pub struct DreamPath {
    kind: PathKind,
    elements: Vec<String>,
}

impl DreamPath {
    /// `/`
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(
        kind: PathKind,
        elements: Vec<String>,
    ) -> Self {
        let mut path = Self { kind, elements };
        path.elements.retain(|e| !e.is_empty());
        path.normalize();
        path
    }

    /// Absolute path from its elements
    pub fn absolute<S: AsRef<str>>(elements: &[S]) -> Self {
        Self::new(
            PathKind::Absolute,
            elements.iter().map(|e| e.as_ref().to_string()).collect(),
        )
    }

    pub fn parse(raw: &str) -> Self {
        let (kind, rest) = match raw.chars().next() {
            Some('/') => (PathKind::Absolute, raw),
            Some(':') => (PathKind::DownwardSearch, &raw[1..]),
            Some('.') => (PathKind::UpwardSearch, &raw[1..]),
            _ => (PathKind::Relative, raw),
        };
        let mut elements: Vec<String> = rest
            .split('/')
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();

        // `operator/` and `operator/=` contain the separator
        if raw.ends_with("operator/") {
            if let Some(last) = elements.last_mut() {
                *last = "operator/".to_string();
            }
        } else if raw.ends_with("operator/=") && elements.len() >= 2 {
            elements.pop();
            if let Some(last) = elements.last_mut() {
                *last = "operator/=".to_string();
            }
        }

        let mut path = Self { kind, elements };
        path.normalize();
        path
    }

    /// Resolve `..` elements
    fn normalize(&mut self) {
        if !self.elements.iter().any(|e| e == "..") {
            return;
        }
        let mut out: Vec<String> = Vec::with_capacity(self.elements.len());
        for element in self.elements.drain(..) {
            if element == ".." {
                out.pop();
            } else {
                out.push(element);
            }
        }
        self.elements = out;
    }

    #[inline]
    pub fn kind(&self) -> PathKind {
        self.kind
    }

    #[inline]
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn last_element(&self) -> Option<&str> {
        self.elements.last().map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn find_element(
        &self,
        element: &str,
    ) -> Option<usize> {
        self.elements.iter().position(|e| e == element)
    }

    /// Index of the first `proc` or `verb` element
    pub fn proc_element(&self) -> Option<usize> {
        self.elements.iter().position(|e| e == "proc" || e == "verb")
    }

    pub fn var_element(&self) -> Option<usize> {
        self.find_element("var")
    }

    /// Absolute path made of `elements[start..end]`
    pub fn from_elements(
        &self,
        start: usize,
        end: usize,
    ) -> DreamPath {
        let end = end.min(self.elements.len());
        let start = start.min(end);
        DreamPath::absolute(&self.elements[start..end])
    }

    /// Absolute path made of `elements[start..]`
    pub fn from_element(
        &self,
        start: usize,
    ) -> DreamPath {
        self.from_elements(start, self.elements.len())
    }

    /// This path without the element at `index`
    pub fn remove_element(
        &self,
        index: usize,
    ) -> DreamPath {
        let mut elements = self.elements.clone();
        if index < elements.len() {
            elements.remove(index);
        }
        DreamPath::new(self.kind, elements)
    }

    /// Parent type, or `None` at the root
    pub fn parent(&self) -> Option<DreamPath> {
        if self.elements.is_empty() {
            return None;
        }
        let mut elements = self.elements.clone();
        elements.pop();
        Some(DreamPath {
            kind: self.kind,
            elements,
        })
    }

    /// Append raw path text, e.g. `"movable"` or `"/proc/x"`
    pub fn add_to_path(
        &self,
        path: &str,
    ) -> DreamPath {
        let mut raw = self.to_string();
        if !raw.ends_with('/') && !path.starts_with('/') {
            raw.push('/');
        }
        raw.push_str(path);
        DreamPath::parse(&raw)
    }

    /// Resolve `other` against this path
    pub fn combine(
        &self,
        other: &DreamPath,
    ) -> DreamPath {
        match other.kind {
            PathKind::Absolute => other.clone(),
            PathKind::Relative => {
                let mut elements = self.elements.clone();
                elements.extend(other.elements.iter().cloned());
                DreamPath::new(self.kind, elements)
            }
            PathKind::DownwardSearch | PathKind::UpwardSearch => {
                DreamPath::parse(&format!("{}{}", self, other))
            }
        }
    }

    /// True when `self` is `ancestor` or lies below it
    pub fn is_descendant_of(
        &self,
        ancestor: &DreamPath,
    ) -> bool {
        self.elements.starts_with(&ancestor.elements)
    }

    /// Same elements, anchored at the root
    pub fn to_absolute(&self) -> DreamPath {
        DreamPath {
            kind: PathKind::Absolute,
            elements: self.elements.clone(),
        }
    }
}

impl fmt::Display for DreamPath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let prefix = match self.kind {
            PathKind::Absolute => "/",
            PathKind::DownwardSearch => ":",
            PathKind::UpwardSearch => ".",
            PathKind::Relative => "",
        };
        write!(f, "{}{}", prefix, self.elements.join("/"))
    }
}

impl PartialEq for DreamPath {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.elements == other.elements
    }
}

impl Eq for DreamPath {}

impl Hash for DreamPath {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.elements.hash(state);
    }
}

impl From<&str> for DreamPath {
    fn from(raw: &str) -> Self {
        DreamPath::parse(raw)
    }
}

impl Serialize for DreamPath {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DreamPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(DreamPath::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = DreamPath::parse("/obj/item");
        assert_eq!(path.kind(), PathKind::Absolute);
        assert_eq!(path.elements(), ["obj", "item"]);
        assert_eq!(path.to_string(), "/obj/item");

        assert_eq!(DreamPath::parse("proc/x").kind(), PathKind::Relative);
        assert_eq!(DreamPath::parse(":child").to_string(), ":child");
        assert_eq!(DreamPath::parse(".sib").kind(), PathKind::UpwardSearch);
        assert_eq!(DreamPath::parse("/").to_string(), "/");
    }

    #[test]
    fn test_dot_dot_is_resolved() {
        assert_eq!(DreamPath::parse("/a/b/../c").to_string(), "/a/c");
        assert_eq!(DreamPath::parse("/a/../../b").to_string(), "/b");
    }

    #[test]
    fn test_operator_slash() {
        assert_eq!(
            DreamPath::parse("/datum/proc/operator/").last_element(),
            Some("operator/")
        );
        assert_eq!(
            DreamPath::parse("/datum/proc/operator/=").last_element(),
            Some("operator/=")
        );
    }

    #[test]
    fn test_combine() {
        let base = DreamPath::parse("/mob");
        assert_eq!(base.combine(&"player".into()).to_string(), "/mob/player");
        assert_eq!(base.combine(&"/obj".into()).to_string(), "/obj");
        assert_eq!(base.add_to_path("proc/x").to_string(), "/mob/proc/x");
    }

    #[test]
    fn test_element_queries() {
        let path = DreamPath::parse("/mob/verb/say");
        assert_eq!(path.proc_element(), Some(1));
        assert_eq!(path.from_elements(0, 1).to_string(), "/mob");
        assert_eq!(path.from_element(2).to_string(), "/say");
        assert_eq!(path.remove_element(1).to_string(), "/mob/say");
        assert_eq!(path.parent().map(|p| p.to_string()).as_deref(), Some("/mob/verb"));
        assert!(DreamPath::root().parent().is_none());
        assert_eq!(DreamPath::parse("/x/var/y").var_element(), Some(1));
    }

    #[test]
    fn test_equality_ignores_anchor() {
        assert_eq!(DreamPath::parse("/obj"), DreamPath::parse("obj"));
        assert!(DreamPath::parse("/obj/item").is_descendant_of(&DreamPath::parse("/obj")));
        assert!(!DreamPath::parse("/mob").is_descendant_of(&DreamPath::parse("/obj")));
    }
}
