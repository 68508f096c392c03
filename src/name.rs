// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Hypermesh Interest Pushback Suite - Hierarchical Names

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name must start with '/': {0:?}")]
    NotAbsolute(String),
    #[error("empty component in name {0:?}")]
    EmptyComponent(String),
}

/// Ordered sequence of name components, displayed as `/a/b/c`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { components: components.into_iter().map(Into::into).collect() }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.components.get(i).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    /// First `n` components (all of them if `n` exceeds the length).
    pub fn prefix(&self, n: usize) -> Name {
        let n = n.min(self.components.len());
        Name { components: self.components[..n].to_vec() }
    }

    /// The name with its final component dropped; the root stays the root.
    pub fn without_last(&self) -> Name {
        self.prefix(self.components.len().saturating_sub(1))
    }

    pub fn append(mut self, component: impl Into<String>) -> Name {
        self.components.push(component.into());
        self
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self.components.iter().zip(&other.components).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }
        for c in &self.components {
            write!(f, "/{}", c)?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('/').ok_or_else(|| NameError::NotAbsolute(s.to_string()))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.is_empty() {
            return Ok(Name::root());
        }
        let mut components = Vec::new();
        for part in rest.split('/') {
            if part.is_empty() {
                return Err(NameError::EmptyComponent(s.to_string()));
            }
            components.push(part.to_string());
        }
        Ok(Name { components })
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let name: Name = "/good/3/17".parse().expect("test: parse");
        assert_eq!(name.len(), 3);
        assert_eq!(name.last(), Some("17"));
        assert_eq!(name.to_string(), "/good/3/17");
        assert_eq!(Name::root().to_string(), "/");
        assert_eq!("/".parse::<Name>(), Ok(Name::root()));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!("good/1".parse::<Name>(), Err(NameError::NotAbsolute(_))));
        assert!(matches!("/good//1".parse::<Name>(), Err(NameError::EmptyComponent(_))));
    }

    #[test]
    fn test_without_last_and_prefix() {
        let name = Name::from_components(["evil", "2", "9"]);
        assert_eq!(name.without_last(), Name::from_components(["evil", "2"]));
        assert_eq!(Name::root().without_last(), Name::root());
        assert!(name.prefix(1).is_prefix_of(&name));
        assert!(!Name::from_components(["good"]).is_prefix_of(&name));
    }
}
