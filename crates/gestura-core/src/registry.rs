//! Registered gesture bookkeeping

use crate::types::{Category, Operation};

/// Anything that can be normalized to a list of gesture names.
///
/// Lets callers pass one name or a list of names.
pub trait GestureNames {
    fn into_names(self) -> Vec<String>;
}

impl GestureNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl GestureNames for String {
    fn into_names(self) -> Vec<String> {
        vec![self]
    }
}

impl GestureNames for &String {
    fn into_names(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<S: Into<String>> GestureNames for Vec<S> {
    fn into_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<S: AsRef<str>> GestureNames for &[S] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_string()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> GestureNames for &[S; N] {
    fn into_names(self) -> Vec<String> {
        self.as_slice().into_names()
    }
}

impl<S: Into<String>, const N: usize> GestureNames for [S; N] {
    fn into_names(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

/// Gesture names the application wants recognized, per category.
///
/// Each category holds unique names in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisteredGestureSet {
    statics: Vec<String>,
    dynamics: Vec<String>,
}

impl RegisteredGestureSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn names_mut(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Static => &mut self.statics,
            Category::Dynamic => &mut self.dynamics,
        }
    }

    /// Names registered for a category
    pub fn names(&self, category: Category) -> &[String] {
        match category {
            Category::Static => &self.statics,
            Category::Dynamic => &self.dynamics,
        }
    }

    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.names(category).iter().any(|n| n == name)
    }

    /// Add names, returning the ones that were not already present
    pub fn register(&mut self, category: Category, names: impl GestureNames) -> Vec<String> {
        let set = self.names_mut(category);
        let mut added = Vec::new();

        for name in names.into_names() {
            if !set.contains(&name) {
                set.push(name.clone());
                added.push(name);
            }
        }

        added
    }

    /// Remove names, returning the ones that were actually present
    pub fn unregister(&mut self, category: Category, names: impl GestureNames) -> Vec<String> {
        let set = self.names_mut(category);
        let mut removed = Vec::new();

        for name in names.into_names() {
            if let Some(pos) = set.iter().position(|n| *n == name) {
                removed.push(set.remove(pos));
            }
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.statics.len() + self.dynamics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `add` operations for the whole set, statics first
    pub fn to_operations(&self) -> Vec<Operation> {
        Category::ALL
            .into_iter()
            .flat_map(|category| Operation::adds(category, self.names(category)))
            .collect()
    }
}
