//! Category to priority resolution.
//!
//! Every object is created under a [`Category`]. The [`PriorityResolver`]
//! maps that category to the integer [`Priority`] the object keeps for the
//! rest of its life (unless explicitly re-prioritised). Resolution happens
//! once, at creation time; the orderer never consults the resolver.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use crate::engine::config::RuntimeConfig;
use crate::engine::error::UnknownCategoryError;
use crate::engine::types::Priority;


/// Registered type key of an object kind.
///
/// Categories are compared by name. Static names borrow; names loaded from
/// configuration own their string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Category(Cow<'static, str>);

impl Category {
    /// Creates a category from a static name.
    pub const fn new(name: &'static str) -> Self {
        Category(Cow::Borrowed(name))
    }

    /// Returns the category name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Category {
    fn from(name: &'static str) -> Self { Category::new(name) }
}

impl From<String> for Category {
    fn from(name: String) -> Self { Category(Cow::Owned(name)) }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Category({:?})", self.name())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lookup table from [`Category`] to [`Priority`].
#[derive(Debug, Clone, Default)]
pub struct PriorityResolver {
    table: HashMap<Category, Priority>,
}

impl PriorityResolver {
    /// Resolver with no categories.
    pub fn new() -> Self { Self::default() }

    /// Builds a resolver from the configured category table.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let mut resolver = Self::new();
        for (name, &priority) in &config.categories {
            resolver.register(Category::from(name.clone()), priority);
        }
        resolver
    }

    /// Registers (or re-registers) a category.
    ///
    /// Returns the previous priority, if any. Re-registration only affects
    /// objects created afterwards.
    pub fn register(&mut self, category: impl Into<Category>, priority: Priority) -> Option<Priority> {
        self.table.insert(category.into(), priority)
    }

    /// Resolves the priority of `category`.
    pub fn resolve(&self, category: &Category) -> Result<Priority, UnknownCategoryError> {
        self.table
            .get(category)
            .copied()
            .ok_or_else(|| UnknownCategoryError { category: category.clone() })
    }

    /// `true` if `category` is registered.
    pub fn contains(&self, category: &Category) -> bool {
        self.table.contains_key(category)
    }

    /// Number of registered categories.
    pub fn len(&self) -> usize { self.table.len() }

    /// `true` if no category is registered.
    pub fn is_empty(&self) -> bool { self.table.is_empty() }
}

impl<C: Into<Category>> FromIterator<(C, Priority)> for PriorityResolver {
    fn from_iter<I: IntoIterator<Item = (C, Priority)>>(iter: I) -> Self {
        let mut resolver = Self::new();
        for (category, priority) in iter {
            resolver.register(category, priority);
        }
        resolver
    }
}
