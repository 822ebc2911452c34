// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Attribute predicates shared by node, edge, and interface queries.

use crate::anm::AbstractNetworkModel;
use crate::value::AttrValue;

/// Anything whose attributes can be looked up in a model.
pub trait AttrSource {
    /// Reads attribute `key`, `None` when unset.
    fn attr(&self, anm: &AbstractNetworkModel, key: &str) -> Option<AttrValue>;
}

/// Conjunction of attribute predicates.
///
/// An item matches when every [`has`](Filter::has) attribute is truthy and
/// every [`equals`](Filter::equals) attribute is set to exactly that value.
/// The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    truthy: Vec<String>,
    equals: Vec<(String, AttrValue)>,
}

impl Filter {
    /// The empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `key` to be set to a truthy value.
    #[must_use]
    pub fn has(mut self, key: impl Into<String>) -> Self {
        self.truthy.push(key.into());
        self
    }

    /// Requires `key` to equal `value`.
    #[must_use]
    pub fn equals(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.equals.push((key.into(), value.into()));
        self
    }

    /// Returns `true` if no predicate is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.truthy.is_empty() && self.equals.is_empty()
    }

    /// Evaluates the filter against `item`.
    pub fn matches<T: AttrSource>(&self, anm: &AbstractNetworkModel, item: &T) -> bool {
        self.truthy
            .iter()
            .all(|key| item.attr(anm, key).is_some_and(|v| v.is_truthy()))
            && self
                .equals
                .iter()
                .all(|(key, want)| item.attr(anm, key).as_ref() == Some(want))
    }
}

/// Keeps the items of `items` matching `filter`, preserving order.
pub fn filter_items<T, I>(anm: &AbstractNetworkModel, items: I, filter: &Filter) -> Vec<T>
where
    T: AttrSource,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .filter(|item| filter.matches(anm, item))
        .collect()
}
