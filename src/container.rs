use std::collections::BTreeMap;

use crate::mol::DynGraph;

/// A reagent-side value paired with its product-side counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DynamicContainer<T> {
    pub reagent: T,
    pub product: T,
}

impl<T> DynamicContainer<T> {
    pub fn new(reagent: T, product: T) -> Self {
        Self { reagent, product }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> DynamicContainer<U> {
        DynamicContainer {
            reagent: f(self.reagent),
            product: f(self.product),
        }
    }

    pub fn into_tuple(self) -> (T, T) {
        (self.reagent, self.product)
    }
}

impl<T> From<(T, T)> for DynamicContainer<T> {
    fn from((reagent, product): (T, T)) -> Self {
        Self { reagent, product }
    }
}

/// A parsed reaction: reactant and product graphs plus free-form metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionContainer {
    pub reactants: Vec<DynGraph>,
    pub products: Vec<DynGraph>,
    pub meta: BTreeMap<String, String>,
}

impl ReactionContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reactants then products, in file order.
    pub fn molecules(&self) -> impl Iterator<Item = &DynGraph> + '_ {
        self.reactants.iter().chain(self.products.iter())
    }
}
