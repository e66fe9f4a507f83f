use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filter::FilterState;

/// Category name mapped to its subcategories.
pub type CategoryTree = BTreeMap<String, Vec<Subcategory>>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Subcategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Seller {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One page of a product search. Paging metadata sent by the backend is
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProductPage {
    #[serde(default)]
    pub content: Vec<Product>,
}

/// Body of a product search: the free-text name next to the canonical filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductQuery {
    pub name: Option<String>,
    #[serde(flatten)]
    pub filter: FilterState,
}

impl ProductQuery {
    pub fn new(name: Option<String>, filter: FilterState) -> Self {
        Self { name, filter }
    }
}
