use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Price,
    AvgRating,
    Views,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(Self::Price),
            "avgRating" => Ok(Self::AvgRating),
            "views" => Ok(Self::Views),
            other => Err(format!(
                "unknown sort field `{other}`, expected one of price, avgRating, views"
            )),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Price => "price",
            Self::AvgRating => "avgRating",
            Self::Views => "views",
        })
    }
}

impl FromStr for SortDir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction `{other}`, expected asc or desc")),
        }
    }
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// The canonical filter handed to product search.
///
/// `characteristics` is either `None` or a non-empty map without blank
/// values. Price bounds are never zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub lower_price_bound: Option<f64>,
    pub upper_price_bound: Option<f64>,
    pub characteristics: Option<BTreeMap<String, String>>,
    pub sort_field: Option<SortField>,
    pub sort_dir: Option<SortDir>,
}

/// Values as the user left them, before canonicalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDraft {
    lower_price: Option<f64>,
    upper_price: Option<f64>,
    selections: BTreeMap<String, String>,
    sort_field: Option<SortField>,
    sort_dir: Option<SortDir>,
}

impl FilterDraft {
    pub fn lower_price(&self) -> Option<f64> {
        self.lower_price
    }

    pub fn upper_price(&self) -> Option<f64> {
        self.upper_price
    }

    pub fn selection(&self, kind: &str) -> Option<&str> {
        self.selections.get(kind).map(String::as_str)
    }

    pub fn selections(&self) -> &BTreeMap<String, String> {
        &self.selections
    }

    pub fn sort_field(&self) -> Option<SortField> {
        self.sort_field
    }

    pub fn sort_dir(&self) -> Option<SortDir> {
        self.sort_dir
    }

    pub fn set_lower_price(&mut self, value: f64) {
        self.lower_price = Some(value);
    }

    pub fn clear_lower_price(&mut self) {
        self.lower_price = None;
    }

    pub fn set_upper_price(&mut self, value: f64) {
        self.upper_price = Some(value);
    }

    pub fn clear_upper_price(&mut self) {
        self.upper_price = None;
    }

    /// Selects `value` for `kind`. Selecting the value already held for
    /// `kind` clears the selection instead.
    pub fn select(&mut self, kind: &str, value: &str) {
        if self.selection(kind) == Some(value) {
            self.selections.remove(kind);
        } else {
            self.selections.insert(kind.to_string(), value.to_string());
        }
    }

    pub fn deselect(&mut self, kind: &str) {
        self.selections.remove(kind);
    }

    pub fn set_sort_field(&mut self, field: Option<SortField>) {
        self.sort_field = field;
    }

    pub fn set_sort_dir(&mut self, dir: Option<SortDir>) {
        self.sort_dir = dir;
    }

    pub fn set_sort(&mut self, field: Option<SortField>, dir: Option<SortDir>) {
        self.sort_field = field;
        self.sort_dir = dir;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn canonical(&self) -> FilterState {
        let characteristics: BTreeMap<String, String> = self
            .selections
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(kind, value)| (kind.clone(), value.clone()))
            .collect();

        FilterState {
            lower_price_bound: price_bound(self.lower_price),
            upper_price_bound: price_bound(self.upper_price),
            characteristics: (!characteristics.is_empty()).then_some(characteristics),
            sort_field: self.sort_field,
            sort_dir: self.sort_dir,
        }
    }
}

// Zero is not a meaningful bound and means "unset".
fn price_bound(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}
