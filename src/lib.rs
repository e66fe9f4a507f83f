//! Product discovery for the storefront client: characteristic resolution
//! over an inconsistent backend, debounced filter assembly, and review reply
//! threading.

pub mod catalog;
pub mod characteristics;
pub mod error;
pub mod filter;
pub mod outbound;
pub mod review;
pub mod settings;

pub use crate::{
    characteristics::{resolve, CharacteristicMap, CharacteristicScope, CharacteristicsPanel},
    error::{Error, ResolutionError, Result},
    filter::{FilterAggregator, FilterState},
    outbound::StoreClient,
    review::{build_tree, Credential, Review},
    settings::Settings,
};
