//! crabrl - a Discoverable Taxonomy Set (DTS) resolution and XBRL
//! instance validation engine.
//!
//! The crate is organized around the following components:
//!
//! - [`schema`] - the concept registry and schema element model.
//! - [`xlink`] - locators, resources, arcs, and arc-role constants.
//! - [`linkbase`] - the extended-link-role indexed arc/element store,
//!   specialized per linkbase kind, plus base-set traversal.
//! - [`dts`] - the DTS builder: discovers schemas transitively from a
//!   root and populates the concept registry and linkbase graphs.
//! - [`presentation`] - derived presentation trees.
//! - [`dimension`] - hypercubes, dimensions, and `dimensionAllowed`.
//! - [`calculation`] - weighted-sum calculation validation.
//! - [`instance`] - facts, contexts, units, and the instance loader.
//! - [`outputter`] - serializes an [`instance::Instance`] back to XML.
//!
//! Licensed under AGPL-3.0

pub mod calculation;
pub mod dimension;
pub mod dts;
pub mod error;
pub mod ids;
pub mod instance;
pub mod linkbase;
pub mod outputter;
pub mod presentation;
pub mod schema;
pub mod xlink;
pub mod xml_util;

pub use calculation::{validate_calculations, ValidationConfig};
pub use dts::{create_dts, create_dts_with_config, Dts, DtsBuilderConfig};
pub use error::{Error, Result};
pub use instance::{load_instance, load_instance_with_dts, Instance};
