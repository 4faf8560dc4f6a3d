//! Metadata extraction from XPS packages.
//!
//! Provides tolerant extraction of the OPC core properties.

pub mod core_properties;

pub use core_properties::{
    extract_properties, find_core_properties_part, MetadataScanner, PropertyDict, PropertyKey,
};
