//! Configuration data model for Cmdletgen
//!
//! Typed, frozen representations of a service's generation configuration
//! and of the cross-service manifest. Models are built in two phases:
//! deserialize the on-disk XML into ordered lists, then build the lookup
//! maps once. After load, configs are treated as immutable except for the
//! generation-time fields the analysis phase fills in.

mod manifest;
mod naming;
mod operation;
mod params;
mod service;

pub use manifest::{GeneratorManifest, NameMapping, VerbMapping, VerbMappingManifest};
pub use naming::split_method_name;
pub use operation::{AnonymousAuthMode, OperationConfig};
pub use params::{should_exclude_parameter, AutoIterate, ParamCustomization};
pub use service::{ServiceConfig, IDENTITY_TAGS};
