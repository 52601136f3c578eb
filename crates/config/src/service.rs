//! Per-service configuration model

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use cmdletgen_common::{ConfigError, Result, XmlElement};
use serde::Serialize;

use crate::manifest::NameMapping;
use crate::operation::OperationConfig;
use crate::params::{parse_flag, AutoIterate, ParamCustomization};

/// Identity tags that an override may never change.
pub const IDENTITY_TAGS: &[&str] = &[
    "C2jFilename",
    "SkipCmdletGeneration",
    "AssemblyName",
    "ServiceNounPrefix",
    "ServiceName",
    "ServiceClientInterface",
    "ServiceClient",
    "ServiceModuleGuid",
];

/// One service's generation configuration, loaded from `<C2jFilename>.xml`.
///
/// Lists carry the on-disk shape; the lookup maps are built once at load
/// and kept in step by [`Self::push_operation`]. Merges happen on the XML
/// tree before loading, so a loaded config only grows during analysis.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    pub c2j_filename: String,
    pub service_name: String,
    pub assembly_name: String,
    pub service_noun_prefix: String,
    pub service_client: String,
    pub service_client_interface: String,
    pub service_module_guid: Option<String>,
    pub skip_cmdlet_generation: bool,
    /// Optimistic-concurrency gate for override application; carries no
    /// other meaning.
    pub file_version: u32,
    pub verb_mappings: Vec<NameMapping>,
    pub noun_mappings: Vec<NameMapping>,
    pub custom_parameters: Vec<ParamCustomization>,
    pub types_not_to_flatten: Vec<String>,
    pub auto_iterate: Option<AutoIterate>,
    pub operations: Vec<OperationConfig>,

    #[serde(skip)]
    verb_map: HashMap<String, String>,
    #[serde(skip)]
    noun_map: HashMap<String, String>,
    #[serde(skip)]
    operation_index: HashMap<String, usize>,

    /// Service-level analysis errors recorded during generation.
    pub analysis_errors: Vec<String>,
    pub info_messages: Vec<String>,
}

impl ServiceConfig {
    /// Load a service configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::load(path, e))?;
        let root = XmlElement::parse(&content).map_err(|e| ConfigError::load(path, e))?;
        Self::from_xml(&root).map_err(|e| ConfigError::load(path, e))
    }

    /// Build the typed model from a parsed `<Service>` document.
    pub fn from_xml(root: &XmlElement) -> Result<Self> {
        if root.name != "Service" {
            return Err(ConfigError::Malformed(format!(
                "expected <Service> root, found <{}>",
                root.name
            )));
        }

        let c2j_filename = required_text(root, "C2jFilename")?;
        let file_version = match root.child_text("FileVersion") {
            Some(text) => text.trim().parse::<u32>().map_err(|_| {
                ConfigError::Malformed(format!("FileVersion '{text}' is not an integer"))
            })?,
            None => 0,
        };

        let verb_mappings = name_mappings(root, "VerbMappings")?;
        let noun_mappings = name_mappings(root, "NounMappings")?;

        let custom_parameters = match root.child("Params") {
            Some(list) => list
                .elements_named("Param")
                .map(ParamCustomization::from_xml)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let types_not_to_flatten = match root.child("TypesNotToFlatten") {
            Some(list) => list
                .elements_named("Type")
                .map(|element| element.text())
                .collect(),
            None => Vec::new(),
        };

        let auto_iterate = root
            .child("AutoIterate")
            .map(AutoIterate::from_xml)
            .transpose()?;

        let operations = match root.child("ServiceOperations") {
            Some(list) => list
                .elements_named("ServiceOperation")
                .map(OperationConfig::from_xml)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let verb_map = lowercase_map(&verb_mappings);
        let noun_map = lowercase_map(&noun_mappings);
        let operation_index = operations
            .iter()
            .enumerate()
            .map(|(index, op)| (op.method_name.clone(), index))
            .collect();

        Ok(ServiceConfig {
            c2j_filename,
            service_name: root.child_text("ServiceName").unwrap_or_default(),
            assembly_name: root.child_text("AssemblyName").unwrap_or_default(),
            service_noun_prefix: root.child_text("ServiceNounPrefix").unwrap_or_default(),
            service_client: root.child_text("ServiceClient").unwrap_or_default(),
            service_client_interface: root
                .child_text("ServiceClientInterface")
                .unwrap_or_default(),
            service_module_guid: root.child_text("ServiceModuleGuid"),
            skip_cmdlet_generation: parse_flag(
                root.child_text("SkipCmdletGeneration").as_deref(),
            )?,
            file_version,
            verb_mappings,
            noun_mappings,
            custom_parameters,
            types_not_to_flatten,
            auto_iterate,
            operations,
            verb_map,
            noun_map,
            operation_index,
            analysis_errors: Vec::new(),
            info_messages: Vec::new(),
        })
    }

    /// Service-level verb remap for a raw verb token, if one is configured.
    pub fn verb_override(&self, raw_verb: &str) -> Option<&str> {
        self.verb_map
            .get(&raw_verb.to_lowercase())
            .map(String::as_str)
    }

    /// Service-level noun remap, if one is configured.
    pub fn noun_override(&self, raw_noun: &str) -> Option<&str> {
        self.noun_map
            .get(&raw_noun.to_lowercase())
            .map(String::as_str)
    }

    /// Operation entry by SDK method name.
    pub fn operation(&self, method_name: &str) -> Option<&OperationConfig> {
        self.operation_index
            .get(method_name)
            .map(|&index| &self.operations[index])
    }

    /// Mutable operation entry, for the analysis phase.
    pub fn operation_mut(&mut self, method_name: &str) -> Option<&mut OperationConfig> {
        self.operation_index
            .get(method_name)
            .map(|&index| &mut self.operations[index])
    }

    /// Append an operation discovered during analysis, keeping the
    /// lookup index in step with the list.
    pub fn push_operation(&mut self, operation: OperationConfig) {
        self.operation_index
            .insert(operation.method_name.clone(), self.operations.len());
        self.operations.push(operation);
    }

    /// Record a service-level analysis error.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.analysis_errors.push(message.into());
    }

    /// Whether this model or any of its operations recorded an error.
    pub fn has_errors(&self) -> bool {
        !self.analysis_errors.is_empty() || self.operations.iter().any(OperationConfig::has_errors)
    }
}

fn required_text(root: &XmlElement, tag: &str) -> Result<String> {
    root.child_text(tag)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ConfigError::Malformed(format!("<Service> is missing <{tag}>")))
}

fn name_mappings(root: &XmlElement, tag: &str) -> Result<Vec<NameMapping>> {
    match root.child(tag) {
        Some(list) => list.elements_named("Map").map(NameMapping::from_xml).collect(),
        None => Ok(Vec::new()),
    }
}

fn lowercase_map(mappings: &[NameMapping]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for mapping in mappings {
        // First occurrence wins on duplicate keys.
        map.entry(mapping.from.to_lowercase())
            .or_insert_with(|| mapping.to.clone());
    }
    map
}
