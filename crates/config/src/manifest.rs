//! Cross-service manifest: verb priority tables and global remaps

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use cmdletgen_common::{ConfigError, Result, XmlElement};
use serde::Serialize;

use crate::params::parse_flag;
use crate::service::ServiceConfig;

/// A simple `From` → `To` name remap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameMapping {
    pub from: String,
    pub to: String,
}

impl NameMapping {
    /// Build from a `<Map>` element.
    pub fn from_xml(element: &XmlElement) -> Result<Self> {
        let from = element
            .attr("From")
            .ok_or_else(|| ConfigError::Malformed("<Map> is missing From".to_string()))?;
        let to = element
            .attr("To")
            .ok_or_else(|| ConfigError::Malformed("<Map> is missing To".to_string()))?;
        Ok(NameMapping {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// One candidate shell verb for a raw SDK verb token.
///
/// `weight` encodes how often this choice has shipped historically;
/// `is_default` marks the curated choice, which outranks any weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerbMapping {
    pub verb: String,
    pub weight: u32,
    pub is_default: bool,
}

/// Ordered verb candidates per raw SDK verb token.
///
/// Ordering is fixed at construction: defaults sorted by descending
/// weight, then non-defaults by descending weight, with case-insensitive
/// duplicates removed keeping the most preferred occurrence. The raw
/// token key is case-insensitive.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerbMappingManifest {
    ordered: HashMap<String, Vec<VerbMapping>>,
}

impl VerbMappingManifest {
    /// Build the manifest, computing the priority ordering once.
    pub fn new(entries: impl IntoIterator<Item = (String, Vec<VerbMapping>)>) -> Self {
        let ordered = entries
            .into_iter()
            .map(|(raw_verb, mappings)| (raw_verb.to_lowercase(), order_candidates(mappings)))
            .collect();
        VerbMappingManifest { ordered }
    }

    /// Build from a `<VerbMappings>` element of the manifest document.
    pub fn from_xml(element: &XmlElement) -> Result<Self> {
        let mut entries = Vec::new();
        for verb_element in element.elements_named("VerbMapping") {
            let raw_verb = verb_element
                .attr("From")
                .ok_or_else(|| ConfigError::Malformed("<VerbMapping> is missing From".to_string()))?
                .to_string();
            let mut mappings = Vec::new();
            for map in verb_element.elements_named("Map") {
                let verb = map
                    .attr("To")
                    .ok_or_else(|| ConfigError::Malformed("<Map> is missing To".to_string()))?
                    .to_string();
                let weight = match map.attr("Weight") {
                    Some(text) => text.parse::<u32>().map_err(|_| {
                        ConfigError::Malformed(format!("Weight '{text}' is not an integer"))
                    })?,
                    None => 0,
                };
                mappings.push(VerbMapping {
                    verb,
                    weight,
                    is_default: parse_flag(map.attr("Default"))?,
                });
            }
            entries.push((raw_verb, mappings));
        }
        Ok(VerbMappingManifest::new(entries))
    }

    /// All candidates for a raw verb token, highest priority first.
    pub fn all_mappings(&self, raw_verb: &str) -> &[VerbMapping] {
        if raw_verb.is_empty() {
            return &[];
        }
        self.ordered
            .get(&raw_verb.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The single top-priority verb for a raw verb token.
    ///
    /// Empty input and unknown tokens yield no mapping; neither is an
    /// error.
    pub fn priority_verb(&self, raw_verb: &str) -> Option<&str> {
        self.all_mappings(raw_verb)
            .first()
            .map(|mapping| mapping.verb.as_str())
    }

    /// Candidates for a raw verb token with a service's explicit remap
    /// applied, highest priority first.
    ///
    /// A service-level remap is yielded first at synthetic maximal
    /// priority; global candidates that duplicate it case-insensitively
    /// are suppressed so the conflict resolver never sees the same final
    /// verb twice. The result is small and bounded, so it is returned
    /// materialized rather than lazily.
    pub fn mappings_in_priority_order(
        &self,
        raw_verb: &str,
        service: &ServiceConfig,
    ) -> Vec<VerbMapping> {
        let service_verb = service.verb_override(raw_verb);

        let mut candidates = Vec::new();
        if let Some(verb) = service_verb {
            candidates.push(VerbMapping {
                verb: verb.to_string(),
                weight: u32::MAX,
                is_default: true,
            });
        }

        for mapping in self.all_mappings(raw_verb) {
            if let Some(verb) = service_verb {
                if mapping.verb.eq_ignore_ascii_case(verb) {
                    continue;
                }
            }
            candidates.push(mapping.clone());
        }

        candidates
    }
}

/// Order candidates: defaults before non-defaults, each group by
/// descending weight, then case-insensitive dedup keeping the earliest
/// (most preferred) occurrence of each verb.
fn order_candidates(mappings: Vec<VerbMapping>) -> Vec<VerbMapping> {
    let (mut defaults, mut rest): (Vec<_>, Vec<_>) =
        mappings.into_iter().partition(|mapping| mapping.is_default);
    defaults.sort_by(|a, b| b.weight.cmp(&a.weight));
    rest.sort_by(|a, b| b.weight.cmp(&a.weight));
    defaults.append(&mut rest);

    let mut seen: Vec<String> = Vec::new();
    defaults.retain(|mapping| {
        let key = mapping.verb.to_lowercase();
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
    defaults
}

/// The cross-service manifest, loaded from `Configs.xml`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeneratorManifest {
    /// Per-service config file names, relative to the config directory.
    pub config_files: Vec<String>,
    pub verb_mappings: VerbMappingManifest,
    pub noun_mappings: Vec<NameMapping>,
    /// Nouns allowed to keep their plural form in cmdlet names.
    pub plural_nouns: Vec<String>,
}

impl GeneratorManifest {
    /// Load the manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::load(path, e))?;
        let root = XmlElement::parse(&content).map_err(|e| ConfigError::load(path, e))?;
        Self::from_xml(&root).map_err(|e| ConfigError::load(path, e))
    }

    /// Build from a parsed `<ConfigManifest>` document.
    pub fn from_xml(root: &XmlElement) -> Result<Self> {
        if root.name != "ConfigManifest" {
            return Err(ConfigError::Malformed(format!(
                "expected <ConfigManifest> root, found <{}>",
                root.name
            )));
        }

        let config_files = match root.child("ConfigFiles") {
            Some(list) => list
                .elements_named("File")
                .map(|element| element.text())
                .collect(),
            None => Vec::new(),
        };

        let verb_mappings = match root.child("VerbMappings") {
            Some(element) => VerbMappingManifest::from_xml(element)?,
            None => VerbMappingManifest::default(),
        };

        let noun_mappings = match root.child("NounMappings") {
            Some(list) => list
                .elements_named("Map")
                .map(NameMapping::from_xml)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let plural_nouns = match root.child("PluralNouns") {
            Some(list) => list
                .elements_named("Noun")
                .map(|element| element.text())
                .collect(),
            None => Vec::new(),
        };

        Ok(GeneratorManifest {
            config_files,
            verb_mappings,
            noun_mappings,
            plural_nouns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(verb: &str, weight: u32, is_default: bool) -> VerbMapping {
        VerbMapping {
            verb: verb.to_string(),
            weight,
            is_default,
        }
    }

    fn describe_manifest() -> VerbMappingManifest {
        VerbMappingManifest::new(vec![(
            "Describe".to_string(),
            vec![
                mapping("Read", 500, false),
                mapping("Get", 120, true),
                mapping("Show", 40, true),
                mapping("GET", 999, false),
            ],
        )])
    }

    #[test]
    fn test_default_outranks_heavier_non_default() {
        let manifest = describe_manifest();
        // "Read" has the largest weight but is not a curated default.
        assert_eq!(manifest.priority_verb("Describe"), Some("Get"));
    }

    #[test]
    fn test_ordering_and_case_insensitive_dedup() {
        let manifest = describe_manifest();
        let verbs: Vec<&str> = manifest
            .all_mappings("Describe")
            .iter()
            .map(|m| m.verb.as_str())
            .collect();
        // "GET" (non-default) is a case-insensitive duplicate of the
        // default "Get" and is suppressed.
        assert_eq!(verbs, vec!["Get", "Show", "Read"]);
    }

    #[test]
    fn test_raw_verb_key_is_case_insensitive() {
        let manifest = describe_manifest();
        assert_eq!(manifest.priority_verb("describe"), Some("Get"));
        assert_eq!(manifest.priority_verb("DESCRIBE"), Some("Get"));
    }

    #[test]
    fn test_empty_and_unknown_verbs_have_no_mapping() {
        let manifest = describe_manifest();
        assert_eq!(manifest.priority_verb(""), None);
        assert_eq!(manifest.priority_verb("Conjure"), None);
        assert!(manifest.all_mappings("").is_empty());
    }

    #[test]
    fn test_service_override_comes_first_and_is_not_duplicated() {
        let manifest = describe_manifest();
        let service = service_with_describe_remap("Read");

        let candidates = manifest.mappings_in_priority_order("Describe", &service);
        let verbs: Vec<&str> = candidates.iter().map(|m| m.verb.as_str()).collect();

        // The service remap leads at synthetic max priority, and the
        // global "Read" candidate is suppressed.
        assert_eq!(verbs, vec!["Read", "Get", "Show"]);
        assert_eq!(candidates[0].weight, u32::MAX);
        assert!(candidates[0].is_default);
    }

    #[test]
    fn test_service_override_unknown_to_manifest_still_leads() {
        let manifest = describe_manifest();
        let service = service_with_describe_remap("Find");

        let verbs: Vec<String> = manifest
            .mappings_in_priority_order("Describe", &service)
            .into_iter()
            .map(|m| m.verb)
            .collect();
        assert_eq!(verbs, vec!["Find", "Get", "Show", "Read"]);
    }

    #[test]
    fn test_no_service_override_falls_through_to_manifest() {
        let manifest = describe_manifest();
        let service = plain_service();

        let verbs: Vec<String> = manifest
            .mappings_in_priority_order("Describe", &service)
            .into_iter()
            .map(|m| m.verb)
            .collect();
        assert_eq!(verbs, vec!["Get", "Show", "Read"]);
    }

    #[test]
    fn test_manifest_from_xml() {
        let root = XmlElement::parse(
            r#"<ConfigManifest>
                   <ConfigFiles>
                       <File>foo.xml</File>
                       <File>bar.xml</File>
                   </ConfigFiles>
                   <VerbMappings>
                       <VerbMapping From="Describe">
                           <Map To="Get" Weight="120" Default="true" />
                           <Map To="Read" Weight="500" />
                       </VerbMapping>
                   </VerbMappings>
                   <NounMappings>
                       <Map From="Indices" To="Index" />
                   </NounMappings>
                   <PluralNouns>
                       <Noun>Data</Noun>
                   </PluralNouns>
               </ConfigManifest>"#,
        )
        .unwrap();

        let manifest = GeneratorManifest::from_xml(&root).unwrap();
        assert_eq!(manifest.config_files, vec!["foo.xml", "bar.xml"]);
        assert_eq!(manifest.verb_mappings.priority_verb("Describe"), Some("Get"));
        assert_eq!(manifest.noun_mappings[0].to, "Index");
        assert_eq!(manifest.plural_nouns, vec!["Data"]);
    }

    fn plain_service() -> ServiceConfig {
        let root = XmlElement::parse(
            "<Service><C2jFilename>plain</C2jFilename><FileVersion>1</FileVersion></Service>",
        )
        .unwrap();
        ServiceConfig::from_xml(&root).unwrap()
    }

    fn service_with_describe_remap(to: &str) -> ServiceConfig {
        let xml = format!(
            r#"<Service>
                   <C2jFilename>mapped</C2jFilename>
                   <FileVersion>1</FileVersion>
                   <VerbMappings>
                       <Map From="Describe" To="{to}" />
                   </VerbMappings>
               </Service>"#
        );
        let root = XmlElement::parse(&xml).unwrap();
        ServiceConfig::from_xml(&root).unwrap()
    }
}
