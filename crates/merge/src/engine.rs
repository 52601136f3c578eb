//! Structural merge of override fragments into service configurations

use std::fs;
use std::path::{Path, PathBuf};

use cmdletgen_common::{ConfigError, Result, XmlElement, XmlNode};
use cmdletgen_config::IDENTITY_TAGS;

use crate::document::OverrideDocument;

/// Result of merging one override fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Merge succeeded; the new tree entirely replaces the current one.
    Applied(XmlElement),
    /// The override was authored against a different `FileVersion`;
    /// nothing was changed.
    VersionMismatch { current: u32, requested: u32 },
}

/// A version-gated override that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatch {
    pub c2j_filename: String,
    pub current: u32,
    pub requested: u32,
}

/// Per-service outcomes of an override batch.
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    /// Services whose on-disk config was merged and rewritten.
    pub applied: Vec<String>,
    /// Services bootstrapped from their override fragment alone.
    pub bootstrapped: Vec<String>,
    /// Services skipped by the version gate; resurfaced as analysis
    /// errors at report time.
    pub version_mismatches: Vec<VersionMismatch>,
}

/// Merge an override fragment into a service configuration tree.
///
/// Pure transform: neither input is mutated. Semantics per tag:
/// `FileVersion` is compared, never replaced, and inequality aborts the
/// whole merge; identity tags may not appear in an override at all
/// (`C2jFilename` may appear only with its current value, as
/// identification); `ServiceOperations` merges by `MethodName` with
/// `Remove="true"` deleting an entry; every other tag is a whole-element
/// replace. The merged operation list is re-sorted by method name.
pub fn merge(current: &XmlElement, fragment: &XmlElement) -> Result<MergeOutcome> {
    let service_id = fragment
        .child_text("C2jFilename")
        .unwrap_or_default()
        .trim()
        .to_string();

    // Identity violations are conceptual errors in the override and fail
    // hard, before the soft version gate gets a chance to hide them.
    for element in fragment.elements() {
        let tag = element.name.as_str();
        if tag == "C2jFilename" {
            let current_id = current.child_text("C2jFilename").unwrap_or_default();
            if current_id.trim() != service_id {
                return Err(ConfigError::IdentityOverride {
                    service: service_id,
                    tag: tag.to_string(),
                });
            }
        } else if IDENTITY_TAGS.contains(&tag) {
            return Err(ConfigError::IdentityOverride {
                service: service_id,
                tag: tag.to_string(),
            });
        }
    }

    let current_version = file_version(current);
    let requested_version = file_version(fragment);
    if current_version != requested_version {
        return Ok(MergeOutcome::VersionMismatch {
            current: current_version,
            requested: requested_version,
        });
    }

    let mut merged = current.clone();
    let mut handled_tags: Vec<&str> = Vec::new();
    for element in fragment.elements() {
        let tag = element.name.as_str();
        if handled_tags.contains(&tag) {
            continue;
        }
        handled_tags.push(tag);

        match tag {
            "C2jFilename" | "FileVersion" => {}
            "ServiceOperations" => merge_operations(&mut merged, element),
            _ => replace_elements(&mut merged, fragment, tag),
        }
    }

    sort_operations(&mut merged);
    Ok(MergeOutcome::Applied(merged))
}

/// Last-writer-wins per tag: drop every current element with the tag,
/// then append every override element carrying it.
fn replace_elements(merged: &mut XmlElement, fragment: &XmlElement, tag: &str) {
    merged.children.retain(|node| match node {
        XmlNode::Element(element) => element.name != tag,
        _ => true,
    });
    for element in fragment.elements_named(tag) {
        merged.push_element(element.clone());
    }
}

/// Merge override operations by `MethodName`.
fn merge_operations(merged: &mut XmlElement, override_ops: &XmlElement) {
    if merged.child("ServiceOperations").is_none() {
        merged.push_element(XmlElement::new("ServiceOperations"));
    }
    let Some(ops) = merged.child_mut("ServiceOperations") else {
        return;
    };

    for op in override_ops.elements_named("ServiceOperation") {
        let method_name = op.attr("MethodName").unwrap_or_default().to_string();
        ops.children.retain(|node| match node {
            XmlNode::Element(existing) => {
                existing.attr("MethodName") != Some(method_name.as_str())
            }
            _ => true,
        });

        if op.attr("Remove") == Some("true") {
            continue;
        }
        // The override element replaces the prior one verbatim, an
        // explicit Remove="false" included.
        ops.push_element(op.clone());
    }
}

/// Sort the operation list by `MethodName` so serialized output is
/// deterministic. Comments inside `<ServiceOperations>` stay ahead of
/// the operations.
pub fn sort_operations(service: &mut XmlElement) {
    let Some(ops) = service.child_mut("ServiceOperations") else {
        return;
    };

    let mut comments = Vec::new();
    let mut operations = Vec::new();
    for node in ops.children.drain(..) {
        match node {
            XmlNode::Element(element) => operations.push(element),
            XmlNode::Comment(text) => comments.push(XmlNode::Comment(text)),
            XmlNode::Text(_) => {}
        }
    }
    operations.sort_by(|a, b| {
        a.attr("MethodName")
            .unwrap_or_default()
            .cmp(b.attr("MethodName").unwrap_or_default())
    });

    ops.children = comments;
    ops.children
        .extend(operations.into_iter().map(XmlNode::Element));
}

fn file_version(element: &XmlElement) -> u32 {
    element
        .child_text("FileVersion")
        .and_then(|text| text.trim().parse().ok())
        .unwrap_or(0)
}

/// Applies a validated override batch to on-disk config files.
#[derive(Debug, Clone)]
pub struct OverrideEngine {
    config_dir: PathBuf,
}

impl OverrideEngine {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        OverrideEngine {
            config_dir: config_dir.into(),
        }
    }

    /// Path of a service's config file.
    pub fn config_path(&self, c2j_filename: &str) -> PathBuf {
        self.config_dir.join(format!("{c2j_filename}.xml"))
    }

    /// Apply every override in the document.
    ///
    /// A service with no on-disk config yet is bootstrapped from its
    /// fragment alone. A version mismatch skips that service and is
    /// recorded in the summary; identity violations and I/O failures
    /// abort the batch.
    pub fn apply(&self, document: &OverrideDocument) -> Result<MergeSummary> {
        let mut summary = MergeSummary::default();

        for service in document.services() {
            let path = self.config_path(&service.c2j_filename);
            if !path.exists() {
                let mut config = service.fragment.clone();
                sort_operations(&mut config);
                write_config(&path, &config)?;
                summary.bootstrapped.push(service.c2j_filename.clone());
                continue;
            }

            let content = fs::read_to_string(&path).map_err(|e| ConfigError::load(&path, e))?;
            let current = XmlElement::parse(&content).map_err(|e| ConfigError::load(&path, e))?;

            match merge(&current, &service.fragment)? {
                MergeOutcome::Applied(merged) => {
                    write_config(&path, &merged)?;
                    summary.applied.push(service.c2j_filename.clone());
                }
                MergeOutcome::VersionMismatch { current, requested } => {
                    summary.version_mismatches.push(VersionMismatch {
                        c2j_filename: service.c2j_filename.clone(),
                        current,
                        requested,
                    });
                }
            }
        }

        Ok(summary)
    }
}

fn write_config(path: &Path, config: &XmlElement) -> Result<()> {
    let document = config
        .to_document()
        .map_err(|e| ConfigError::write(path, e))?;
    fs::write(path, document).map_err(|e| ConfigError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"<Service>
    <C2jFilename>foo</C2jFilename>
    <ServiceName>Foo Service</ServiceName>
    <FileVersion>2</FileVersion>
    <VerbMappings>
        <Map From="Describe" To="Get" />
    </VerbMappings>
    <ServiceOperations>
        <ServiceOperation MethodName="ListFoos" />
        <ServiceOperation MethodName="DeleteFoo" Verb="Remove" />
    </ServiceOperations>
</Service>"#;

    fn current() -> XmlElement {
        XmlElement::parse(CURRENT).unwrap()
    }

    fn fragment(xml: &str) -> XmlElement {
        XmlElement::parse(xml).unwrap()
    }

    fn applied(outcome: MergeOutcome) -> XmlElement {
        match outcome {
            MergeOutcome::Applied(merged) => merged,
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    #[test]
    fn test_operation_replace_by_method_name() {
        let merged = applied(
            merge(
                &current(),
                &fragment(
                    r#"<Service>
                           <C2jFilename>foo</C2jFilename>
                           <FileVersion>2</FileVersion>
                           <ServiceOperations>
                               <ServiceOperation MethodName="ListFoos" Verb="Find" />
                           </ServiceOperations>
                       </Service>"#,
                ),
            )
            .unwrap(),
        );

        let ops = merged.child("ServiceOperations").unwrap();
        let listed: Vec<_> = ops
            .elements_named("ServiceOperation")
            .filter(|op| op.attr("MethodName") == Some("ListFoos"))
            .collect();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].attr("Verb"), Some("Find"));
        // Untouched operation survives.
        assert!(ops
            .elements_named("ServiceOperation")
            .any(|op| op.attr("MethodName") == Some("DeleteFoo")));
    }

    #[test]
    fn test_operation_remove_directive() {
        let merged = applied(
            merge(
                &current(),
                &fragment(
                    r#"<Service>
                           <C2jFilename>foo</C2jFilename>
                           <FileVersion>2</FileVersion>
                           <ServiceOperations>
                               <ServiceOperation MethodName="DeleteFoo" Remove="true" />
                           </ServiceOperations>
                       </Service>"#,
                ),
            )
            .unwrap(),
        );

        let ops = merged.child("ServiceOperations").unwrap();
        assert!(!ops
            .elements_named("ServiceOperation")
            .any(|op| op.attr("MethodName") == Some("DeleteFoo")));
        assert!(ops
            .elements_named("ServiceOperation")
            .any(|op| op.attr("MethodName") == Some("ListFoos")));
    }

    #[test]
    fn test_explicit_remove_false_is_kept_verbatim() {
        let merged = applied(
            merge(
                &current(),
                &fragment(
                    r#"<Service>
                           <C2jFilename>foo</C2jFilename>
                           <FileVersion>2</FileVersion>
                           <ServiceOperations>
                               <ServiceOperation MethodName="ListFoos" Verb="Find" Remove="false" />
                           </ServiceOperations>
                       </Service>"#,
                ),
            )
            .unwrap(),
        );

        let ops = merged.child("ServiceOperations").unwrap();
        let op = ops
            .elements_named("ServiceOperation")
            .find(|op| op.attr("MethodName") == Some("ListFoos"))
            .unwrap();
        assert_eq!(op.attr("Verb"), Some("Find"));
        assert_eq!(op.attr("Remove"), Some("false"));
    }

    #[test]
    fn test_whole_element_replace_for_other_tags() {
        let merged = applied(
            merge(
                &current(),
                &fragment(
                    r#"<Service>
                           <C2jFilename>foo</C2jFilename>
                           <FileVersion>2</FileVersion>
                           <VerbMappings>
                               <Map From="List" To="Get" />
                           </VerbMappings>
                       </Service>"#,
                ),
            )
            .unwrap(),
        );

        let mappings = merged.child("VerbMappings").unwrap();
        let maps: Vec<_> = mappings.elements_named("Map").collect();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].attr("From"), Some("List"));
    }

    #[test]
    fn test_version_gate() {
        let outcome = merge(
            &current(),
            &fragment(
                r#"<Service>
                       <C2jFilename>foo</C2jFilename>
                       <FileVersion>3</FileVersion>
                       <ServiceOperations>
                           <ServiceOperation MethodName="ListFoos" Verb="Find" />
                       </ServiceOperations>
                   </Service>"#,
            ),
        )
        .unwrap();

        assert_eq!(
            outcome,
            MergeOutcome::VersionMismatch {
                current: 2,
                requested: 3
            }
        );
    }

    #[test]
    fn test_file_version_is_never_replaced() {
        let merged = applied(
            merge(
                &current(),
                &fragment(
                    r#"<Service>
                           <C2jFilename>foo</C2jFilename>
                           <FileVersion>2</FileVersion>
                       </Service>"#,
                ),
            )
            .unwrap(),
        );
        assert_eq!(merged.child_text("FileVersion").as_deref(), Some("2"));
    }

    #[test]
    fn test_identity_field_override_is_rejected() {
        let err = merge(
            &current(),
            &fragment(
                r#"<Service>
                       <C2jFilename>foo</C2jFilename>
                       <FileVersion>2</FileVersion>
                       <ServiceClient>EvilClient</ServiceClient>
                   </Service>"#,
            ),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::IdentityOverride { ref tag, .. } if tag == "ServiceClient"));
    }

    #[test]
    fn test_identity_check_beats_version_gate() {
        // Even with a stale version, changing identity is a hard error.
        let err = merge(
            &current(),
            &fragment(
                r#"<Service>
                       <C2jFilename>foo</C2jFilename>
                       <FileVersion>9</FileVersion>
                       <ServiceName>Renamed</ServiceName>
                   </Service>"#,
            ),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::IdentityOverride { .. }));
    }

    #[test]
    fn test_mismatched_c2j_filename_is_rejected() {
        let err = merge(
            &current(),
            &fragment(
                r#"<Service>
                       <C2jFilename>bar</C2jFilename>
                       <FileVersion>2</FileVersion>
                   </Service>"#,
            ),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::IdentityOverride { ref tag, .. } if tag == "C2jFilename"));
    }

    #[test]
    fn test_merged_operations_are_sorted() {
        let merged = applied(
            merge(
                &current(),
                &fragment(
                    r#"<Service>
                           <C2jFilename>foo</C2jFilename>
                           <FileVersion>2</FileVersion>
                           <ServiceOperations>
                               <ServiceOperation MethodName="AddFoo" />
                           </ServiceOperations>
                       </Service>"#,
                ),
            )
            .unwrap(),
        );

        let names: Vec<_> = merged
            .child("ServiceOperations")
            .unwrap()
            .elements_named("ServiceOperation")
            .map(|op| op.attr("MethodName").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["AddFoo", "DeleteFoo", "ListFoos"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut service = current();
        sort_operations(&mut service);
        let once = service.to_document().unwrap();
        sort_operations(&mut service);
        assert_eq!(once, service.to_document().unwrap());
    }

    #[test]
    fn test_merge_into_config_without_operations() {
        let bare = fragment(
            "<Service><C2jFilename>foo</C2jFilename><FileVersion>0</FileVersion></Service>",
        );
        let merged = applied(
            merge(
                &bare,
                &fragment(
                    r#"<Service>
                           <C2jFilename>foo</C2jFilename>
                           <ServiceOperations>
                               <ServiceOperation MethodName="ListFoos" />
                           </ServiceOperations>
                       </Service>"#,
                ),
            )
            .unwrap(),
        );
        assert!(merged
            .child("ServiceOperations")
            .unwrap()
            .elements_named("ServiceOperation")
            .any(|op| op.attr("MethodName") == Some("ListFoos")));
    }
}
