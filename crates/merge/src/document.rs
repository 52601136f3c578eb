//! Overrides document loading and validation

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use cmdletgen_common::{ConfigError, Result, XmlElement};

/// A targeted override for one service: a partial `<Service>` fragment
/// keyed by `C2jFilename`.
#[derive(Debug, Clone)]
pub struct ServiceOverride {
    pub c2j_filename: String,
    pub fragment: XmlElement,
}

impl ServiceOverride {
    /// The `FileVersion` this override was authored against; absent
    /// means zero.
    pub fn file_version(&self) -> u32 {
        self.fragment
            .child_text("FileVersion")
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Tag names of the top-level elements this override touches.
    pub fn touched_tags(&self) -> BTreeSet<String> {
        self.fragment
            .elements()
            .map(|element| element.name.clone())
            .collect()
    }

    /// Whether this override touches the operation with the given
    /// method name.
    pub fn touches_operation(&self, method_name: &str) -> bool {
        self.fragment
            .child("ServiceOperations")
            .map(|ops| {
                ops.elements_named("ServiceOperation")
                    .any(|op| op.attr("MethodName") == Some(method_name))
            })
            .unwrap_or(false)
    }
}

/// A validated overrides document, indexed by `C2jFilename`.
#[derive(Debug, Clone, Default)]
pub struct OverrideDocument {
    services: Vec<ServiceOverride>,
}

impl OverrideDocument {
    /// Load and validate `overrides.xml`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::load(path, e))?;
        Self::parse(&content)
    }

    /// Parse and validate an overrides document.
    ///
    /// Validation is all-or-nothing: every problem is collected and a
    /// single [`ConfigError::Validation`] carrying all of them is
    /// returned, so nothing from a bad batch is ever applied.
    pub fn parse(xml: &str) -> Result<Self> {
        let root =
            XmlElement::parse(xml).map_err(|e| ConfigError::Validation(e.to_string()))?;

        let mut problems = Vec::new();
        if root.name != "Overrides" {
            problems.push(format!(
                "expected <Overrides> root, found <{}>",
                root.name
            ));
        }

        let mut services = Vec::new();
        let mut seen = BTreeSet::new();
        for (index, fragment) in root.elements().enumerate() {
            let position = index + 1;
            if fragment.name != "Service" {
                problems.push(format!(
                    "override {position}: expected <Service>, found <{}>",
                    fragment.name
                ));
                continue;
            }

            let c2j_filename = match fragment.child_text("C2jFilename") {
                Some(text) if !text.trim().is_empty() => text.trim().to_string(),
                _ => {
                    problems.push(format!(
                        "override {position}: missing <C2jFilename> identification"
                    ));
                    continue;
                }
            };

            if !seen.insert(c2j_filename.clone()) {
                problems.push(format!(
                    "override {position}: duplicate override for '{c2j_filename}'"
                ));
            }

            if let Some(text) = fragment.child_text("FileVersion") {
                if text.trim().parse::<u32>().is_err() {
                    problems.push(format!(
                        "override for '{c2j_filename}': FileVersion '{}' is not an integer",
                        text.trim()
                    ));
                }
            }

            if let Some(ops) = fragment.child("ServiceOperations") {
                for op in ops.elements_named("ServiceOperation") {
                    if op.attr("MethodName").map_or(true, str::is_empty) {
                        problems.push(format!(
                            "override for '{c2j_filename}': <ServiceOperation> without MethodName"
                        ));
                    }
                    if let Some(remove) = op.attr("Remove") {
                        if remove != "true" && remove != "false" {
                            problems.push(format!(
                                "override for '{c2j_filename}': Remove must be 'true' or 'false', found '{remove}'"
                            ));
                        }
                    }
                }
            }

            services.push(ServiceOverride {
                c2j_filename,
                fragment: fragment.clone(),
            });
        }

        if problems.is_empty() {
            Ok(OverrideDocument { services })
        } else {
            Err(ConfigError::Validation(problems.join("\n")))
        }
    }

    /// Overrides in document order.
    pub fn services(&self) -> &[ServiceOverride] {
        &self.services
    }

    /// Look up the override for a service.
    pub fn get(&self, c2j_filename: &str) -> Option<&ServiceOverride> {
        self.services
            .iter()
            .find(|service| service.c2j_filename == c2j_filename)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
