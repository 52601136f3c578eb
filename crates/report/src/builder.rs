//! Pure construction of the report tree

use std::collections::BTreeSet;

use cmdletgen_common::{OperationAnalyzer, XmlElement, XmlNode};
use cmdletgen_config::{OperationConfig, IDENTITY_TAGS};
use cmdletgen_merge::{OverrideDocument, ServiceOverride};

use crate::{ReportModel, OVERRIDES_SCHEMA_LOCATION};

/// Builds the report tree from analyzed models.
///
/// All methods are pure tree transforms; file I/O lives in
/// [`crate::write_report`].
pub struct ReportBuilder<'a> {
    overrides: &'a OverrideDocument,
    analyzer: &'a dyn OperationAnalyzer,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(overrides: &'a OverrideDocument, analyzer: &'a dyn OperationAnalyzer) -> Self {
        ReportBuilder {
            overrides,
            analyzer,
        }
    }

    /// Build the `<Overrides>` report root.
    ///
    /// Raises a version mismatch between an override and its model as an
    /// analysis error on the model, then includes every model that has
    /// errors, is override-affected, or carries auto-configuring or
    /// erroring operations.
    pub fn build(&self, models: &mut [ReportModel]) -> XmlElement {
        let mut root = XmlElement::new("Overrides");
        root.set_attr("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance");
        root.set_attr("xsi:noNamespaceSchemaLocation", OVERRIDES_SCHEMA_LOCATION);

        for model in models.iter_mut() {
            let service_override = self.overrides.get(&model.config.c2j_filename);

            if let Some(service_override) = service_override {
                let requested = service_override.file_version();
                let current = model.config.file_version;
                if requested != current {
                    model.config.record_error(format!(
                        "override was authored against FileVersion {requested} \
                         but the configuration is at FileVersion {current}; \
                         the override was not applied"
                    ));
                }
            }

            if self.should_include(model, service_override) {
                root.push_element(self.service_element(model, service_override));
            }
        }

        root
    }

    fn should_include(&self, model: &ReportModel, service_override: Option<&ServiceOverride>) -> bool {
        service_override.is_some()
            || model.config.has_errors()
            || model
                .config
                .operations
                .iter()
                .any(|op| op.is_auto_configuring)
    }

    /// Render one included service.
    ///
    /// Identity elements are dropped, override-touched elements are kept
    /// verbatim, and everything else becomes a comment preserving the
    /// original content. The report shows only what changed or what a
    /// reviewer may edit back in through an override.
    fn service_element(
        &self,
        model: &ReportModel,
        service_override: Option<&ServiceOverride>,
    ) -> XmlElement {
        let touched: BTreeSet<String> = service_override
            .map(ServiceOverride::touched_tags)
            .unwrap_or_default();

        let mut out = XmlElement::new("Service");
        for error in &model.config.analysis_errors {
            out.push_comment(format!(" ERROR: {error} "));
        }
        for info in &model.config.info_messages {
            out.push_comment(format!(" INFO: {info} "));
        }

        let mut emitted_operations = false;
        for element in model.tree.elements() {
            match element.name.as_str() {
                "C2jFilename" | "FileVersion" => out.push_element(element.clone()),
                "ServiceOperations" => {
                    out.push_element(self.operations_element(model, service_override));
                    emitted_operations = true;
                }
                tag if IDENTITY_TAGS.contains(&tag) => {}
                tag if touched.contains(tag) => out.push_element(element.clone()),
                _ => out.push_comment(format!(" {} ", render_inline(element))),
            }
        }

        // A service bootstrapped without operations can still gain
        // auto-configured ones during analysis.
        if !emitted_operations {
            out.push_element(self.operations_element(model, service_override));
        }

        out
    }

    fn operations_element(
        &self,
        model: &ReportModel,
        service_override: Option<&ServiceOverride>,
    ) -> XmlElement {
        let mut retained: Vec<&OperationConfig> = model
            .config
            .operations
            .iter()
            .filter(|op| {
                op.is_auto_configuring
                    || op.has_errors()
                    || service_override
                        .map(|so| so.touches_operation(&op.method_name))
                        .unwrap_or(false)
            })
            .collect();
        retained.sort_by(|a, b| a.method_name.cmp(&b.method_name));

        let mut ops = XmlElement::new("ServiceOperations");
        for op in retained {
            self.append_operation(&mut ops, model, op, service_override);
        }
        ops
    }

    fn append_operation(
        &self,
        ops: &mut XmlElement,
        model: &ReportModel,
        op: &OperationConfig,
        service_override: Option<&ServiceOverride>,
    ) {
        // Leading comments, in fixed priority order.
        if op.is_auto_configuring {
            ops.push_comment(format!(
                " NEW: {} was auto-configured and needs review ",
                op.method_name
            ));
        }
        if service_override
            .map(|so| so.touches_operation(&op.method_name))
            .unwrap_or(false)
        {
            ops.push_comment(format!(" {} was modified by an override ", op.method_name));
        }
        for error in &op.analysis_errors {
            ops.push_comment(format!(" ERROR: {error} "));
        }
        for info in &op.info_messages {
            ops.push_comment(format!(" INFO: {info} "));
        }

        ops.push_element(self.operation_element(model, op));

        // Trailing comments with analyzer-derived shapes.
        if let Some(analysis) = self.analyzer.analysis_for(&op.method_name) {
            for parameter in &analysis.parameters {
                let alias = parameter
                    .alias
                    .as_deref()
                    .map(|alias| format!(" (alias {alias})"))
                    .unwrap_or_default();
                let required = if parameter.required {
                    "required"
                } else {
                    "optional"
                };
                ops.push_comment(format!(
                    " parameter {}{alias}, {required} ",
                    parameter.name
                ));
            }
            if let Some(return_type) = &analysis.return_type {
                let properties: Vec<String> = return_type
                    .properties
                    .iter()
                    .map(|(name, type_name)| format!("{name}: {type_name}"))
                    .collect();
                ops.push_comment(format!(
                    " returns {} {{ {} }} ",
                    return_type.name,
                    properties.join(", ")
                ));
            }
        }
    }

    /// The on-disk element when one exists, otherwise a synthesized
    /// entry carrying the resolved names.
    fn operation_element(&self, model: &ReportModel, op: &OperationConfig) -> XmlElement {
        if let Some(existing) = model
            .tree
            .child("ServiceOperations")
            .and_then(|ops| {
                ops.elements_named("ServiceOperation")
                    .find(|element| element.attr("MethodName") == Some(op.method_name.as_str()))
            })
        {
            return existing.clone();
        }

        let mut element = XmlElement::new("ServiceOperation");
        element.set_attr("MethodName", op.method_name.clone());
        if let Some(verb) = op.selected_verb.as_deref().or(op.verb.as_deref()) {
            element.set_attr("Verb", verb);
        }
        if let Some(noun) = op.selected_noun.as_deref().or(op.noun.as_deref()) {
            element.set_attr("Noun", noun);
        }
        element
    }
}

/// Render an element compactly on one line, for embedding in a comment.
fn render_inline(element: &XmlElement) -> String {
    let mut out = String::new();
    render_inline_into(element, &mut out);
    out
}

fn render_inline_into(element: &XmlElement, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push_str(&format!(" {key}=\"{value}\""));
    }
    if element.children.is_empty() {
        out.push_str(" />");
        return;
    }
    out.push('>');
    for node in &element.children {
        match node {
            XmlNode::Element(child) => render_inline_into(child, out),
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Comment(_) => {}
        }
    }
    out.push_str(&format!("</{}>", element.name));
}
