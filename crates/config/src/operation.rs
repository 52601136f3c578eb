//! Per-operation configuration

use cmdletgen_common::{ConfigError, Result, XmlElement};
use serde::Serialize;

use crate::params::{parse_flag, AutoIterate, ParamCustomization};

/// How the generated cmdlet treats unauthenticated calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AnonymousAuthMode {
    #[default]
    Never,
    Optional,
    Always,
}

impl AnonymousAuthMode {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "Never" => Ok(AnonymousAuthMode::Never),
            "Optional" => Ok(AnonymousAuthMode::Optional),
            "Always" => Ok(AnonymousAuthMode::Always),
            other => Err(ConfigError::Malformed(format!(
                "unknown AnonymousAuthentication mode '{other}'"
            ))),
        }
    }
}

/// Configuration for one SDK operation.
///
/// The method name is the immutable key tying the entry to an SDK method.
/// The `selected_*`, `processed`, and `is_auto_configuring` fields are
/// populated at generation time and never appear in the on-disk schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationConfig {
    pub method_name: String,
    pub verb: Option<String>,
    pub noun: Option<String>,
    pub exclude: bool,
    pub anonymous_auth: AnonymousAuthMode,
    pub pipeline_parameter: Option<String>,
    pub params: Vec<ParamCustomization>,
    pub auto_iterate: Option<AutoIterate>,

    /// Final verb chosen by the name-conflict resolver.
    pub selected_verb: Option<String>,
    /// Final noun chosen by the name-conflict resolver.
    pub selected_noun: Option<String>,
    /// Whether a live SDK method was matched against this entry.
    pub processed: bool,
    /// True when the generator synthesized this entry without any
    /// human-authored configuration behind it.
    pub is_auto_configuring: bool,
    pub analysis_errors: Vec<String>,
    pub info_messages: Vec<String>,
}

impl OperationConfig {
    /// Create a bare entry for a method the generator discovered itself.
    pub fn auto_configured(method_name: impl Into<String>) -> Self {
        OperationConfig {
            is_auto_configuring: true,
            ..OperationConfig::named(method_name)
        }
    }

    fn named(method_name: impl Into<String>) -> Self {
        OperationConfig {
            method_name: method_name.into(),
            verb: None,
            noun: None,
            exclude: false,
            anonymous_auth: AnonymousAuthMode::default(),
            pipeline_parameter: None,
            params: Vec::new(),
            auto_iterate: None,
            selected_verb: None,
            selected_noun: None,
            processed: false,
            is_auto_configuring: false,
            analysis_errors: Vec::new(),
            info_messages: Vec::new(),
        }
    }

    /// Build from a `<ServiceOperation>` element.
    pub fn from_xml(element: &XmlElement) -> Result<Self> {
        let method_name = element
            .attr("MethodName")
            .ok_or_else(|| {
                ConfigError::Malformed("<ServiceOperation> is missing MethodName".to_string())
            })?
            .to_string();

        let anonymous_auth = match element.attr("AnonymousAuthentication") {
            Some(value) => AnonymousAuthMode::parse(value)?,
            None => AnonymousAuthMode::default(),
        };

        let params = match element.child("Params") {
            Some(list) => list
                .elements_named("Param")
                .map(ParamCustomization::from_xml)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let auto_iterate = element
            .child("AutoIterate")
            .map(AutoIterate::from_xml)
            .transpose()?;

        Ok(OperationConfig {
            verb: element.attr("Verb").map(str::to_string),
            noun: element.attr("Noun").map(str::to_string),
            exclude: parse_flag(element.attr("Exclude"))?,
            anonymous_auth,
            pipeline_parameter: element.attr("PipelineParameter").map(str::to_string),
            params,
            auto_iterate,
            ..OperationConfig::named(method_name)
        })
    }

    /// Record an analysis error against this operation.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.analysis_errors.push(message.into());
    }

    /// Record an informational analysis message.
    pub fn record_info(&mut self, message: impl Into<String>) {
        self.info_messages.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.analysis_errors.is_empty()
    }
}
