//! Parameter customizations and pagination settings

use cmdletgen_common::{ConfigError, Result, XmlElement};
use serde::Serialize;

/// Alias applied to every service's pagination start token.
pub const NEXT_TOKEN_ALIAS: &str = "NextToken";

/// Alias applied to every service's page size field.
pub const MAX_ITEMS_ALIAS: &str = "MaxItems";

/// A single parameter customization entry.
///
/// A `name` ending in `_` is a prefix wildcard: the entry applies to every
/// parameter starting with that prefix. This is how a whole family of
/// flattened sub-parameters is suppressed with one rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ParamCustomization {
    pub name: String,
    pub new_name: Option<String>,
    pub alias: Option<String>,
    pub exclude: bool,
    pub default_value: Option<String>,
    pub exclusive_group: Option<String>,
}

impl ParamCustomization {
    /// Build from a `<Param>` element.
    pub fn from_xml(element: &XmlElement) -> Result<Self> {
        let name = element
            .attr("Name")
            .ok_or_else(|| ConfigError::Malformed("<Param> is missing Name".to_string()))?
            .to_string();
        Ok(ParamCustomization {
            name,
            new_name: element.attr("NewName").map(str::to_string),
            alias: element.attr("Alias").map(str::to_string),
            exclude: parse_flag(element.attr("Exclude"))?,
            default_value: element.attr("DefaultValue").map(str::to_string),
            exclusive_group: element.attr("ExclusiveGroup").map(str::to_string),
        })
    }
}

/// Whether a parameter should be suppressed from generation.
///
/// A parameter is excluded when a customization entry either matches its
/// name exactly (case-sensitive) with `exclude` set, or is a trailing-`_`
/// prefix wildcard with `exclude` set that the name starts with.
pub fn should_exclude_parameter(name: &str, customizations: &[ParamCustomization]) -> bool {
    customizations.iter().any(|custom| {
        if !custom.exclude {
            return false;
        }
        if custom.name.ends_with('_') {
            name.starts_with(custom.name.as_str())
        } else {
            custom.name == name
        }
    })
}

/// Pagination settings: which request fields carry the start token, the
/// response continuation token, and the page size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoIterate {
    pub start: String,
    pub next: String,
    pub emit_limit: Option<String>,
}

impl AutoIterate {
    /// Build from an `<AutoIterate>` element.
    pub fn from_xml(element: &XmlElement) -> Result<Self> {
        let start = element
            .attr("Start")
            .ok_or_else(|| ConfigError::Malformed("<AutoIterate> is missing Start".to_string()))?
            .to_string();
        let next = element
            .attr("Next")
            .ok_or_else(|| ConfigError::Malformed("<AutoIterate> is missing Next".to_string()))?
            .to_string();
        Ok(AutoIterate {
            start,
            next,
            emit_limit: element.attr("EmitLimit").map(str::to_string),
        })
    }

    /// Cross-service aliases for the pagination fields.
    ///
    /// The start token is aliased to `NextToken` and the page size field
    /// to `MaxItems`, unless the field already carries that name. Users
    /// get a consistent pagination surface across inconsistent APIs.
    pub fn iteration_aliases(&self) -> Vec<(String, String)> {
        let mut aliases = Vec::new();
        if self.start != NEXT_TOKEN_ALIAS {
            aliases.push((self.start.clone(), NEXT_TOKEN_ALIAS.to_string()));
        }
        if let Some(limit) = &self.emit_limit {
            if limit != MAX_ITEMS_ALIAS {
                aliases.push((limit.clone(), MAX_ITEMS_ALIAS.to_string()));
            }
        }
        aliases
    }
}

/// Parse an optional boolean attribute; absent means `false`.
pub(crate) fn parse_flag(value: Option<&str>) -> Result<bool> {
    match value {
        None => Ok(false),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(ConfigError::Malformed(format!(
            "expected boolean attribute, found '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclusion(name: &str) -> ParamCustomization {
        ParamCustomization {
            name: name.to_string(),
            exclude: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_exclusion_is_case_sensitive() {
        let customizations = vec![exclusion("Marker")];
        assert!(should_exclude_parameter("Marker", &customizations));
        assert!(!should_exclude_parameter("marker", &customizations));
    }

    #[test]
    fn test_prefix_wildcard_exclusion() {
        let customizations = vec![exclusion("Destination_")];
        assert!(should_exclude_parameter(
            "Destination_BucketArn",
            &customizations
        ));
        assert!(should_exclude_parameter("Destination_", &customizations));
        assert!(!should_exclude_parameter("Destination", &customizations));
        assert!(!should_exclude_parameter("Source_BucketArn", &customizations));
    }

    #[test]
    fn test_non_excluding_entry_never_matches() {
        let customizations = vec![ParamCustomization {
            name: "Marker".to_string(),
            new_name: Some("StartToken".to_string()),
            ..Default::default()
        }];
        assert!(!should_exclude_parameter("Marker", &customizations));
    }

    #[test]
    fn test_iteration_aliases() {
        let iterate = AutoIterate {
            start: "Marker".to_string(),
            next: "NextMarker".to_string(),
            emit_limit: Some("MaxKeys".to_string()),
        };
        assert_eq!(
            iterate.iteration_aliases(),
            vec![
                ("Marker".to_string(), "NextToken".to_string()),
                ("MaxKeys".to_string(), "MaxItems".to_string()),
            ]
        );
    }

    #[test]
    fn test_iteration_aliases_skip_already_conventional_names() {
        let iterate = AutoIterate {
            start: "NextToken".to_string(),
            next: "NextToken".to_string(),
            emit_limit: Some("MaxItems".to_string()),
        };
        assert!(iterate.iteration_aliases().is_empty());
    }

    #[test]
    fn test_param_from_xml() {
        let element = cmdletgen_common::XmlElement::parse(
            r#"<Param Name="Bucket" NewName="BucketName" Exclude="false" />"#,
        )
        .unwrap();
        let param = ParamCustomization::from_xml(&element).unwrap();
        assert_eq!(param.name, "Bucket");
        assert_eq!(param.new_name.as_deref(), Some("BucketName"));
        assert!(!param.exclude);
    }

    #[test]
    fn test_bad_flag_is_rejected() {
        let element =
            cmdletgen_common::XmlElement::parse(r#"<Param Name="Bucket" Exclude="yes" />"#).unwrap();
        assert!(ParamCustomization::from_xml(&element).is_err());
    }
}
