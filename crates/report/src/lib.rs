//! Report writer
//!
//! Produces `report.xml`: the subset of configuration a human reviewer
//! needs to look at after a generator run. That subset is the newly
//! auto-configured operations, the operations with analysis errors, and
//! everything an override touched; the unchanged bulk is suppressed or
//! commented out. The report is itself a valid overrides-shaped document, so a
//! reviewer can edit it and resubmit it as the next override batch.

mod builder;

pub use builder::ReportBuilder;

use std::fs;
use std::path::{Path, PathBuf};

use cmdletgen_common::{ConfigError, OperationAnalyzer, Result, XmlElement};
use cmdletgen_config::ServiceConfig;
use cmdletgen_merge::OverrideDocument;

/// Name of the generated report file.
pub const REPORT_FILE: &str = "report.xml";

/// Existence-only flag telling downstream tooling that manual approval
/// is required.
pub const BUILD_ERRORS_FLAG: &str = "buildConfigErrors";

/// Schema location stamped on the report root so reviewers can edit and
/// resubmit it as an overrides document.
pub const OVERRIDES_SCHEMA_LOCATION: &str =
    "https://cmdletgen.github.io/schemas/ConfigurationOverrides/overrides.xsd";

/// A service configuration together with its on-disk XML tree.
///
/// The tree is kept alongside the typed model because the report
/// preserves original element content (as comments) that the typed
/// model does not round-trip.
#[derive(Debug, Clone)]
pub struct ReportModel {
    pub config: ServiceConfig,
    pub tree: XmlElement,
}

impl ReportModel {
    /// Load a service config file into a report model.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::load(path, e))?;
        let tree = XmlElement::parse(&content).map_err(|e| ConfigError::load(path, e))?;
        let config = ServiceConfig::from_xml(&tree).map_err(|e| ConfigError::load(path, e))?;
        Ok(ReportModel { config, tree })
    }
}

/// Output settings for a report run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub output_dir: PathBuf,
    /// In report-only mode the report file is written only when there
    /// are new auto-configured operations and zero errors.
    pub report_only: bool,
}

/// What a report run produced.
#[derive(Debug, Clone, Default)]
pub struct ReportOutcome {
    pub included_services: usize,
    pub new_operations: usize,
    pub has_errors: bool,
    pub report_written: bool,
}

/// Build the report and write it, plus any flag files, to disk.
///
/// `models` is mutable because a version mismatch between an override
/// and a model discovered at report time is raised as an analysis error
/// on that model, so the reviewer sees it.
pub fn write_report(
    models: &mut [ReportModel],
    overrides: &OverrideDocument,
    analyzer: &dyn OperationAnalyzer,
    options: &ReportOptions,
) -> Result<ReportOutcome> {
    let builder = ReportBuilder::new(overrides, analyzer);
    let report = builder.build(models);

    let included_services = report.elements_named("Service").count();
    let has_errors = models.iter().any(|model| model.config.has_errors());
    let new_operations = models
        .iter()
        .map(|model| {
            model
                .config
                .operations
                .iter()
                .filter(|op| op.is_auto_configuring)
                .count()
        })
        .sum();

    if has_errors {
        let flag_path = options.output_dir.join(BUILD_ERRORS_FLAG);
        fs::write(&flag_path, "").map_err(|e| ConfigError::write(flag_path, e))?;
    }

    let report_written = if options.report_only {
        new_operations > 0 && !has_errors
    } else {
        true
    };

    if report_written {
        let report_path = options.output_dir.join(REPORT_FILE);
        let document = report
            .to_document()
            .map_err(|e| ConfigError::write(&report_path, e))?;
        fs::write(&report_path, document).map_err(|e| ConfigError::write(&report_path, e))?;
    }

    Ok(ReportOutcome {
        included_services,
        new_operations,
        has_errors,
        report_written,
    })
}
