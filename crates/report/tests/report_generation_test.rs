//! Integration test for report generation against on-disk configs

use std::fs;

use cmdletgen_common::{AnalyzedParameter, OperationAnalysis, OperationAnalyzer, XmlElement};
use cmdletgen_merge::OverrideDocument;
use cmdletgen_report::{write_report, ReportModel, ReportOptions, BUILD_ERRORS_FLAG, REPORT_FILE};
use mockall::mock;
use tempfile::TempDir;

mock! {
    Analyzer {}

    impl OperationAnalyzer for Analyzer {
        fn analysis_for(&self, method_name: &str) -> Option<OperationAnalysis>;
    }
}

const FOO_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Service>
    <C2jFilename>FooService</C2jFilename>
    <ServiceName>Foo</ServiceName>
    <FileVersion>2</FileVersion>
    <ServiceOperations>
        <ServiceOperation MethodName="ListFoos" Verb="Get" Noun="FooList" />
    </ServiceOperations>
</Service>"#;

#[test]
fn test_report_round_trips_as_overrides_document() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("FooService.xml");
    fs::write(&config_path, FOO_CONFIG).unwrap();

    let overrides = OverrideDocument::parse(
        r#"<Overrides>
               <Service>
                   <C2jFilename>FooService</C2jFilename>
                   <FileVersion>2</FileVersion>
                   <ServiceOperations>
                       <ServiceOperation MethodName="ListFoos" Verb="Find" />
                   </ServiceOperations>
               </Service>
           </Overrides>"#,
    )
    .unwrap();

    let mut analyzer = MockAnalyzer::new();
    analyzer
        .expect_analysis_for()
        .withf(|method| method == "ListFoos")
        .returning(|_| {
            Some(OperationAnalysis {
                parameters: vec![AnalyzedParameter {
                    name: "FooName".to_string(),
                    alias: None,
                    required: true,
                }],
                return_type: None,
            })
        });

    let mut models = vec![ReportModel::load(&config_path).unwrap()];
    let options = ReportOptions {
        output_dir: temp.path().to_path_buf(),
        report_only: false,
    };

    let outcome = write_report(&mut models, &overrides, &analyzer, &options).unwrap();
    assert_eq!(outcome.included_services, 1);
    assert!(!outcome.has_errors);
    assert!(outcome.report_written);
    assert!(!temp.path().join(BUILD_ERRORS_FLAG).exists());

    // The emitted report must itself parse as an overrides document, so
    // a reviewer can edit and resubmit it.
    let report_text = fs::read_to_string(temp.path().join(REPORT_FILE)).unwrap();
    let report = XmlElement::parse(&report_text).unwrap();
    assert_eq!(report.name, "Overrides");

    let reparsed = OverrideDocument::parse(&report_text).unwrap();
    let service = reparsed.get("FooService").unwrap();
    assert_eq!(service.file_version(), 2);
    assert!(service.touches_operation("ListFoos"));

    assert!(report_text.contains("parameter FooName"));
    assert!(report_text.contains("required"));
}

#[test]
fn test_stale_override_surfaces_in_report_and_flags_errors() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("FooService.xml");
    fs::write(&config_path, FOO_CONFIG).unwrap();

    let overrides = OverrideDocument::parse(
        r#"<Overrides>
               <Service>
                   <C2jFilename>FooService</C2jFilename>
                   <FileVersion>3</FileVersion>
               </Service>
           </Overrides>"#,
    )
    .unwrap();

    let mut analyzer = MockAnalyzer::new();
    analyzer.expect_analysis_for().returning(|_| None);

    let mut models = vec![ReportModel::load(&config_path).unwrap()];
    let options = ReportOptions {
        output_dir: temp.path().to_path_buf(),
        report_only: false,
    };

    let outcome = write_report(&mut models, &overrides, &analyzer, &options).unwrap();
    assert!(outcome.has_errors);
    assert!(temp.path().join(BUILD_ERRORS_FLAG).exists());

    let report_text = fs::read_to_string(temp.path().join(REPORT_FILE)).unwrap();
    assert!(report_text.contains("FileVersion 3"));
    assert!(report_text.contains("not applied"));
}
