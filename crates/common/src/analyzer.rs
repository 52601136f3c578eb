//! Interface to the SDK operation analyzer
//!
//! The generator's analysis phase inspects the live SDK for method
//! signatures. The report writer only consumes its results, so the
//! analyzer is injected behind this trait and faked in tests.

use serde::{Deserialize, Serialize};

/// A single analyzed cmdlet parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedParameter {
    /// Emitted parameter name.
    pub name: String,
    /// Resolved alias, if any customization or pagination rule assigned one.
    pub alias: Option<String>,
    /// Whether the underlying SDK field is required.
    pub required: bool,
}

/// The shape of an operation's return type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedType {
    /// Type name as reported by the SDK.
    pub name: String,
    /// Property name/type pairs, in declaration order.
    pub properties: Vec<(String, String)>,
}

/// Analysis results for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationAnalysis {
    pub parameters: Vec<AnalyzedParameter>,
    pub return_type: Option<AnalyzedType>,
}

/// Source of per-operation analysis results, keyed by SDK method name.
pub trait OperationAnalyzer {
    /// Analysis for the given method, or `None` if the method was never
    /// matched against the live SDK.
    fn analysis_for(&self, method_name: &str) -> Option<OperationAnalysis>;
}

/// Analyzer that knows nothing; used when no SDK is in scope.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalyzer;

impl OperationAnalyzer for NullAnalyzer {
    fn analysis_for(&self, _method_name: &str) -> Option<OperationAnalysis> {
        None
    }
}
