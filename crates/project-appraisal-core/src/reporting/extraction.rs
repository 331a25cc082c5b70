use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::capital_budgeting::schedule::{validate_parameters, ProjectParameters};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::AppraisalResult;

/// Parameter record as returned by the extraction service.
///
/// Every field may be missing. Both snake_case and camelCase keys are
/// accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedParameters {
    #[serde(alias = "initialInvestment")]
    pub initial_investment: Option<Money>,
    #[serde(alias = "projectLifeYears", alias = "projectLife")]
    pub project_life_years: Option<u32>,
    #[serde(alias = "annualRevenue")]
    pub annual_revenue: Option<Money>,
    #[serde(alias = "annualCost")]
    pub annual_cost: Option<Money>,
    pub wacc: Option<Rate>,
    #[serde(alias = "taxRate")]
    pub tax_rate: Option<Rate>,
}

impl ExtractedParameters {
    /// Names of the fields the service did not supply.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.initial_investment.is_none() {
            missing.push("initial_investment");
        }
        if self.project_life_years.is_none() {
            missing.push("project_life_years");
        }
        if self.annual_revenue.is_none() {
            missing.push("annual_revenue");
        }
        if self.annual_cost.is_none() {
            missing.push("annual_cost");
        }
        if self.wacc.is_none() {
            missing.push("wacc");
        }
        if self.tax_rate.is_none() {
            missing.push("tax_rate");
        }
        missing
    }

    /// Fill gaps with zero (and a one-year life) and validate the result.
    pub fn into_parameters(self) -> AppraisalResult<ProjectParameters> {
        let params = ProjectParameters {
            initial_investment: self.initial_investment.unwrap_or(Decimal::ZERO),
            project_life_years: self.project_life_years.unwrap_or(1).max(1),
            annual_revenue: self.annual_revenue.unwrap_or(Decimal::ZERO),
            annual_cost: self.annual_cost.unwrap_or(Decimal::ZERO),
            wacc: self.wacc.unwrap_or(Decimal::ZERO),
            tax_rate: self.tax_rate.unwrap_or(Decimal::ZERO),
        };
        validate_parameters(&params)?;
        Ok(params)
    }
}

impl From<&ProjectParameters> for ExtractedParameters {
    fn from(params: &ProjectParameters) -> Self {
        Self {
            initial_investment: Some(params.initial_investment),
            project_life_years: Some(params.project_life_years),
            annual_revenue: Some(params.annual_revenue),
            annual_cost: Some(params.annual_cost),
            wacc: Some(params.wacc),
            tax_rate: Some(params.tax_rate),
        }
    }
}

/// Validated parameters plus the fields that had to be defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedParameters {
    pub parameters: ProjectParameters,
    pub defaulted_fields: Vec<String>,
}

/// Turn an extraction record into validated parameters, reporting every
/// defaulted field as a warning.
pub fn normalize_extracted(
    extracted: &ExtractedParameters,
) -> AppraisalResult<ComputationOutput<NormalizedParameters>> {
    let start = Instant::now();

    let defaulted_fields: Vec<String> = extracted
        .missing_fields()
        .into_iter()
        .map(String::from)
        .collect();
    let warnings = defaulted_fields
        .iter()
        .map(|field| {
            if field == "project_life_years" {
                format!("{field} not supplied; defaulted to 1")
            } else {
                format!("{field} not supplied; defaulted to 0")
            }
        })
        .collect();

    let parameters = extracted.clone().into_parameters()?;

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Extraction record normalisation (missing values default to zero)",
        extracted,
        warnings,
        elapsed,
        NormalizedParameters {
            parameters,
            defaulted_fields,
        },
    ))
}

/// A service that turns a business-plan document into parameters.
pub trait ParameterSource {
    type Error: fmt::Display;

    fn extract(&mut self) -> Result<ExtractedParameters, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppraisalError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_camel_case_keys_and_numbers() {
        let json = r#"{
            "initialInvestment": -1000000,
            "projectLifeYears": 5,
            "annualRevenue": 800000,
            "annualCost": 500000,
            "wacc": 0.1,
            "taxRate": 0.2
        }"#;
        let extracted: ExtractedParameters = serde_json::from_str(json).unwrap();
        assert!(extracted.missing_fields().is_empty());
        let params = extracted.into_parameters().unwrap();
        assert_eq!(params.initial_investment, dec!(-1000000));
        assert_eq!(params.project_life_years, 5);
        assert_eq!(params.tax_rate, dec!(0.2));
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let extracted: ExtractedParameters =
            serde_json::from_str(r#"{"annual_revenue": "1200"}"#).unwrap();
        assert_eq!(
            extracted.missing_fields(),
            vec![
                "initial_investment",
                "project_life_years",
                "annual_cost",
                "wacc",
                "tax_rate"
            ]
        );
        let params = extracted.into_parameters().unwrap();
        assert_eq!(params.project_life_years, 1);
        assert_eq!(params.annual_revenue, dec!(1200));
        assert_eq!(params.wacc, Decimal::ZERO);
    }

    #[test]
    fn test_normalize_reports_defaulted_fields() {
        let extracted = ExtractedParameters {
            initial_investment: Some(dec!(-500)),
            annual_revenue: Some(dec!(300)),
            annual_cost: Some(dec!(100)),
            wacc: Some(dec!(0.08)),
            ..ExtractedParameters::default()
        };
        let output = normalize_extracted(&extracted).unwrap();
        assert_eq!(
            output.result.defaulted_fields,
            vec!["project_life_years".to_string(), "tax_rate".to_string()]
        );
        assert_eq!(output.warnings.len(), 2);
        assert!(output.warnings[0].contains("defaulted to 1"));
        assert_eq!(output.result.parameters.tax_rate, Decimal::ZERO);
    }

    #[test]
    fn test_out_of_range_tax_rate_is_rejected() {
        let extracted = ExtractedParameters {
            tax_rate: Some(dec!(20)),
            ..ExtractedParameters::default()
        };
        match extracted.into_parameters() {
            Err(AppraisalError::InvalidInput { field, .. }) => assert_eq!(field, "tax_rate"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
