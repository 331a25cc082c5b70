use log::{info, warn};
use std::time::Duration;

use super::extraction::ParameterSource;
use super::retry::RetryPolicy;
use super::snapshot::{build_snapshot, NarrativeService};
use crate::capital_budgeting::appraisal::{appraise_project, AppraisalInput, ProjectAppraisal};
use crate::capital_budgeting::schedule::ProjectParameters;
use crate::error::AppraisalError;
use crate::time_value::BisectionConfig;
use crate::types::ComputationOutput;
use crate::AppraisalResult;

/// Caller-owned state of one appraisal workflow.
///
/// Each parameter update recomputes the appraisal from scratch. A failed
/// update or collaborator call is recorded in `last_error` and leaves the
/// previous parameters, appraisal and narrative untouched, so the caller can
/// retry without re-entering data.
#[derive(Debug, Clone, Default)]
pub struct AppraisalSession {
    solver: BisectionConfig,
    parameters: Option<ProjectParameters>,
    appraisal: Option<ComputationOutput<ProjectAppraisal>>,
    narrative: Option<String>,
    last_error: Option<String>,
}

impl AppraisalSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(solver: BisectionConfig) -> Self {
        Self {
            solver,
            ..Self::default()
        }
    }

    pub fn parameters(&self) -> Option<&ProjectParameters> {
        self.parameters.as_ref()
    }

    pub fn appraisal(&self) -> Option<&ComputationOutput<ProjectAppraisal>> {
        self.appraisal.as_ref()
    }

    pub fn narrative(&self) -> Option<&str> {
        self.narrative.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace the parameters and recompute the appraisal.
    pub fn update_parameters(
        &mut self,
        parameters: ProjectParameters,
    ) -> AppraisalResult<&ComputationOutput<ProjectAppraisal>> {
        let input = AppraisalInput {
            parameters,
            solver: self.solver.clone(),
        };
        let output = match appraise_project(&input) {
            Ok(output) => output,
            Err(e) => return Err(self.record_failure(e)),
        };

        self.parameters = Some(input.parameters);
        self.narrative = None;
        self.last_error = None;
        Ok(self.appraisal.insert(output))
    }

    /// Pull parameters from the extraction service and recompute.
    pub fn refresh_from_source<S, Z>(
        &mut self,
        source: &mut S,
        policy: &RetryPolicy,
        sleep: Z,
    ) -> AppraisalResult<&ComputationOutput<ProjectAppraisal>>
    where
        S: ParameterSource,
        Z: FnMut(Duration),
    {
        let extracted = match policy.run(|_| source.extract(), sleep) {
            Ok(extracted) => extracted,
            Err(e) => return Err(self.record_failure(e)),
        };

        let missing = extracted.missing_fields();
        if !missing.is_empty() {
            info!("extraction left fields unset, using defaults: {}", missing.join(", "));
        }

        match extracted.into_parameters() {
            Ok(parameters) => self.update_parameters(parameters),
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// Ask the narrative service to evaluate the current appraisal.
    pub fn request_narrative<N, Z>(
        &mut self,
        service: &mut N,
        policy: &RetryPolicy,
        sleep: Z,
    ) -> AppraisalResult<&str>
    where
        N: NarrativeService,
        Z: FnMut(Duration),
    {
        let snapshot = match (&self.parameters, &self.appraisal) {
            (Some(parameters), Some(appraisal)) => Some(build_snapshot(parameters, &appraisal.result)),
            _ => None,
        };
        let Some(snapshot) = snapshot else {
            return Err(self.record_failure(AppraisalError::InvalidInput {
                field: "session".into(),
                reason: "No appraisal available; supply parameters first".into(),
            }));
        };

        let text = match policy.run(|_| service.evaluate(&snapshot), sleep) {
            Ok(text) => text,
            Err(e) => return Err(self.record_failure(e)),
        };

        self.last_error = None;
        Ok(self.narrative.insert(text).as_str())
    }

    fn record_failure(&mut self, error: AppraisalError) -> AppraisalError {
        warn!("appraisal session error: {error}");
        self.last_error = Some(error.to_string());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::extraction::ExtractedParameters;
    use crate::reporting::snapshot::EvaluationSnapshot;
    use rust_decimal_macros::dec;

    fn params() -> ProjectParameters {
        ProjectParameters {
            initial_investment: dec!(-1_000_000),
            project_life_years: 5,
            annual_revenue: dec!(800_000),
            annual_cost: dec!(500_000),
            wacc: dec!(0.10),
            tax_rate: dec!(0.20),
        }
    }

    fn no_wait() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_backoff_ms: 0,
            backoff_multiplier: 2,
        }
    }

    struct FlakySource {
        failures_left: u32,
        record: ExtractedParameters,
    }

    impl ParameterSource for FlakySource {
        type Error = String;

        fn extract(&mut self) -> Result<ExtractedParameters, String> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err("503 service unavailable".into());
            }
            Ok(self.record.clone())
        }
    }

    struct EchoNarrator {
        calls: u32,
    }

    impl NarrativeService for EchoNarrator {
        type Error = String;

        fn evaluate(&mut self, snapshot: &EvaluationSnapshot) -> Result<String, String> {
            self.calls += 1;
            Ok(format!("NPV {}", snapshot.indicators[0].value))
        }
    }

    #[test]
    fn test_update_computes_appraisal() {
        let mut session = AppraisalSession::new();
        let npv = session.update_parameters(params()).unwrap().result.metrics.npv;
        assert!((npv - dec!(-90_211.18)).abs() < dec!(0.01));
        assert_eq!(session.parameters(), Some(&params()));
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_failed_update_keeps_previous_state() {
        let mut session = AppraisalSession::new();
        session.update_parameters(params()).unwrap();

        let mut bad = params();
        bad.project_life_years = 0;
        assert!(session.update_parameters(bad).is_err());

        assert_eq!(session.parameters(), Some(&params()));
        assert!(session.appraisal().is_some());
        assert!(session.last_error().unwrap().contains("project_life_years"));
    }

    #[test]
    fn test_refresh_retries_transient_failures() {
        let mut session = AppraisalSession::new();
        let mut source = FlakySource {
            failures_left: 2,
            record: ExtractedParameters::from(&params()),
        };
        session
            .refresh_from_source(&mut source, &no_wait(), |_| {})
            .unwrap();
        assert_eq!(session.parameters(), Some(&params()));
    }

    #[test]
    fn test_refresh_failure_is_recoverable() {
        let mut session = AppraisalSession::new();
        session.update_parameters(params()).unwrap();

        let mut source = FlakySource {
            failures_left: 10,
            record: ExtractedParameters::default(),
        };
        let result = session.refresh_from_source(&mut source, &no_wait(), |_| {});
        assert!(matches!(result, Err(AppraisalError::RetryExhausted { .. })));
        assert_eq!(session.parameters(), Some(&params()));
        assert!(session.last_error().unwrap().contains("503"));
    }

    #[test]
    fn test_narrative_requires_appraisal() {
        let mut session = AppraisalSession::new();
        let mut narrator = EchoNarrator { calls: 0 };
        assert!(session
            .request_narrative(&mut narrator, &no_wait(), |_| {})
            .is_err());
        assert_eq!(narrator.calls, 0);
    }

    #[test]
    fn test_narrative_is_cleared_on_new_parameters() {
        let mut session = AppraisalSession::new();
        session.update_parameters(params()).unwrap();
        let mut narrator = EchoNarrator { calls: 0 };
        let text = session
            .request_narrative(&mut narrator, &no_wait(), |_| {})
            .unwrap()
            .to_string();
        assert_eq!(text, "NPV -90211.18");
        assert_eq!(session.narrative(), Some("NPV -90211.18"));

        let mut updated = params();
        updated.annual_revenue = dec!(900_000);
        session.update_parameters(updated).unwrap();
        assert!(session.narrative().is_none());
    }
}
