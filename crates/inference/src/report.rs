//! Combined experiment report and its plain-text rendering.

#![allow(clippy::format_push_string)]

use abtest_core::{DegenerateResult, EngineConfig, Result, TestConfiguration, TestData};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bayesian::{BayesianAnalyzer, BayesianResults};
use crate::frequentist::{FrequentistAnalyzer, StatisticalResults};
use crate::roi::{PaybackPeriod, RoiAnalysis, RoiEvaluator};
use crate::sample_size::{SamplePlan, SampleSizePlanner};
use crate::srm::{check_sample_ratio, SrmCheck, SrmSeverity};

/// Every engine output for one experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// When the report was built.
    pub generated_at: DateTime<Utc>,
    /// Design the plan and analyses ran against.
    pub design: TestConfiguration,
    /// Observed counts, if any were supplied.
    pub data: Option<TestData>,
    /// Sample size plan for the design.
    pub plan: SamplePlan,
    /// Analyses of the observed counts; `None` without data.
    pub analysis: Option<ObservedAnalysis>,
}

/// Outputs that require observed counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedAnalysis {
    /// Two-proportion z-test at the design's alpha and power.
    pub frequentist: StatisticalResults,
    /// Posterior comparison using the engine's simulation settings.
    pub bayesian: BayesianResults,
    /// Financial outcome of the observed lift.
    pub roi: RoiAnalysis,
    /// Observed split against the design's traffic split.
    pub sample_ratio: SrmCheck,
}

impl ExperimentReport {
    /// Runs every applicable component.
    ///
    /// The design's alpha and power drive the frequentist analysis; the engine
    /// configuration supplies simulation and ROI options.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any component.
    pub fn build(
        design: &TestConfiguration,
        data: Option<&TestData>,
        engine: &EngineConfig,
    ) -> Result<Self> {
        let plan = SampleSizePlanner::plan(design)?;

        let analysis = match data {
            Some(data) => {
                let mut frequentist_settings = engine.frequentist.clone();
                frequentist_settings.alpha = design.alpha;
                frequentist_settings.power = design.power;

                let frequentist = FrequentistAnalyzer::new(frequentist_settings).analyze(data)?;
                let bayesian = BayesianAnalyzer::new(engine.bayesian.clone()).analyze(data)?;
                let roi = RoiEvaluator::new(engine.roi.clone()).evaluate(data, design, &frequentist)?;
                let sample_ratio = check_sample_ratio(data, design.traffic_split)?;
                Some(ObservedAnalysis {
                    frequentist,
                    bayesian,
                    roi,
                    sample_ratio,
                })
            }
            None => None,
        };

        Ok(Self {
            generated_at: Utc::now(),
            design: design.clone(),
            data: data.copied(),
            plan,
            analysis,
        })
    }
}

const RULE_HEAVY: &str = "═══════════════════════════════════════════════════════════════\n";
const RULE_LIGHT: &str = "───────────────────────────────────────────────────────────────\n";

/// Plain-text rendering of reports and their sections.
///
/// Rates are shown as percentages with 4 decimals and p-values with 6.
pub struct ReportFormatter;

impl ReportFormatter {
    /// Renders the whole report between banner rules.
    #[must_use]
    pub fn format(report: &ExperimentReport) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE_HEAVY);
        output.push_str("                    EXPERIMENT REPORT                          \n");
        output.push_str(RULE_HEAVY);
        output.push_str(&format!(
            "Generated:             {}\n",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if !report.design.test_type.is_empty() || !report.design.industry.is_empty() {
            output.push_str(&format!(
                "Test:                  {} ({})\n",
                report.design.test_type, report.design.industry
            ));
        }
        output.push('\n');

        output.push_str(&Self::format_plan(&report.plan));

        if let Some(analysis) = &report.analysis {
            output.push_str(&Self::format_frequentist(&analysis.frequentist));
            output.push_str(&Self::format_bayesian(&analysis.bayesian));
            output.push_str(&Self::format_roi(&analysis.roi));
            output.push_str(&Self::format_sample_ratio(&analysis.sample_ratio));
        } else {
            output.push_str("No observed data; analysis skipped.\n\n");
        }

        output.push_str(RULE_HEAVY);
        output
    }

    /// Renders the sample size plan.
    #[must_use]
    pub fn format_plan(plan: &SamplePlan) -> String {
        let mut output = String::new();
        output.push_str("Sample Size Plan\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!(
            "Baseline Rate:         {:.4}%\n",
            plan.baseline_proportion * 100.0
        ));
        output.push_str(&format!(
            "Target Rate:           {:.4}%\n",
            plan.target_proportion * 100.0
        ));
        output.push_str(&format!("Per Arm:               {}\n", plan.per_arm));
        output.push_str(&format!("Total:                 {}\n", plan.total));
        match plan.estimated_days {
            Some(days) => output.push_str(&format!("Estimated Duration:    {days} days\n")),
            None => output.push_str("Estimated Duration:    n/a (no traffic)\n"),
        }
        output.push('\n');
        output
    }

    /// Renders the z-test results, including any degenerate-result notes.
    #[must_use]
    pub fn format_frequentist(results: &StatisticalResults) -> String {
        let mut output = String::new();
        output.push_str("Frequentist Analysis\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!(
            "Control Rate:          {:.4}%\n",
            results.control_rate * 100.0
        ));
        output.push_str(&format!(
            "Treatment Rate:        {:.4}%\n",
            results.treatment_rate * 100.0
        ));
        output.push_str(&format!("Lift:                  {:+.2}%\n", results.lift));
        output.push_str(&format!("Z-Score:               {:.4}\n", results.z_score));
        output.push_str(&format!("P-Value:               {:.6}\n", results.p_value));
        output.push_str(&format!(
            "{:.0}% CI (lift):         [{:+.2}%, {:+.2}%]\n",
            results.confidence_level * 100.0,
            results.confidence_interval.0,
            results.confidence_interval.1
        ));
        output.push_str(&format!(
            "Effect Size (h):       {:.4} ({:?})\n",
            results.effect_size, results.effect_interpretation
        ));
        if let Some(n) = results.required_sample_size {
            output.push_str(&format!("Required Per Arm:      {n}\n"));
        }
        output.push_str(&format!(
            "Significant:           {} (alpha = {})\n",
            if results.is_significant { "yes" } else { "no" },
            results.alpha
        ));
        Self::push_warnings(&mut output, &results.warnings);
        output.push('\n');
        output
    }

    /// Renders the posterior comparison.
    #[must_use]
    pub fn format_bayesian(results: &BayesianResults) -> String {
        let mut output = String::new();
        output.push_str("Bayesian Analysis\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!(
            "P(Treatment Wins):     {:.4} (± {:.4})\n",
            results.probability_b_wins, results.probability_std_error
        ));
        output.push_str(&format!(
            "Expected Lift:         {:+.2}%\n",
            results.expected_lift
        ));
        output.push_str(&format!(
            "95% Credible Interval: [{:+.2}%, {:+.2}%]\n",
            results.credible_interval.0, results.credible_interval.1
        ));
        output.push_str(&format!(
            "Expected Loss:         treatment {:.4}%, control {:.4}%\n",
            results.expected_loss_treatment, results.expected_loss_control
        ));
        output.push_str(&format!(
            "Posteriors:            A = Beta({}, {}), B = Beta({}, {})\n",
            results.posterior_a.alpha,
            results.posterior_a.beta,
            results.posterior_b.alpha,
            results.posterior_b.beta
        ));
        output.push_str(&format!("Simulations:           {}\n", results.simulations));
        Self::push_warnings(&mut output, &results.warnings);
        output.push('\n');
        output
    }

    /// Renders the ROI evaluation; an unbounded payback prints as "never".
    #[must_use]
    pub fn format_roi(roi: &RoiAnalysis) -> String {
        let mut output = String::new();
        output.push_str("Return on Investment\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!("Total Cost:            ${:.2}\n", roi.total_cost));
        output.push_str(&format!(
            "Additional Revenue:    ${:.2}\n",
            roi.additional_revenue
        ));
        output.push_str(&format!(
            "Net Present Value:     ${:.2}\n",
            roi.net_present_value
        ));
        output.push_str(&format!("ROI:                   {:.2}%\n", roi.roi));
        match roi.payback_period {
            PaybackPeriod::Days(days) => {
                output.push_str(&format!("Payback Period:        {days:.1} days\n"));
            }
            PaybackPeriod::Unbounded => output.push_str("Payback Period:        never\n"),
        }
        output.push_str(&format!(
            "Annualized Revenue:    ${:.2}\n",
            roi.annualized_revenue
        ));
        Self::push_warnings(&mut output, &roi.warnings);
        output.push('\n');
        output
    }

    /// Renders the sample ratio check with its severity.
    #[must_use]
    pub fn format_sample_ratio(check: &SrmCheck) -> String {
        let mut output = String::new();
        output.push_str("Sample Ratio\n");
        output.push_str(RULE_LIGHT);
        output.push_str(&format!(
            "Expected / Observed:   {:.4} / {:.4}\n",
            check.expected_ratio, check.observed_ratio
        ));
        output.push_str(&format!("P-Value:               {:.6}\n", check.p_value));
        let status = match check.severity {
            SrmSeverity::None => "ok",
            SrmSeverity::Warning => "WARNING: mismatch detected",
            SrmSeverity::Critical => "CRITICAL: mismatch detected, results unreliable",
        };
        output.push_str(&format!("Status:                {status}\n"));
        output.push('\n');
        output
    }

    fn push_warnings(output: &mut String, warnings: &[DegenerateResult]) {
        for warning in warnings {
            output.push_str(&format!("Note:                  {}\n", warning.description()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EngineConfig {
        let mut engine = EngineConfig::default();
        engine.bayesian.simulations = 10_000;
        engine.bayesian.interval_simulations = 2_000;
        engine.bayesian.seed = Some(42);
        engine
    }

    #[test]
    fn plan_only_report_skips_analysis() {
        let report = ExperimentReport::build(&TestConfiguration::default(), None, &engine()).unwrap();
        assert!(report.analysis.is_none());
        assert_eq!(report.plan.per_arm, 3841);

        let text = ReportFormatter::format(&report);
        assert!(text.contains("Per Arm:               3841"));
        assert!(text.contains("analysis skipped"));
    }

    #[test]
    fn full_report_includes_every_section() {
        let data = TestData::new(1247, 12500, 1398, 12500);
        let report =
            ExperimentReport::build(&TestConfiguration::default(), Some(&data), &engine()).unwrap();
        let analysis = report.analysis.as_ref().expect("data was supplied");
        assert!(analysis.frequentist.is_significant);
        assert!(analysis.bayesian.probability_b_wins > 0.99);
        assert!(!analysis.sample_ratio.mismatch_detected);

        let text = ReportFormatter::format(&report);
        assert!(text.contains("Control Rate:          9.9760%"));
        assert!(text.contains("Treatment Rate:        11.1840%"));
        assert!(text.contains("Significant:           yes"));
        assert!(text.contains("Bayesian Analysis"));
        assert!(text.contains("Return on Investment"));
        assert!(text.contains("Status:                ok"));
    }

    #[test]
    fn design_alpha_drives_significance() {
        let data = TestData::new(50, 1000, 65, 1000);
        let design = TestConfiguration {
            alpha: 0.2,
            ..Default::default()
        };
        let report = ExperimentReport::build(&design, Some(&data), &engine()).unwrap();
        let analysis = report.analysis.expect("data was supplied");
        assert!((analysis.frequentist.alpha - 0.2).abs() < f64::EPSILON);
        assert!(analysis.frequentist.is_significant);
    }

    #[test]
    fn unbounded_payback_renders_as_never() {
        let data = TestData::new(1398, 12500, 1247, 12500);
        let report =
            ExperimentReport::build(&TestConfiguration::default(), Some(&data), &engine()).unwrap();
        let text = ReportFormatter::format(&report);
        assert!(text.contains("Payback Period:        never"));
        assert!(text.contains("payback unbounded"));
    }

    #[test]
    fn p_value_has_six_decimals() {
        let data = TestData::new(50, 1000, 65, 1000);
        let results = crate::frequentist::analyze_frequentist(&data, 0.05).unwrap();
        let text = ReportFormatter::format_frequentist(&results);
        assert!(text.contains("P-Value:               0.149"), "{text}");
        let line = text.lines().find(|l| l.starts_with("P-Value:")).unwrap();
        let decimals = line.rsplit('.').next().unwrap();
        assert_eq!(decimals.len(), 6);
    }

    #[test]
    fn bayesian_notes_are_rendered() {
        let results = BayesianAnalyzer::new(abtest_core::BayesianSettings {
            simulations: 10_000,
            interval_simulations: 2_000,
            prior_alpha: 0.01,
            prior_beta: 1.0,
            seed: Some(2),
        })
        .analyze(&TestData::new(0, 1000, 5, 1000))
        .unwrap();
        let text = ReportFormatter::format_bayesian(&results);
        assert!(!text.contains("inf"), "{text}");
        if !results.warnings.is_empty() {
            assert!(text.contains("were excluded"));
        }
    }

    #[test]
    fn report_serializes_to_json() {
        let data = TestData::new(1247, 12500, 1398, 12500);
        let report =
            ExperimentReport::build(&TestConfiguration::default(), Some(&data), &engine()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["plan"]["per_arm"], 3841);
        assert!(json["analysis"]["frequentist"]["p_value"].is_number());
    }
}
