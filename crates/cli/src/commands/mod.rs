//! CLI commands for the A/B test inference engine.

pub mod args;
pub mod bayesian;
pub mod frequentist;
pub mod plan;
pub mod report;
pub mod roi;

pub use bayesian::{run_bayesian, BayesianArgs};
pub use frequentist::{run_frequentist, FrequentistArgs};
pub use plan::{run_plan, PlanArgs};
pub use report::{run_report, ReportArgs};
pub use roi::{run_roi, RoiArgs};
