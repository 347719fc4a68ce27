use crate::engine::{PlanRunOutcome, SuiteRunReport};
use crate::thresholds::{evaluate, ThresholdVerdict};

fn outcome_line(o: &PlanRunOutcome) -> String {
    let icon = if o.passed() { "✅" } else { "❌" };
    let outputs = o
        .recorded
        .results
        .iter()
        .map(|(name, r)| format!("{}={}", name, r.value))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} {:<24} v{:<4} {:<10} {}",
        icon, o.plan_name, o.version, o.config.platform, outputs
    )
}

fn verdict_of(o: &PlanRunOutcome) -> ThresholdVerdict {
    let measured = o
        .recorded
        .results
        .iter()
        .map(|(name, r)| (name.clone(), r.value.clone()))
        .collect();
    evaluate(&o.config.test_thresholds, &measured)
}

fn print_violations(o: &PlanRunOutcome) {
    if o.passed() {
        return;
    }
    for v in verdict_of(o).violations {
        eprintln!(
            "    {} {} {}: {}",
            v.output_name, v.threshold_type, v.target_value, v.reason
        );
    }
}

pub fn print_plan_run(o: &PlanRunOutcome) {
    eprintln!("{}", outcome_line(o));
    print_violations(o);
    if !o.recorded.ignored_keys.is_empty() {
        eprintln!("    ignored outputs: {}", o.recorded.ignored_keys.join(", "));
    }
    eprintln!("    execution #{}", o.recorded.execution.id);
}

pub fn print_suite_summary(report: &SuiteRunReport) {
    let total = report.outcomes.len() + report.failures.len() + report.skipped_plan_version_ids.len();
    eprintln!(
        "\nSuite '{}' v{} ({} plans)",
        report.suite_name, report.suite_version, total
    );

    for o in &report.outcomes {
        eprintln!("{}", outcome_line(o));
        print_violations(o);
    }
    for f in &report.failures {
        eprintln!(
            "💥 plan version #{} (position {}): {}",
            f.plan_version_id, f.order, f.message
        );
    }
    for id in &report.skipped_plan_version_ids {
        eprintln!("⏭️  plan version #{} skipped", id);
    }

    let passed = report.outcomes.iter().filter(|o| o.passed()).count();
    let failed = report.outcomes.len() - passed;
    eprintln!(
        "\nSummary: {} passed, {} failed, {} errored, {} skipped  [{}]",
        passed,
        failed,
        report.failures.len(),
        report.skipped_plan_version_ids.len(),
        report.suite_execution.status.as_str()
    );
    eprintln!("Suite execution #{}", report.suite_execution.id);
}
