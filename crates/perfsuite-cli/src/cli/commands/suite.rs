use super::{exit_codes, print_json, Workspace};
use crate::cli::args::SuiteSub;
use perfsuite_core::engine::SuiteSequencer;
use perfsuite_core::errors::ConfigError;
use perfsuite_core::on_error::FailurePolicy;
use perfsuite_core::report::console::print_suite_summary;
use tokio_util::sync::CancellationToken;

pub async fn run(ws: &Workspace, sub: SuiteSub, cancel: &CancellationToken) -> anyhow::Result<i32> {
    match sub {
        SuiteSub::Create { name, description } => {
            let suite = ws.store.insert_test_suite(&name, &description)?;
            eprintln!("created suite '{}' (#{})", suite.name, suite.id);
            print_json(&suite)?;
            Ok(exit_codes::OK)
        }
        SuiteSub::Version {
            suite_id,
            plans,
            notes,
        } => {
            let version = ws.store.insert_suite_version(suite_id, &notes, &plans)?;
            eprintln!(
                "suite #{} version {} with {} plan(s)",
                suite_id,
                version.version,
                plans.len()
            );
            print_json(&version)?;
            Ok(exit_codes::OK)
        }
        SuiteSub::Run {
            suite_id,
            on_failure,
        } => {
            let policy = match on_failure {
                None => ws.cfg.suite.on_failure,
                Some(raw) => FailurePolicy::parse(&raw).ok_or_else(|| {
                    ConfigError(format!("--on-failure must be abort or continue, got '{}'", raw))
                })?,
            };

            let report = SuiteSequencer::new(ws.executor(), policy)
                .run_suite(suite_id, cancel)
                .await?;
            print_suite_summary(&report);
            print_json(&report.suite_execution)?;

            Ok(if !report.failures.is_empty() {
                exit_codes::INFRA_ERROR
            } else if report.all_passed() {
                exit_codes::OK
            } else {
                exit_codes::TEST_FAILED
            })
        }
    }
}
