use super::{exit_codes, print_json, Workspace};
use crate::cli::args::PlanSub;
use perfsuite_core::config::load_plan_request;
use perfsuite_core::engine::assembler;
use perfsuite_core::report::console::print_plan_run;
use perfsuite_core::versioning::TestPlanVersioning;
use tokio_util::sync::CancellationToken;

pub async fn run(ws: &Workspace, sub: PlanSub, cancel: &CancellationToken) -> anyhow::Result<i32> {
    match sub {
        PlanSub::Create {
            file,
            suite_version,
        } => {
            let mut req = load_plan_request(&file)?;
            if suite_version.is_some() {
                req.test_suite_version_id = suite_version;
            }
            let created = TestPlanVersioning::new(ws.store.clone(), ws.resolver())
                .create_version(&req)
                .await?;
            eprintln!(
                "{} plan '{}' version {}",
                if created.plan_created { "created" } else { "updated" },
                created.plan.name,
                created.version.version
            );
            print_json(&serde_json::json!({
                "test_plan_id": created.plan.id,
                "test_plan_version_id": created.version.id,
                "version": created.version.version,
                "suite_order": created.suite_order,
            }))?;
            Ok(exit_codes::OK)
        }
        PlanSub::Show { version_id } => {
            let config = assembler::load_config(&ws.store, version_id)?;
            print_json(&config)?;
            Ok(exit_codes::OK)
        }
        PlanSub::Run { version_id } => {
            let outcome = ws.executor().run_plan_version(version_id, cancel).await?;
            print_plan_run(&outcome);
            print_json(&outcome.recorded.execution)?;
            Ok(if outcome.passed() {
                exit_codes::OK
            } else {
                exit_codes::TEST_FAILED
            })
        }
    }
}
