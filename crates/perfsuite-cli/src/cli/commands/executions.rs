use super::{exit_codes, print_json, Workspace};
use crate::cli::args::ExecutionsSub;

pub fn run(ws: &Workspace, sub: ExecutionsSub) -> anyhow::Result<i32> {
    match sub {
        ExecutionsSub::List { plan_version } => {
            // Fails for unknown ids instead of printing an empty list.
            ws.store.get_plan_version(plan_version)?;
            print_json(&ws.store.list_executions(plan_version)?)?;
            Ok(exit_codes::OK)
        }
        ExecutionsSub::Show { id } => {
            let execution = ws.store.get_execution(id)?;
            let results: Vec<_> = ws
                .store
                .output_results(id)?
                .into_iter()
                .map(|(result, output)| {
                    serde_json::json!({
                        "output": output.name,
                        "unit": output.unit,
                        "value": result.value,
                    })
                })
                .collect();
            print_json(&serde_json::json!({
                "execution": execution,
                "results": results,
            }))?;
            Ok(exit_codes::OK)
        }
    }
}
