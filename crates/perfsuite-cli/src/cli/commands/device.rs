use super::{exit_codes, print_json, Workspace};
use crate::cli::args::DeviceSub;

pub async fn run(ws: &Workspace, sub: DeviceSub) -> anyhow::Result<i32> {
    match sub {
        DeviceSub::Resolve { name } => {
            let resolved = ws.resolver().resolve_device(&name).await?;
            print_json(&serde_json::json!({
                "device": resolved.device,
                "os": resolved.os,
                "os_version": resolved.os_version,
            }))?;
            Ok(exit_codes::OK)
        }
    }
}
