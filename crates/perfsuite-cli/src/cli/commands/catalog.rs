use super::{exit_codes, print_json, Workspace};
use crate::cli::args::CatalogSub;
use perfsuite_core::catalog::{load_catalog, seed_catalog};

pub fn run(ws: &Workspace, sub: CatalogSub) -> anyhow::Result<i32> {
    match sub {
        CatalogSub::Load { file } => {
            let catalog = load_catalog(&file)?;
            let summary = seed_catalog(&ws.store, &catalog)?;
            eprintln!(
                "catalog {}: {} created, {} already present",
                file.display(),
                summary.created,
                summary.reused
            );
            print_json(&summary)?;
            Ok(exit_codes::OK)
        }
    }
}
