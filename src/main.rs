use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    realm_resx::init_logging();

    match realm_resx::run().await {
        Ok(path) => {
            tracing::info!("Snapshot written to {:?}", path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Sync failed ({:?}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}
