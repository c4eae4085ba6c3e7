#[tokio::main]
async fn main() {
    statuspage_lib::init_tracing();
    if let Err(e) = statuspage_lib::run().await {
        tracing::error!(error = %e, "statuspage exited with error");
        std::process::exit(1);
    }
}
