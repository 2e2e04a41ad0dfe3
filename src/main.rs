#[tokio::main]
async fn main() {
    if let Err(e) = rfp_desk::run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
