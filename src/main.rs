#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = gradebook_api::run().await {
        eprintln!("gradebook-api fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
