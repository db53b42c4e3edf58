#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = codelab_portal::run().await {
        eprintln!("codelab-portal fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
