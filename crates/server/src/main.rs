#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agrovale_server::run().await
}
