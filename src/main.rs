#[tokio::main]
async fn main() -> anyhow::Result<()> {
    videopopup::bootstrapper::run().await
}
