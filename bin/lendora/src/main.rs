#[tokio::main]
async fn main() -> Result<(), eyre::Report> {
    lendora::run().await
}
