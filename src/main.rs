#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jotform_proxy::start_server().await
}
