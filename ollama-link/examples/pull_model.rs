use futures::StreamExt;
use ollama_link::types::PullModelRequest;
use ollama_link::{CancellationToken, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt::init();

    let client = OllamaClient::builder().build()?;

    let mut progress = client
        .pull_model(PullModelRequest::new("llama3.2:3b"), &CancellationToken::new())
        .await?;

    while let Some(update) = progress.next().await {
        let update = update?;
        if update.total > 0 {
            println!("{} {}/{}", update.status, update.completed, update.total);
        } else {
            println!("{}", update.status);
        }
    }

    Ok(())
}
