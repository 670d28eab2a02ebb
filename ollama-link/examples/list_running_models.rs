use ollama_link::{CancellationToken, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = OllamaClient::builder().build()?;

    let response = client.list_running_models(&CancellationToken::new()).await?;
    println!("{:#?}", response);

    Ok(())
}
