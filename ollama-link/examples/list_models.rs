use ollama_link::{CancellationToken, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = OllamaClient::builder().build()?;
    let cancel = CancellationToken::new();

    println!("Ollama {}", client.version(&cancel).await?);
    let response = client.list_models(&cancel).await?;
    for model in response.models {
        println!("{:<32} {:>12} bytes  {}", model.name, model.size, model.modified_at);
    }

    Ok(())
}
