use ollama_link::types::generate::GenerateRequest;
use ollama_link::{CancellationToken, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = OllamaClient::builder().build()?;

    let request = GenerateRequest::new("llama3.2:3b", "Tell me a story about a Rust programmer.");

    let response = client.generate(request, &CancellationToken::new()).await?;

    println!("Response: {}", response.response);
    println!("Took {:?}", response.total_duration);

    Ok(())
}
