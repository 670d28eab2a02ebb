use futures::StreamExt;
use ollama_link::types::generate::GenerateRequest;
use ollama_link::types::ModelOptions;
use ollama_link::{CancellationToken, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = OllamaClient::builder().build()?;

    let request = GenerateRequest::new("llama3.2:3b", "Why is the sky blue?")
        .options(ModelOptions::new().temperature(0.2).num_predict(256));

    let mut stream = client
        .generate_stream(request, &CancellationToken::new())
        .await?;

    while let Some(unit) = stream.next().await {
        match unit {
            Ok(chunk) => {
                print!("{}", chunk.response);
                if chunk.done {
                    println!("\n\n[{} tokens in {:?}]", chunk.eval_count, chunk.total_duration);
                }
            }
            Err(e) => eprintln!("\nGenerate Error: {}", e),
        }
    }

    Ok(())
}
