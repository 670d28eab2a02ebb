use std::time::Duration;

use futures::StreamExt;
use ollama_link::scope::deadline;
use ollama_link::types::chat::{ChatMessage, ChatRequest};
use ollama_link::{Error, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt::init();

    let client = OllamaClient::builder().build()?;

    let request = ChatRequest::new("llama3.2:3b")
        .add_message(ChatMessage::user("Tell me a story about a Rust programmer."));

    // Give up on the whole exchange after two minutes.
    let scope = deadline(Duration::from_secs(120));
    let mut stream = client.chat_stream(request, &scope).await?;

    while let Some(unit) = stream.next().await {
        match unit {
            Ok(response) => print!("{}", response.message.content),
            Err(Error::Cancelled) => eprintln!("\n[deadline reached]"),
            Err(e) => eprintln!("\nChat Error: {}", e),
        }
    }
    println!();

    Ok(())
}
