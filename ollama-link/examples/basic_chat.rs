use ollama_link::types::chat::{ChatMessage, ChatRequest};
use ollama_link::{CancellationToken, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = OllamaClient::builder().build()?;

    let request = ChatRequest::new("llama3.2:3b")
        .add_message(ChatMessage::system("You are a terse assistant."))
        .add_message(ChatMessage::user("What is a borrow checker?"));

    let response = client.chat(request, &CancellationToken::new()).await?;

    println!("{:?}: {}", response.message.role, response.message.content);

    Ok(())
}
