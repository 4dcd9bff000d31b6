//! Structured output: a typed answer from a JSON Schema.
//!
//! Set ANTHROPIC_API_KEY in your environment and run:
//!   cargo run --example structured_output -p stencil --features provider-anthropic

use stencil::prelude::*;

/// A movie review with structured fields.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct MovieReview {
    /// Title of the movie.
    title: String,
    /// Rating from 1 to 10.
    rating: u8,
    /// Brief summary of the review.
    summary: String,
    /// Whether the reviewer recommends the movie.
    recommended: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let structured = StructuredLoop::new(AnthropicProtocol::new(), Anthropic::from_env()?);

    let request = StructuredRequest::builder("claude-sonnet-4-20250514")
        .system_prompt("You are a film critic.")
        .prompt("Review the movie Inception.")
        .schema(Schema::for_type::<MovieReview>())
        .max_tokens(1024)
        .build()?;

    let response = structured.run(request).await?;
    println!("Raw JSON response:\n{}\n", response.text);

    let review: MovieReview = response.structured_as()?;
    println!("Parsed MovieReview:");
    println!("  Title:       {}", review.title);
    println!("  Rating:      {}/10", review.rating);
    println!("  Summary:     {}", review.summary);
    println!("  Recommended: {}", review.recommended);
    println!("Tokens: {} in, {} out", response.usage.prompt_tokens, response.usage.completion_tokens);

    Ok(())
}
