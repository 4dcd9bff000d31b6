//! Tool calling before a structured answer.
//!
//! Set OPENAI_API_KEY in your environment and run:
//!   cargo run --example tool_calling -p stencil --features provider-openai

use stencil::prelude::*;

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct ConvertArgs {
    /// Amount in euros.
    eur: f64,
}

/// Converts euros to US dollars at a fixed rate.
struct EurToUsd;

impl Tool for EurToUsd {
    const NAME: &'static str = "eur_to_usd";
    type Args = ConvertArgs;
    type Output = f64;
    type Error = std::convert::Infallible;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.into(),
            description: "Convert an amount in EUR to USD".into(),
            input_schema: Schema::for_type::<ConvertArgs>().definition().clone(),
        }
    }

    async fn call(&self, args: ConvertArgs) -> Result<f64, std::convert::Infallible> {
        Ok(args.eur * 1.08)
    }
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct Invoice {
    number: String,
    total_eur: f64,
    total_usd: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let structured = StructuredLoop::builder(OpenAiProtocol::new(), OpenAi::from_env()?)
        .parallel_tool_execution(true)
        .build();

    let request = StructuredRequest::builder("gpt-4o")
        .prompt("Invoice #42 totals 19.99 EUR. Extract it, including the USD total.")
        .schema(Schema::for_type::<Invoice>())
        .tool(EurToUsd)
        .max_steps(3)
        .build()?;

    let response = structured.run(request).await?;
    for (i, step) in response.steps.iter().enumerate() {
        println!("step {i}: {:?}, {} tool call(s)", step.finish_reason, step.tool_calls.len());
    }

    let invoice: Invoice = response.structured_as()?;
    println!(
        "Invoice {}: {:.2} EUR = {:.2} USD",
        invoice.number, invoice.total_eur, invoice.total_usd
    );

    Ok(())
}
