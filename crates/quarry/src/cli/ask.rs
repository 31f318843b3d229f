use anyhow::Result;

use quarry_core::{Config, InsightClient};

pub async fn run(config: &Config, question: &str, endpoint: Option<&str>) -> Result<()> {
    let mut insight = config.insight.clone();
    if let Some(endpoint) = endpoint {
        insight.endpoint = endpoint.to_string();
    }

    let client = InsightClient::new(&insight)?;
    let result = client.ask(question).await?;

    println!("{}", result.answer);

    let sources = result.unique_sources();
    if !sources.is_empty() {
        println!();
        println!("Sources:");
        for source in sources {
            println!("  - {source}");
        }
    }

    Ok(())
}
