//! Basic usage example for the regent library.
//!
//! Lists the tags of a repository on a local registry.
//!
//! Run with: cargo run --example basic_usage

use libregent::{Client, Method};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::builder("http://localhost:5000")
        .default_name("alpine")
        .build()?;
    println!("Using registry: {}\n", client.registry_url());

    let req = client.new_request(Method::GET, "/v2/", []);
    match client.execute(req).await {
        Ok(resp) if resp.is_success() => println!("✓ Registry supports the distribution API\n"),
        Ok(resp) => {
            eprintln!("✗ Registry answered {}", resp.status());
            return Ok(());
        }
        Err(e) => {
            eprintln!("✗ Failed to connect: {}", e);
            eprintln!("  Make sure a registry is running at http://localhost:5000");
            eprintln!("  You can start one with: docker run -d -p 5000:5000 registry:2");
            return Ok(());
        }
    }

    let req = client.new_request(Method::GET, "/v2/<name>/tags/list", []);
    let resp = client.execute(req).await?.check_status()?;
    let tags: serde_json::Value = resp.json()?;
    println!("Tags for {}:", client.default_name());
    for tag in tags["tags"].as_array().into_iter().flatten() {
        println!("  - {}", tag.as_str().unwrap_or_default());
    }

    Ok(())
}
