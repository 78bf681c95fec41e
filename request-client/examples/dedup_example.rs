use request_client::{ClientConfig, InFlightCache, RequestClient, RequestDescriptor, SurfTransport};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let transport = SurfTransport::with_base_url("https://jsonplaceholder.typicode.com")?;
    let config = ClientConfig::default().with_header("Accept", "application/json");
    let client = RequestClient::with_parts(Arc::new(transport), Arc::new(InFlightCache::new()), config);

    let posts = RequestDescriptor::new("/posts")
        .param("userId", 1)
        .cached(true);

    // Example 1: concurrent identical requests share one round trip
    println!("=== Concurrent cached requests ===");
    let start = std::time::Instant::now();
    let first = client.get(&posts);
    let second = client.get(&posts);
    println!("Cache stats while in flight: {:?}", client.cache_stats());

    let (first, second) = futures::join!(first, second);
    let (first, second) = (first?, second?);
    println!("Both requests settled after {:?}", start.elapsed());
    println!("Same payload: {}", first == second);

    // Example 2: once settled, the next request goes back to the network
    println!("\n=== After settlement ===");
    println!("Cache stats: {:?}", client.cache_stats());
    let start = std::time::Instant::now();
    let again = client.get(&posts).await?;
    println!(
        "Fresh request took {:?} ({} posts)",
        start.elapsed(),
        again.as_array().map(Vec::len).unwrap_or_default()
    );

    // Example 3: failures reach every caller
    println!("\n=== Failing request ===");
    let missing = RequestDescriptor::new("/does-not-exist").cached(true);
    match client.get(&missing).await {
        Ok(value) => println!("Unexpected success: {}", value),
        Err(err) => println!("Request failed ({}): {}", err.kind(), err),
    }

    client.reset_cache();
    println!("\nCache stats after reset: {:?}", client.cache_stats());

    Ok(())
}
