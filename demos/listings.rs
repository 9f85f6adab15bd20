use estate_client::{ApiClient, FileTokenStore, ListingQuery};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("estate_client=debug")),
        )
        .init();

    let email = std::env::var("ESTATE_EMAIL")?;
    let password = std::env::var("ESTATE_PASSWORD")?;

    let api = ApiClient::from_env()?.with_token_store(FileTokenStore::new(".estate-session"));

    let host = api.discover_host().await?;
    println!("using {host}");

    let user = api.sign_in(&email, &password).await?;
    println!("signed in as {}", user["username"]);

    let listings = api
        .listings(
            &ListingQuery::new()
                .listing_type("rent")
                .sort("createdAt", "desc")
                .page(0, 9),
        )
        .await?;
    for listing in listings.as_array().into_iter().flatten() {
        println!("{} | {}", listing["name"], listing["address"]);
    }

    api.sign_out().await?;
    Ok(())
}
