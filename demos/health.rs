use estate_client::{ApiClient, HealthStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api = ApiClient::from_env()?;

    for _ in 0..api.hosts().len() {
        match api.health_check().await {
            HealthStatus::Healthy { host, payload, .. } => println!("{host}: healthy {payload}"),
            HealthStatus::Unhealthy { host, status, error } => {
                println!("{host}: unhealthy ({status}) {error}")
            }
            HealthStatus::Unreachable { host, error } => println!("{host}: unreachable {error}"),
        }
        api.switch_to_next_host();
    }

    Ok(())
}
