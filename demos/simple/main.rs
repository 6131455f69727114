use unleash::{FnStrategy, Parameters};

pub fn main() -> unleash::Result<()> {
    // Configure env_logger to see toggle client logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("unleash")).init();

    let endpoint = std::env::var("UNLEASH_URL")
        .unwrap_or_else(|_| "http://localhost:4242/api/client/features".to_owned());

    let mut config = unleash::ClientConfig::new(endpoint)
        .poll_interval_secs(10)
        .strategy(FnStrategy::new("userWithId", |parameters: &Parameters| {
            parameters
                .get("userIds")
                .is_some_and(|ids| ids.split(',').any(|id| id.trim() == "42"))
        }));
    if let Ok(token) = std::env::var("UNLEASH_API_TOKEN") {
        config = config.header("Authorization", token);
    }
    let client = config.to_client()?;

    // Until the first fetch finishes, the client serves toggles from the backup file.
    if let Err(err) = client.wait_for_first_fetch() {
        println!("error fetching toggles: {:?}", err);
    }

    for name in client.toggle_names() {
        println!("{}: {}", name, client.is_enabled(&name));
    }

    client.shutdown()
}
