// rest_api/src/bin/issue_token.rs
// Prints a bearer token for an existing account. Login is not part of the
// service; operators use this to hand out tokens. Run it while the server
// is stopped, since sled holds an exclusive lock on the data directory.

use anyhow::{bail, Context, Result};

use lib::storage_engine::UserStorageEngine;
use lib::Database;
use rest_api::load_rest_api_config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let Some(email) = std::env::args().nth(1) else {
        bail!("usage: issue_token <email> [config-file]");
    };
    let config_file = std::env::args().nth(2).map(std::path::PathBuf::from);
    let config = load_rest_api_config(config_file.as_deref())?;

    let database = Database::open(&config.data_directory).context("Failed to open database")?;
    let Some(user) = database.users().get_user_by_email(&email).await? else {
        bail!("no account registered for {}", email);
    };
    if !user.active {
        bail!("account {} is deactivated", email);
    }

    let token = security::issue_token(user.id, user.role, &config.jwt_secret, config.token_ttl_hours)?;
    println!("{}", token);
    Ok(())
}
