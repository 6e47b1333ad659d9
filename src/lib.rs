// Public modules
pub mod database;
pub mod domains;
pub mod errors;
pub mod types;
pub mod validation;

// Private modules
mod db_migration;

use database::{Store, StoreConfig};

/// Open the store described by `config` and bring its schema up to date.
/// The returned handle is the only way into the persistence layer; callers
/// own its lifecycle and pass it to the services they construct.
pub async fn initialize(config: &StoreConfig) -> errors::DbResult<Store> {
    let store = Store::connect(config).await?;
    store.migrate().await?;
    Ok(store)
}

/// Install the `env_logger` backend for the `log` facade. Hosts that manage
/// their own logging simply never call this; repeated calls are harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
