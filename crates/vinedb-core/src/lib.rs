pub mod app_config;
pub mod catalog;
pub mod config;
pub mod ledger;
pub mod slug;
pub mod sources;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    stable_entity_id, CatalogEntity, EnrichableFields, EntityDraft, EntityKind, Rating,
};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use ledger::{
    FailedEntry, FileLedgerStore, LedgerError, LedgerOutcome, LedgerState, LedgerStatus,
    LedgerStore, MemoryLedgerStore,
};
pub use slug::{fold_diacritics, slugify, MAX_SLUG_LEN};
pub use sources::{load_sources, reconcile_records, SourceRecord};
