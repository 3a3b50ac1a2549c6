//! Customers and products loaded into the in-memory store at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use store::{CustomerId, InMemoryOrderStore, ProductRecord};
use thiserror::Error;

use crate::config::Config;

const DEMO_SEED: &str = include_str!("../fixtures/seed.json");

/// Seed data could not be loaded.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid seed data in {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_json::Error,
    },
}

/// Reference rows an order needs before it can be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub customers: Vec<CustomerId>,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

impl Seed {
    /// The catalog bundled with the binary.
    pub fn demo() -> Result<Self, SeedError> {
        Self::parse(DEMO_SEED, "bundled seed")
    }

    /// Reads seed data from a JSON file.
    pub async fn from_file(path: &Path) -> Result<Self, SeedError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&json, &path.display().to_string())
    }

    fn parse(json: &str, origin: &str) -> Result<Self, SeedError> {
        serde_json::from_str(json).map_err(|source| SeedError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Inserts every customer and product into `store`.
    pub async fn apply(self, store: &InMemoryOrderStore) {
        for customer_id in self.customers {
            store.insert_customer(customer_id).await;
        }
        for product in self.products {
            store.insert_product(product).await;
        }
    }
}

/// Builds the in-memory store, seeded from `SEED_FILE` or the bundled catalog.
pub async fn in_memory_store(config: &Config) -> Result<InMemoryOrderStore, SeedError> {
    let seed = match &config.seed_file {
        Some(path) => Seed::from_file(path).await?,
        None => Seed::demo()?,
    };
    tracing::info!(
        customers = seed.customers.len(),
        products = seed.products.len(),
        "seeding in-memory order store"
    );

    let store = InMemoryOrderStore::new();
    seed.apply(&store).await;
    Ok(store)
}
