//! Public sale identifiers.
//!
//! Sales are exposed externally through a `TUR-YYYYMMDD-XXXX` secure id
//! instead of their primary key. The suffix is random, so generation is
//! collision-checked against the repository before use.

use chrono::NaiveDate;
use rand::Rng;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::warn;

use crate::entities::sale;
use crate::errors::ServiceError;

const SECURE_ID_PREFIX: &str = "TUR";
const SUFFIX_LEN: usize = 4;
const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_ATTEMPTS: usize = 10;

/// Generates one candidate secure id for a sale on `date`.
pub fn generate_secure_id(date: NaiveDate) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SUFFIX_ALPHABET.len());
            SUFFIX_ALPHABET[idx] as char
        })
        .collect();
    format!("{SECURE_ID_PREFIX}-{}-{suffix}", date.format("%Y%m%d"))
}

/// Issues collision-checked secure ids for new Sales.
#[derive(Clone)]
pub struct IdentifierService {
    db: Arc<DatabaseConnection>,
}

impl IdentifierService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Generates a secure id not yet present in the sales table.
    pub async fn issue_secure_id(&self, date: NaiveDate) -> Result<String, ServiceError> {
        for attempt in 0..MAX_ATTEMPTS {
            let candidate = generate_secure_id(date);
            let exists = sale::Entity::find()
                .filter(sale::Column::SecureId.eq(candidate.clone()))
                .one(&*self.db)
                .await?
                .is_some();
            if !exists {
                return Ok(candidate);
            }
            warn!(attempt, candidate, "Secure id collision, regenerating");
        }
        Err(ServiceError::InternalError(format!(
            "Could not generate a unique secure id after {MAX_ATTEMPTS} attempts"
        )))
    }
}
