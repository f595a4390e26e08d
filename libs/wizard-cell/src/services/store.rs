use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use shared_config::DEFAULT_WIZARD_IDLE_SECS;

use crate::models::{WizardError, WizardPhase};
use crate::services::controller::WizardController;

pub type SharedWizard = Arc<Mutex<WizardController>>;

/// Open wizards one patient may hold; starting another drops their stalest.
pub const MAX_WIZARDS_PER_USER: usize = 5;

struct StoredWizard {
    owner_id: String,
    wizard: SharedWizard,
    last_touched: Instant,
}

impl StoredWizard {
    fn is_idle(&self, ttl: Duration) -> bool {
        self.last_touched.elapsed() >= ttl
    }

    /// A wizard busy with a request is never reported closed.
    fn is_closed(&self) -> bool {
        self.wizard
            .try_lock()
            .map(|w| w.phase() != WizardPhase::Active)
            .unwrap_or(false)
    }
}

/// In-memory wizard sessions keyed by id. Each wizard has its own lock so
/// patients never wait on one another. Idle and closed wizards are evicted
/// whenever a new one is stored, and an idle wizard is gone on lookup.
#[derive(Clone)]
pub struct WizardStore {
    wizards: Arc<RwLock<HashMap<Uuid, StoredWizard>>>,
    idle_ttl: Duration,
}

impl Default for WizardStore {
    fn default() -> Self {
        Self::with_idle_ttl(Duration::from_secs(DEFAULT_WIZARD_IDLE_SECS))
    }
}

impl WizardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            wizards: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    pub async fn insert(&self, wizard: WizardController) -> (Uuid, SharedWizard) {
        self.purge_expired().await;

        let id = wizard.id();
        let owner_id = wizard.owner_id().to_string();
        let shared = Arc::new(Mutex::new(wizard));

        let mut wizards = self.wizards.write().await;

        let mut owned: Vec<(Uuid, Instant)> = wizards
            .iter()
            .filter(|(_, entry)| entry.owner_id == owner_id)
            .map(|(id, entry)| (*id, entry.last_touched))
            .collect();
        if owned.len() >= MAX_WIZARDS_PER_USER {
            owned.sort_by_key(|(_, touched)| *touched);
            for (stale, _) in owned.iter().take(owned.len() + 1 - MAX_WIZARDS_PER_USER) {
                wizards.remove(stale);
                debug!("Dropped wizard {} to make room for user {}", stale, owner_id);
            }
        }

        wizards.insert(
            id,
            StoredWizard {
                owner_id,
                wizard: shared.clone(),
                last_touched: Instant::now(),
            },
        );
        debug!("Stored wizard {}", id);
        (id, shared)
    }

    /// Looks up a wizard for its owner and marks it as used. Someone else's
    /// wizard, or one left idle too long, is reported as missing.
    pub async fn get(&self, id: Uuid, user_id: &str) -> Result<SharedWizard, WizardError> {
        let mut wizards = self.wizards.write().await;

        let entry = wizards.get_mut(&id).ok_or(WizardError::NotFound)?;
        if entry.owner_id != user_id {
            debug!("User {} asked for wizard {} owned by someone else", user_id, id);
            return Err(WizardError::NotFound);
        }
        if entry.is_idle(self.idle_ttl) {
            wizards.remove(&id);
            debug!("Wizard {} expired after inactivity", id);
            return Err(WizardError::NotFound);
        }

        entry.last_touched = Instant::now();
        Ok(entry.wizard.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.wizards.write().await.remove(&id).is_some();
        if removed {
            debug!("Removed wizard {}", id);
        }
        removed
    }

    /// Drops idle and closed wizards. Returns how many were evicted.
    pub async fn purge_expired(&self) -> usize {
        let mut wizards = self.wizards.write().await;
        let before = wizards.len();
        let ttl = self.idle_ttl;

        wizards.retain(|id, entry| {
            let keep = !entry.is_idle(ttl) && !entry.is_closed();
            if !keep {
                debug!("Evicting wizard {}", id);
            }
            keep
        });

        before - wizards.len()
    }

    pub async fn len(&self) -> usize {
        self.wizards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.wizards.read().await.is_empty()
    }
}
