//! One-shot super-user bootstrap
//!
//! Runs once before serving on an empty store. The latch is write-once for
//! the process lifetime; after it closes, further calls change nothing.

use std::sync::atomic::Ordering;

use tracing::{error, info, warn};

use super::Manager;
use crate::db::Driver;
use crate::models::Capability;

impl Manager {
    /// Ensure an entity with `GLOBAL_ROOT` exists, then latch.
    ///
    /// If the named entity already exists it is granted the capability
    /// as-is; this covers recovering a system that lost its last admin.
    /// Otherwise the entity is created through the normal CREATE chain
    /// with an auto-allocated number. Errors are logged rather than
    /// returned; a failed bootstrap leaves the latch open so a corrected
    /// restart can try again.
    pub async fn make_bootstrap(&self, id: &str, secret: &str) {
        if self.bootstrap_done.load(Ordering::SeqCst) {
            return;
        }

        if self.refctx.db.load_entity(id).await.is_ok() {
            warn!(entity = id, "Bootstrap entity exists, conferring authority");
            if let Err(err) = self.set_entity_capability(id, Capability::GlobalRoot).await {
                error!(entity = id, error = %err, "Could not confer root authority");
                return;
            }
            self.bootstrap_done.store(true, Ordering::SeqCst);
            return;
        }

        if let Err(err) = self.create_entity(id, -1, secret).await {
            error!(entity = id, error = %err, "Could not create bootstrap entity");
            return;
        }
        if let Err(err) = self.set_entity_capability(id, Capability::GlobalRoot).await {
            error!(entity = id, error = %err, "Could not confer root authority");
            return;
        }

        info!(entity = id, "Bootstrap complete");
        self.bootstrap_done.store(true, Ordering::SeqCst);
    }

    /// Close the latch without bootstrapping.
    pub fn disable_bootstrap(&self) {
        self.bootstrap_done.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::crypto::NoCrypto;
    use crate::db::{Driver, MemoryDriver};
    use crate::models::Capability;
    use crate::tree::Manager;

    fn test_manager() -> (Arc<MemoryDriver>, Manager) {
        let db = Arc::new(MemoryDriver::new());
        let m = Manager::new(db.clone(), Arc::new(NoCrypto::new())).unwrap();
        (db, m)
    }

    #[tokio::test]
    async fn bootstrap_creates_root_and_latches() {
        let (db, m) = test_manager();

        m.make_bootstrap("rootuser", "secret").await;
        let e = db.load_entity("rootuser").await.unwrap();
        assert!(e.meta.capabilities.contains(&Capability::GlobalRoot));
        assert_ne!(e.number, -1);

        // Second call is a no-op.
        m.make_bootstrap("rootuser", "secret").await;
        assert_eq!(db.discover_entity_ids().await.unwrap().len(), 1);

        // Latched: a new ID changes nothing.
        m.make_bootstrap("other", "secret").await;
        assert_eq!(db.discover_entity_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bootstrap_confers_authority_on_existing_entity() {
        let (db, m) = test_manager();
        m.create_entity("survivor", 1, "secret").await.unwrap();

        m.make_bootstrap("survivor", "ignored").await;
        let e = db.load_entity("survivor").await.unwrap();
        assert!(e.meta.capabilities.contains(&Capability::GlobalRoot));
        assert_eq!(db.discover_entity_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disable_closes_latch() {
        let (db, m) = test_manager();
        m.disable_bootstrap();
        m.make_bootstrap("rootuser", "secret").await;
        assert!(db.discover_entity_ids().await.unwrap().is_empty());
    }
}
