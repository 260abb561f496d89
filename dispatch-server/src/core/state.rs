//! Server state — shared handles for every service
//!
//! `ServerState` holds the store handle and one instance of each reactor.
//! Everything inside is cheap to clone (`Arc` or shallow handles), so the
//! state itself is the axum application state.

use crate::availability::AvailabilityReconciler;
use crate::core::Config;
use crate::dispatch::{DistributionScheduler, PurchaseOrchestrator};
use crate::notifications::NotificationService;
use crate::refunds::RefundPropagator;
use crate::store::{DocumentStore, MemoryStore, PathConfig, StoreGateway};
use crate::triggers;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub gateway: StoreGateway,
    pub scheduler: DistributionScheduler,
    pub orchestrator: PurchaseOrchestrator,
    pub reconciler: AvailabilityReconciler,
    pub propagator: RefundPropagator,
    pub notifications: NotificationService,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .field("store", &"<DocumentStore>")
            .finish()
    }
}

impl ServerState {
    /// Build the state around the embedded store
    pub fn initialize(config: &Config) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Build the state around an explicit store backend
    pub fn with_store(config: &Config, store: Arc<dyn DocumentStore>) -> Self {
        let paths = PathConfig::new(config.events_collection.clone());
        let gateway = StoreGateway::new(Arc::clone(&store), paths);
        let scheduler = DistributionScheduler::new(gateway.clone());
        let orchestrator = PurchaseOrchestrator::new(gateway.clone(), scheduler.clone());
        let notifications = NotificationService::new(gateway.clone());
        let reconciler = AvailabilityReconciler::new(gateway.clone(), notifications.clone());
        let propagator = RefundPropagator::new(gateway.clone());

        Self {
            config: config.clone(),
            store,
            gateway,
            scheduler,
            orchestrator,
            reconciler,
            propagator,
            notifications,
        }
    }

    /// Start the trigger router and the reactor workers.
    ///
    /// Must be called before `Server::run()`.
    pub fn start_background_tasks(&self) {
        triggers::spawn(self);
    }
}
