use std::sync::Arc;
use herald_core::{DocumentStore, FanOutConfig, FanOutEngine, PresenceSync, PushSender};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FanOutEngine>,
    pub presence: Arc<PresenceSync>,
}

impl AppState {
    pub fn new(
        config: &FanOutConfig,
        store: Arc<dyn DocumentStore>,
        sender: Arc<dyn PushSender>,
    ) -> Self {
        let engine = Arc::new(FanOutEngine::new(config, Arc::clone(&store), sender));
        let presence = Arc::new(PresenceSync::new(store));

        Self { engine, presence }
    }
}
