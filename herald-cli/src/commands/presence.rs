use std::sync::Arc;

use herald_core::{PresenceChanged, PresenceSync};

use super::trigger::print_outcome;
use crate::Stores;

pub async fn handle_presence_command(
    stores: &Stores,
    user: String,
    active: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sync = PresenceSync::new(Arc::clone(&stores.documents));
    let outcome = sync
        .apply(&PresenceChanged {
            user_id: user,
            active,
        })
        .await;
    print_outcome(&outcome)
}
