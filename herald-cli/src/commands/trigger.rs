use clap::Subcommand;
use std::sync::Arc;

use herald_core::{
    build_sender, Config, DirectMessageCreated, FanOutEngine, GroupMessageCreated, Outcome,
};

use crate::Stores;

#[derive(Subcommand)]
pub enum TriggerAction {
    /// Message stored at users/{owner}/chats/{counterpart}/messages/{message}.
    Direct {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        counterpart: String,
        #[arg(long)]
        message: String,
    },
    /// Message stored at groups/{group}/messages/{message}.
    Group {
        #[arg(long)]
        group: String,
        #[arg(long)]
        message: String,
    },
}

pub async fn handle_trigger_action(
    config: &Config,
    stores: &Stores,
    action: TriggerAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let sender = build_sender(&config.push)?;
    let engine = FanOutEngine::new(&config.fanout, Arc::clone(&stores.documents), sender);

    let outcome = match action {
        TriggerAction::Direct {
            owner,
            counterpart,
            message,
        } => {
            engine
                .handle_direct_message(&DirectMessageCreated {
                    owner_id: owner,
                    counterpart_id: counterpart,
                    message_id: message,
                })
                .await
        }
        TriggerAction::Group { group, message } => {
            engine
                .handle_group_message(&GroupMessageCreated {
                    group_id: group,
                    message_id: message,
                })
                .await
        }
    };

    print_outcome(&outcome)
}

pub(crate) fn print_outcome(outcome: &Outcome) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
