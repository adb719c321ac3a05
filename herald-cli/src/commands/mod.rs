mod docs;
mod presence;
mod serve;
mod trigger;

pub use docs::{handle_docs_action, DocsAction};
pub use presence::handle_presence_command;
pub use serve::handle_serve_command;
pub use trigger::{handle_trigger_action, TriggerAction};
