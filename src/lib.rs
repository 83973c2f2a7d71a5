//! The Re-Indent plugin: announces itself, adds `Edit > Re-Indent`
//! (`Ctrl+Alt+I`) right after `Unindent`, then relays every line the editor
//! sends back unchanged.

use async_trait::async_trait;
use editor_plugin::{
    PluginHandler,
    protocol::{HostCommand, MenuItem, MenuSegment, ProtocolError},
};

pub const PLUGIN_NAME: &str = "indentation";
/// Settings are read from `INDENTATION_*` variables.
pub const ENV_PREFIX: &str = "INDENTATION";
pub const LOG_FILE_NAME: &str = "indentation-plugin.log";
pub const STARTED: &str = "Indentation plugin started";
pub const REINDENT_ACTION: &str = "editActionReIndent";

#[derive(Debug, Default, Clone)]
pub struct IndentationPlugin;

impl IndentationPlugin {
    pub fn reindent_menu_item() -> Result<MenuItem, ProtocolError> {
        MenuItem::new(vec![MenuSegment::new("menu_Edit", "&Edit")?], MenuSegment::new(REINDENT_ACTION, "Re-Indent")?)
            .after("editActionUnindent")?
            .with_shortcut("Ctrl+Alt+I")
    }
}

#[async_trait]
impl PluginHandler for IndentationPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn startup(&self) -> Result<Vec<HostCommand>, ProtocolError> {
        Ok(vec![HostCommand::comment(STARTED)?, Self::reindent_menu_item()?.into()])
    }
}
