//! Command menu shown once a connection is up

use crate::config::{EndorserRole, SessionConfig};

/// What a menu key does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    SendMessage,
    NewInvitation,
    SetEndorserDid,
    SwitchWallet,
    Exit,
}

/// One menu entry
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub key: char,
    pub label: &'static str,
    /// Whether the entry is offered under the given session flags
    pub enabled: fn(&SessionConfig) -> bool,
    pub action: CommandAction,
}

fn always(_: &SessionConfig) -> bool {
    true
}

fn is_author(config: &SessionConfig) -> bool {
    config.endorser_role == EndorserRole::Author
}

fn is_multitenant(config: &SessionConfig) -> bool {
    config.multitenant
}

/// Every command the session knows, in display order
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        key: '3',
        label: "Send Message",
        enabled: always,
        action: CommandAction::SendMessage,
    },
    CommandSpec {
        key: '4',
        label: "Input New Invitation",
        enabled: always,
        action: CommandAction::NewInvitation,
    },
    CommandSpec {
        key: 'D',
        label: "Set Endorser's DID",
        enabled: is_author,
        action: CommandAction::SetEndorserDid,
    },
    CommandSpec {
        key: 'W',
        label: "Create and/or Enable Wallet",
        enabled: is_multitenant,
        action: CommandAction::SwitchWallet,
    },
    CommandSpec {
        key: 'X',
        label: "Exit?",
        enabled: always,
        action: CommandAction::Exit,
    },
];

/// Commands enabled for one session; never changes after startup
#[derive(Debug, Clone)]
pub struct CommandMenu {
    entries: Vec<CommandSpec>,
}

impl CommandMenu {
    pub fn build(config: &SessionConfig) -> Self {
        let entries = COMMANDS
            .iter()
            .filter(|spec| (spec.enabled)(config))
            .copied()
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CommandSpec] {
        &self.entries
    }

    pub fn contains(&self, action: CommandAction) -> bool {
        self.entries.iter().any(|spec| spec.action == action)
    }

    /// Menu text used as the command prompt
    pub fn render(&self) -> String {
        let mut text = String::new();
        for spec in &self.entries {
            text.push_str(&format!("    ({}) {}\n", spec.key, spec.label));
        }
        let keys: Vec<String> = self.entries.iter().map(|s| s.key.to_string()).collect();
        text.push_str(&format!("[{}] ", keys.join("/")));
        text
    }

    /// Map a line of input to an enabled command.
    ///
    /// A blank line exits. Unknown and disabled keys yield `None`.
    pub fn resolve(&self, input: &str) -> Option<CommandAction> {
        let input = input.trim();
        if input.is_empty() {
            return Some(CommandAction::Exit);
        }

        let mut chars = input.chars();
        let key = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() {
            return None;
        }

        self.entries
            .iter()
            .find(|spec| spec.key == key)
            .map(|spec| spec.action)
    }
}
