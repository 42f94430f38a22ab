//! Add-server form state

use std::collections::BTreeMap;
use thiserror::Error;

use crate::api::models::{ServerConfig, ServerKind, ServerMutation, ServerTransport};
use crate::api::{GatewayClient, GatewayError};

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Server name is required")]
    MissingName,
    #[error("Command is required for command servers")]
    MissingCommand,
    #[error("Server URL is required for HTTP servers")]
    MissingUrl,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvRow {
    pub key: String,
    pub value: String,
}

/// Editable fields of a new server. Argument and env rows may be blank while
/// editing; blanks are dropped when the config is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerForm {
    pub name: String,
    pub kind: ServerKind,
    pub command: String,
    pub args: Vec<String>,
    pub url: String,
    pub env: Vec<EnvRow>,
    pub description: String,
}

impl Default for ServerForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ServerKind::Command,
            command: String::new(),
            args: vec![String::new()],
            url: String::new(),
            env: vec![EnvRow::default()],
            description: String::new(),
        }
    }
}

impl ServerForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_arg(&mut self) {
        self.args.push(String::new());
    }

    pub fn set_arg(&mut self, index: usize, value: impl Into<String>) {
        if let Some(arg) = self.args.get_mut(index) {
            *arg = value.into();
        }
    }

    pub fn remove_arg(&mut self, index: usize) {
        if index < self.args.len() {
            self.args.remove(index);
        }
    }

    pub fn add_env(&mut self) {
        self.env.push(EnvRow::default());
    }

    pub fn set_env(&mut self, index: usize, key: impl Into<String>, value: impl Into<String>) {
        if let Some(row) = self.env.get_mut(index) {
            row.key = key.into();
            row.value = value.into();
        }
    }

    pub fn remove_env(&mut self, index: usize) {
        if index < self.env.len() {
            self.env.remove(index);
        }
    }

    /// Validate and assemble the config to send
    pub fn build(&self) -> Result<ServerConfig, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::MissingName);
        }

        let transport = match self.kind {
            ServerKind::Command => {
                let command = self.command.trim();
                if command.is_empty() {
                    return Err(FormError::MissingCommand);
                }
                ServerTransport::Command {
                    command: command.to_string(),
                    args: self
                        .args
                        .iter()
                        .filter(|arg| !arg.trim().is_empty())
                        .cloned()
                        .collect(),
                }
            }
            ServerKind::Http => {
                let url = self.url.trim();
                if url.is_empty() {
                    return Err(FormError::MissingUrl);
                }
                ServerTransport::Http {
                    url: url.to_string(),
                }
            }
        };

        let env: BTreeMap<String, String> = self
            .env
            .iter()
            .filter(|row| !row.key.trim().is_empty() && !row.value.trim().is_empty())
            .map(|row| (row.key.clone(), row.value.clone()))
            .collect();

        let description = Some(self.description.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(ServerConfig {
            name: name.to_string(),
            transport,
            description,
            env,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Register the server. Fields are cleared on success and left as typed
    /// on failure so the operator can correct and resubmit.
    pub async fn submit(&mut self, client: &GatewayClient) -> Result<ServerMutation, FormError> {
        let config = self.build()?;
        let response = client.add_server(&config).await?;
        self.reset();
        Ok(response)
    }
}

/// One editable line of the form popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Kind,
    Command,
    Arg(usize),
    Url,
    EnvKey(usize),
    EnvValue(usize),
    Description,
}

impl FormField {
    pub fn label(&self) -> String {
        match self {
            FormField::Name => "Name".to_string(),
            FormField::Kind => "Type".to_string(),
            FormField::Command => "Command".to_string(),
            FormField::Arg(i) => format!("Arg {}", i + 1),
            FormField::Url => "URL".to_string(),
            FormField::EnvKey(i) => format!("Env {} key", i + 1),
            FormField::EnvValue(i) => format!("Env {} value", i + 1),
            FormField::Description => "Description".to_string(),
        }
    }
}

impl ServerForm {
    /// Fields shown for the current server type, in display order
    pub fn fields(&self) -> Vec<FormField> {
        let mut fields = vec![FormField::Name, FormField::Kind];
        match self.kind {
            ServerKind::Command => {
                fields.push(FormField::Command);
                fields.extend((0..self.args.len()).map(FormField::Arg));
            }
            ServerKind::Http => fields.push(FormField::Url),
        }
        for i in 0..self.env.len() {
            fields.push(FormField::EnvKey(i));
            fields.push(FormField::EnvValue(i));
        }
        fields.push(FormField::Description);
        fields
    }

    /// Current text of a field; the type field shows the server kind
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Kind => self.kind.as_str(),
            FormField::Command => &self.command,
            FormField::Arg(i) => self.args.get(i).map_or("", String::as_str),
            FormField::Url => &self.url,
            FormField::EnvKey(i) => self.env.get(i).map_or("", |row| row.key.as_str()),
            FormField::EnvValue(i) => self.env.get(i).map_or("", |row| row.value.as_str()),
            FormField::Description => &self.description,
        }
    }

    fn text_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Name => Some(&mut self.name),
            FormField::Kind => None,
            FormField::Command => Some(&mut self.command),
            FormField::Arg(i) => self.args.get_mut(i),
            FormField::Url => Some(&mut self.url),
            FormField::EnvKey(i) => self.env.get_mut(i).map(|row| &mut row.key),
            FormField::EnvValue(i) => self.env.get_mut(i).map(|row| &mut row.value),
            FormField::Description => Some(&mut self.description),
        }
    }
}

/// Add-server popup: the form plus keyboard focus and submission state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormEditor {
    pub form: ServerForm,
    pub focus: usize,
    pub submitting: bool,
}

impl FormEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> FormField {
        let fields = self.form.fields();
        fields
            .get(self.focus)
            .or(fields.last())
            .copied()
            .unwrap_or(FormField::Name)
    }

    pub fn focus_next(&mut self) {
        let len = self.form.fields().len();
        self.focus = (self.focus + 1) % len;
    }

    pub fn focus_previous(&mut self) {
        let len = self.form.fields().len();
        self.focus = self.focus.checked_sub(1).unwrap_or(len - 1);
    }

    fn focus_on(&mut self, field: FormField) {
        if let Some(index) = self.form.fields().iter().position(|f| *f == field) {
            self.focus = index;
        }
    }

    fn clamp_focus(&mut self) {
        let len = self.form.fields().len();
        self.focus = self.focus.min(len - 1);
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(text) = self.form.text_mut(self.focused()) {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.form.text_mut(self.focused()) {
            text.pop();
        }
    }

    /// Switch between command and http while the type field has focus
    pub fn toggle_kind(&mut self) {
        if self.focused() != FormField::Kind {
            return;
        }
        self.form.kind = match self.form.kind {
            ServerKind::Command => ServerKind::Http,
            ServerKind::Http => ServerKind::Command,
        };
    }

    /// Append an argument row (command servers only) and focus it
    pub fn add_arg_row(&mut self) {
        if self.form.kind != ServerKind::Command {
            return;
        }
        self.form.add_arg();
        self.focus_on(FormField::Arg(self.form.args.len() - 1));
    }

    /// Append an env row and focus its key
    pub fn add_env_row(&mut self) {
        self.form.add_env();
        self.focus_on(FormField::EnvKey(self.form.env.len() - 1));
    }

    /// Remove the argument or env row under the cursor
    pub fn remove_focused_row(&mut self) {
        match self.focused() {
            FormField::Arg(i) => self.form.remove_arg(i),
            FormField::EnvKey(i) | FormField::EnvValue(i) => self.form.remove_env(i),
            _ => return,
        }
        self.clamp_focus();
    }

    /// Snapshot to submit, or `None` while a submission is in flight
    pub fn begin_submit(&mut self) -> Option<ServerForm> {
        if self.submitting {
            return None;
        }
        self.submitting = true;
        Some(self.form.clone())
    }
}
