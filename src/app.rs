use std::time::Duration;

use crate::api::models::{
    AgentInfo, AgentListing, Approach, QueryResponse, ServerInfo, ServerListing, ServerMutation,
};
use crate::api::GatewayError;
use crate::chat::Message;
use crate::form::{FormEditor, FormError};
use crate::workflow::WorkflowAnimation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Servers,
    Agents,
    Chat,
    Workflow,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Servers, Tab::Agents, Tab::Chat, Tab::Workflow];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Servers => "Servers",
            Tab::Agents => "Agents",
            Tab::Chat => "Chat",
            Tab::Workflow => "Workflow",
        }
    }

    pub fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

/// What a confirmed delete will remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Server(String),
    Agent(String),
}

/// Dashboard view state. Network calls happen elsewhere; results are fed in
/// through the `apply_*` methods.
pub struct App {
    pub tab: Tab,
    pub servers: Vec<ServerInfo>,
    pub servers_loading: bool,
    pub agents: Vec<AgentInfo>,
    pub agents_loading: bool,
    pub selected: usize,
    pub transcript: Vec<Message>,
    pub input: String,
    pub input_mode: bool,
    pub approach: Approach,
    pub session_id: Option<String>,
    pub awaiting_answer: bool,
    pub workflow: WorkflowAnimation,
    pub should_quit: bool,
    pub show_help: bool,
    /// Captured when the delete key is pressed; the popup confirms this item
    pub pending_delete: Option<DeleteTarget>,
    pub server_form: Option<FormEditor>,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(approach: Approach) -> Self {
        Self {
            tab: Tab::Servers,
            servers: Vec::new(),
            servers_loading: true,
            agents: Vec::new(),
            agents_loading: true,
            selected: 0,
            transcript: Vec::new(),
            input: String::new(),
            input_mode: false,
            approach,
            session_id: None,
            awaiting_answer: false,
            workflow: WorkflowAnimation::new(),
            should_quit: false,
            show_help: false,
            pending_delete: None,
            server_form: None,
            status_message: None,
        }
    }

    pub fn set_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.selected = 0;
        }
    }

    pub fn next_tab(&mut self) {
        self.set_tab(self.tab.next());
    }

    /// Apply a finished server listing. On failure the previous list stays.
    pub fn apply_servers(&mut self, result: Result<ServerListing, GatewayError>) {
        self.servers_loading = false;
        match result {
            Ok(listing) => {
                self.servers = listing.ordered().into_iter().cloned().collect();
                self.clamp_selection();
            }
            Err(e) => self.set_status(format!("Failed to fetch servers: {}", e)),
        }
    }

    pub fn apply_agents(&mut self, result: Result<AgentListing, GatewayError>) {
        self.agents_loading = false;
        match result {
            Ok(listing) => {
                self.agents = listing.ordered().into_iter().cloned().collect();
                self.clamp_selection();
            }
            Err(e) => self.set_status(format!("Failed to fetch agents: {}", e)),
        }
    }

    fn list_len(&self) -> usize {
        match self.tab {
            Tab::Servers => self.servers.len(),
            Tab::Agents => self.agents.len(),
            Tab::Chat | Tab::Workflow => 0,
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.list_len();
        if len > 0 && self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Move selection down
    pub fn next(&mut self) {
        let len = self.list_len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    /// Move selection up
    pub fn previous(&mut self) {
        let len = self.list_len();
        if len > 0 {
            self.selected = self.selected.checked_sub(1).unwrap_or(len - 1);
        }
    }

    pub fn selected_server(&self) -> Option<&ServerInfo> {
        self.servers.get(self.selected)
    }

    pub fn selected_agent(&self) -> Option<&AgentInfo> {
        self.agents.get(self.selected)
    }

    /// Item the delete key acts on in the current tab
    pub fn delete_target(&self) -> Option<DeleteTarget> {
        match self.tab {
            Tab::Servers => self
                .selected_server()
                .map(|s| DeleteTarget::Server(s.name.clone())),
            Tab::Agents => self
                .selected_agent()
                .map(|a| DeleteTarget::Agent(a.name.clone())),
            Tab::Chat | Tab::Workflow => None,
        }
    }

    /// Ask to delete the selected item. The target is fixed now so list
    /// refreshes while the popup is open cannot change what gets deleted.
    pub fn request_delete(&mut self) {
        self.pending_delete = self.delete_target();
    }

    /// Accept the confirmation, returning what to delete
    pub fn confirm_delete(&mut self) -> Option<DeleteTarget> {
        self.pending_delete.take()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Open the add-server popup (Servers tab only)
    pub fn open_server_form(&mut self) {
        if self.tab == Tab::Servers && self.server_form.is_none() {
            self.server_form = Some(FormEditor::new());
        }
    }

    pub fn close_server_form(&mut self) {
        self.server_form = None;
    }

    /// Apply a finished add-server submission. Success closes the popup and
    /// returns `true`; failure keeps every field for correction.
    pub fn apply_server_added(&mut self, result: Result<ServerMutation, FormError>) -> bool {
        match result {
            Ok(response) => {
                self.server_form = None;
                self.set_status(response.message);
                true
            }
            Err(e) => {
                if let Some(editor) = self.server_form.as_mut() {
                    editor.submitting = false;
                }
                self.set_status(format!("Error: {}", e));
                false
            }
        }
    }

    /// Take the typed query, record it in the transcript, and return what to
    /// send. `None` when the input is blank or an answer is still pending.
    pub fn begin_query(&mut self) -> Option<(String, Option<String>)> {
        let query = self.input.trim().to_string();
        if query.is_empty() || self.awaiting_answer {
            return None;
        }
        self.input.clear();
        self.transcript.push(Message::user(query.clone()));
        self.awaiting_answer = true;
        Some((query, self.session_id.clone()))
    }

    pub fn apply_answer(&mut self, result: Result<QueryResponse, GatewayError>, elapsed: Duration) {
        self.awaiting_answer = false;
        match result {
            Ok(response) => {
                if let Some(id) = response.session_id.clone().filter(|id| !id.is_empty()) {
                    self.session_id = Some(id);
                }
                self.transcript.push(Message::assistant(response, elapsed));
            }
            Err(e) => self.set_status(format!("Error: {}", e)),
        }
    }

    /// Sessions belong to one approach, so switching drops the current one
    pub fn toggle_approach(&mut self) {
        self.approach = self.approach.toggled();
        self.session_id = None;
        self.transcript.clear();
        self.set_status(format!("Approach: {}", self.approach));
    }

    /// Forget the local conversation; returns the id to clear on the backend
    pub fn reset_conversation(&mut self) -> Option<String> {
        self.transcript.clear();
        self.session_id.take()
    }

    /// Set status message
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Server counts: (command, http)
    pub fn server_counts(&self) -> (usize, usize) {
        use crate::api::models::ServerKind;
        let command = self
            .servers
            .iter()
            .filter(|s| s.kind == ServerKind::Command)
            .count();
        (command, self.servers.len() - command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{ServerKind, ServerListing};
    use crate::chat::Message;
    use std::collections::BTreeMap;

    fn server(name: &str, kind: ServerKind) -> ServerInfo {
        ServerInfo {
            name: name.to_string(),
            kind,
            description: String::new(),
            tools_count: 0,
            status: "configured".to_string(),
            url: None,
            command: None,
        }
    }

    fn listing(names: &[(&str, ServerKind)]) -> ServerListing {
        ServerListing {
            servers: names.iter().map(|(n, _)| n.to_string()).collect(),
            details: names
                .iter()
                .map(|(n, k)| (n.to_string(), server(n, *k)))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_apply_servers_and_counts() {
        let mut app = App::new(Approach::Approach2);
        assert!(app.servers_loading);
        app.apply_servers(Ok(listing(&[
            ("slack", ServerKind::Command),
            ("hubspot", ServerKind::Http),
        ])));
        assert!(!app.servers_loading);
        assert_eq!(app.servers.len(), 2);
        assert_eq!(app.server_counts(), (1, 1));
    }

    #[test]
    fn test_failed_poll_keeps_previous_list() {
        let mut app = App::new(Approach::Approach2);
        app.apply_servers(Ok(listing(&[("slack", ServerKind::Command)])));
        app.apply_servers(Err(GatewayError::request_failed(
            "Failed to fetch servers",
            None,
        )));
        assert_eq!(app.servers.len(), 1);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Failed to fetch servers: Failed to fetch servers")
        );
    }

    #[test]
    fn test_selection_wraps_and_clamps() {
        let mut app = App::new(Approach::Approach2);
        app.apply_servers(Ok(listing(&[
            ("a", ServerKind::Command),
            ("b", ServerKind::Command),
        ])));
        app.previous();
        assert_eq!(app.selected, 1);
        app.next();
        assert_eq!(app.selected, 0);
        app.selected = 1;
        app.apply_servers(Ok(listing(&[("a", ServerKind::Command)])));
        assert_eq!(app.selected, 0);
        assert_eq!(
            app.delete_target(),
            Some(DeleteTarget::Server("a".to_string()))
        );
    }

    #[test]
    fn test_delete_target_fixed_when_requested() {
        let mut app = App::new(Approach::Approach2);
        app.apply_servers(Ok(listing(&[
            ("a", ServerKind::Command),
            ("b", ServerKind::Command),
            ("c", ServerKind::Command),
        ])));
        app.selected = 2;
        app.request_delete();

        // A poll drops "c" while the popup is open and the selection clamps to "b"
        app.apply_servers(Ok(listing(&[
            ("a", ServerKind::Command),
            ("b", ServerKind::Command),
        ])));
        assert_eq!(app.selected, 1);

        assert_eq!(
            app.confirm_delete(),
            Some(DeleteTarget::Server("c".to_string()))
        );
        assert_eq!(app.pending_delete, None);
    }

    #[test]
    fn test_cancel_delete() {
        let mut app = App::new(Approach::Approach2);
        app.apply_servers(Ok(listing(&[("a", ServerKind::Command)])));
        app.request_delete();
        app.cancel_delete();
        assert_eq!(app.confirm_delete(), None);
    }

    #[test]
    fn test_server_form_only_on_servers_tab() {
        let mut app = App::new(Approach::Approach2);
        app.set_tab(Tab::Chat);
        app.open_server_form();
        assert!(app.server_form.is_none());
        app.set_tab(Tab::Servers);
        app.open_server_form();
        assert!(app.server_form.is_some());
    }

    #[test]
    fn test_server_form_failure_keeps_fields() {
        let mut app = App::new(Approach::Approach2);
        app.open_server_form();
        let editor = app.server_form.as_mut().unwrap();
        editor.form.name = "slack".to_string();
        editor.form.command = "npx".to_string();
        assert!(editor.begin_submit().is_some());

        let refresh = app.apply_server_added(Err(FormError::Gateway(
            GatewayError::request_failed("Server 'slack' already exists", None),
        )));
        assert!(!refresh);
        let editor = app.server_form.as_ref().unwrap();
        assert_eq!(editor.form.name, "slack");
        assert!(!editor.submitting);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Error: Server 'slack' already exists")
        );
    }

    #[test]
    fn test_server_form_success_closes() {
        let mut app = App::new(Approach::Approach2);
        app.open_server_form();
        let refresh = app.apply_server_added(Ok(ServerMutation {
            message: "Server 'slack' added".to_string(),
            success: true,
        }));
        assert!(refresh);
        assert!(app.server_form.is_none());
        assert_eq!(app.status_message.as_deref(), Some("Server 'slack' added"));

        app.open_server_form();
        assert_eq!(app.server_form, Some(FormEditor::new()));
    }

    #[test]
    fn test_begin_query_ignores_blank_and_pending() {
        let mut app = App::new(Approach::Approach2);
        app.input = "   ".to_string();
        assert_eq!(app.begin_query(), None);

        app.input = "list my deals".to_string();
        assert_eq!(
            app.begin_query(),
            Some(("list my deals".to_string(), None))
        );
        assert!(app.input.is_empty());
        assert_eq!(app.transcript.len(), 1);

        app.input = "again".to_string();
        assert_eq!(app.begin_query(), None);
    }

    #[test]
    fn test_answer_adopts_session_id() {
        let mut app = App::new(Approach::Approach2);
        app.input = "hi".to_string();
        app.begin_query();
        app.apply_answer(
            Ok(QueryResponse {
                result: Some("hello".to_string()),
                session_id: Some("s-42".to_string()),
                ..Default::default()
            }),
            Duration::from_millis(120),
        );
        assert_eq!(app.session_id.as_deref(), Some("s-42"));
        assert_eq!(app.transcript.len(), 2);
        assert!(!app.awaiting_answer);

        app.input = "next".to_string();
        assert_eq!(
            app.begin_query(),
            Some(("next".to_string(), Some("s-42".to_string())))
        );
    }

    #[test]
    fn test_failed_answer_reports_error() {
        let mut app = App::new(Approach::Approach2);
        app.transcript.push(Message::user("q"));
        app.awaiting_answer = true;
        app.apply_answer(
            Err(GatewayError::request_failed("orchestrator unavailable", None)),
            Duration::ZERO,
        );
        assert!(!app.awaiting_answer);
        assert_eq!(app.transcript.len(), 1);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Error: orchestrator unavailable")
        );
    }

    #[test]
    fn test_toggle_approach_drops_session() {
        let mut app = App::new(Approach::Approach2);
        app.session_id = Some("s".to_string());
        app.toggle_approach();
        assert_eq!(app.approach, Approach::Approach1);
        assert_eq!(app.session_id, None);
    }

    #[test]
    fn test_tab_cycle_resets_selection() {
        let mut app = App::new(Approach::Approach2);
        app.selected = 3;
        app.next_tab();
        assert_eq!(app.tab, Tab::Agents);
        assert_eq!(app.selected, 0);
        app.set_tab(Tab::Workflow);
        app.next_tab();
        assert_eq!(app.tab, Tab::Servers);
    }
}
