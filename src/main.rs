use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::UnboundedSender;
use tracing_subscriber::EnvFilter;

use mcpdash::api::models::{AgentConfig, Approach, QueryResponse, Role, ServerKind};
use mcpdash::api::GatewayClient;
use mcpdash::app::{App, DeleteTarget, Tab};
use mcpdash::chat::Message;
use mcpdash::config::Config;
use mcpdash::event::{AppEvent, EventHandler};
use mcpdash::form::{EnvRow, FormField, ServerForm};
use mcpdash::{mock, ui};

#[derive(Parser)]
#[command(
    name = "mcpdash",
    about = "Operator console for an MCP orchestration backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Backend base URL, overrides the config file
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive dashboard
    Dashboard,

    /// Submit a natural-language query
    Query {
        /// Query text
        text: String,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,

        #[arg(short, long, value_enum)]
        approach: Option<Approach>,

        /// Print the raw response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage conversation sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage the MCP server registry
    Servers {
        #[command(subcommand)]
        action: ServerAction,
    },

    /// Manage the agent registry
    Agents {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Serve an in-memory mock backend
    Mock {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Create a new session
    New {
        #[arg(short, long, value_enum)]
        approach: Option<Approach>,
    },
    /// Clear a session's history
    Clear {
        id: String,
        #[arg(short, long, value_enum)]
        approach: Option<Approach>,
    },
    /// Show a session's history
    Show {
        id: String,
        #[arg(short, long, value_enum)]
        approach: Option<Approach>,
    },
    /// List sessions
    List {
        #[arg(short, long, value_enum)]
        approach: Option<Approach>,
    },
}

#[derive(Subcommand)]
enum ServerAction {
    /// List registered servers
    List,
    /// Register a server
    Add(AddServerArgs),
    /// Remove a server
    Rm { name: String },
    /// Re-list servers on the dashboard refresh interval until Ctrl-C
    Watch,
}

#[derive(Args)]
struct AddServerArgs {
    /// Unique server name
    name: String,

    #[arg(long = "type", value_enum, default_value = "command")]
    kind: ServerKind,

    /// Command to launch (command servers)
    #[arg(long)]
    command: Option<String>,

    /// Command argument, repeatable
    #[arg(long = "arg", allow_hyphen_values = true)]
    args: Vec<String>,

    /// Server URL (http servers)
    #[arg(long)]
    url: Option<String>,

    /// Environment variable as KEY=VALUE, repeatable
    #[arg(long = "env", value_parser = parse_env)]
    env: Vec<(String, String)>,

    #[arg(short, long)]
    description: Option<String>,
}

#[derive(Subcommand)]
enum AgentAction {
    /// List registered agents
    List,
    /// Register an agent
    Add(AddAgentArgs),
    /// Remove an agent
    Rm { name: String },
}

#[derive(Args)]
struct AddAgentArgs {
    name: String,

    /// Human-readable name, defaults to the agent name
    #[arg(long)]
    display_name: Option<String>,

    #[arg(short, long, default_value = "")]
    description: String,

    #[arg(short, long, default_value = "")]
    instructions: String,

    /// Capability, repeatable
    #[arg(long = "capability")]
    capabilities: Vec<String>,

    /// MCP server the agent depends on
    #[arg(long)]
    mcp_server: Option<String>,
}

fn parse_env(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| Config::default_path().to_string_lossy().into_owned());
    let mut config = Config::load(&config_path)?;
    if let Some(base_url) = cli.base_url {
        config.gateway.base_url = base_url;
    }

    let command = cli.command.unwrap_or(Commands::Dashboard);
    match &command {
        Commands::Dashboard => {}
        Commands::Mock { .. } => init_logging("info"),
        _ => init_logging("warn"),
    }

    let client = GatewayClient::from_config(&config.gateway)?;
    let default_approach = config.gateway.approach;
    let approach = |a: Option<Approach>| a.unwrap_or(default_approach);

    match command {
        Commands::Dashboard => run_dashboard(client, &config).await,
        Commands::Query {
            text,
            session,
            approach: a,
            json,
        } => run_query(&client, &text, session.as_deref(), approach(a), json).await,
        Commands::Session { action } => match action {
            SessionAction::New { approach: a } => {
                let created = client.create_session(approach(a)).await?;
                println!("{}", created.session_id);
                Ok(())
            }
            SessionAction::Clear { id, approach: a } => {
                client.clear_session(&id, approach(a)).await?;
                println!("Cleared session: {}", id);
                Ok(())
            }
            SessionAction::Show { id, approach: a } => {
                let history = client.session_history(&id, approach(a)).await?;
                if history.messages.is_empty() {
                    println!("Session {} has no messages", history.session_id);
                }
                for entry in history.messages {
                    let label = match entry.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                    };
                    println!("{:>10}: {}", label, entry.content);
                }
                Ok(())
            }
            SessionAction::List { approach: a } => {
                let list = client.list_sessions(approach(a)).await?;
                if list.sessions.is_empty() {
                    println!("No sessions found");
                }
                for id in list.sessions {
                    println!("{}", id);
                }
                Ok(())
            }
        },
        Commands::Servers { action } => match action {
            ServerAction::List => list_servers(&client).await,
            ServerAction::Add(args) => add_server(&client, args).await,
            ServerAction::Rm { name } => {
                let response = client.delete_server(&name).await?;
                println!("{}", response.message);
                Ok(())
            }
            ServerAction::Watch => watch_servers(&client, config.dashboard.refresh_interval).await,
        },
        Commands::Agents { action } => match action {
            AgentAction::List => list_agents(&client).await,
            AgentAction::Add(args) => {
                let agent = AgentConfig {
                    display_name: args.display_name.unwrap_or_else(|| args.name.clone()),
                    name: args.name,
                    description: args.description,
                    instructions: args.instructions,
                    capabilities: args.capabilities,
                    requires_mcp: args.mcp_server.is_some(),
                    mcp_server: args.mcp_server,
                };
                let response = client.add_agent(&agent).await?;
                println!("{}", response.message);
                Ok(())
            }
            AgentAction::Rm { name } => {
                let response = client.delete_agent(&name).await?;
                println!("{}", response.message);
                Ok(())
            }
        },
        Commands::Mock { host, port } => {
            let mut mock_config = config.mock.clone();
            if let Some(host) = host {
                mock_config.host = host;
            }
            if let Some(port) = port {
                mock_config.port = port;
            }
            mock::start_server(&mock_config).await
        }
    }
}

async fn run_query(
    client: &GatewayClient,
    text: &str,
    session: Option<&str>,
    approach: Approach,
    json: bool,
) -> Result<()> {
    let started = Instant::now();
    let response = client.submit_query(text, session, approach).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }
    print_answer(response, started.elapsed());
    Ok(())
}

fn print_answer(response: QueryResponse, elapsed: Duration) {
    let agents = response.agents_used.clone().unwrap_or_default();
    let session = response.session_id.clone();
    let failed = response.success == Some(false);

    let message = Message::assistant(response, elapsed);
    for line in message.render_lines() {
        println!("{}", line);
    }
    println!();
    if !agents.is_empty() {
        println!("agents:  {}", agents.join(", "));
    }
    if let Some(session) = session {
        println!("session: {}", session);
    }
    println!("time:    {:.1}s", elapsed.as_secs_f64());
    if failed {
        eprintln!("backend reported the query as unsuccessful");
    }
}

async fn list_servers(client: &GatewayClient) -> Result<()> {
    let listing = client.list_servers().await?;
    let servers = listing.ordered();

    if servers.is_empty() {
        println!("No servers registered");
        return Ok(());
    }

    println!(
        "{:<20} {:<8} {:<12} {:<6} {}",
        "NAME", "TYPE", "STATUS", "TOOLS", "TARGET"
    );
    println!("{}", "-".repeat(72));

    for server in servers {
        let target = server
            .url
            .as_deref()
            .or(server.command.as_deref())
            .unwrap_or("");
        println!(
            "{:<20} {:<8} {:<12} {:<6} {}",
            server.name,
            server.kind.as_str(),
            server.status,
            server.tools_count,
            target
        );
    }

    Ok(())
}

async fn add_server(client: &GatewayClient, args: AddServerArgs) -> Result<()> {
    let mut form = ServerForm {
        name: args.name,
        kind: args.kind,
        command: args.command.unwrap_or_default(),
        args: args.args,
        url: args.url.unwrap_or_default(),
        env: args
            .env
            .into_iter()
            .map(|(key, value)| EnvRow { key, value })
            .collect(),
        description: args.description.unwrap_or_default(),
    };
    let response = form.submit(client).await?;
    println!("{}", response.message);
    Ok(())
}

async fn watch_servers(client: &GatewayClient, refresh_interval: u64) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(refresh_interval.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Each poll runs on its own; a slow one does not hold back the next
                let client = client.clone();
                tokio::spawn(async move {
                    let stamp = chrono::Local::now().format("%H:%M:%S");
                    match client.list_servers().await {
                        Ok(listing) => println!("[{}] {} servers: {}", stamp, listing.servers.len(), listing.servers.join(", ")),
                        Err(e) => eprintln!("[{}] Failed to fetch servers: {}", stamp, e),
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

async fn list_agents(client: &GatewayClient) -> Result<()> {
    let listing = client.list_agents().await?;
    let agents = listing.ordered();

    if agents.is_empty() {
        println!("No agents registered");
        return Ok(());
    }

    println!(
        "{:<20} {:<24} {:<9} {:<12} {}",
        "NAME", "DISPLAY NAME", "SOURCE", "MCP", "CAPABILITIES"
    );
    println!("{}", "-".repeat(80));

    for agent in agents {
        println!(
            "{:<20} {:<24} {:<9} {:<12} {}",
            agent.name,
            agent.display_name,
            agent.source.as_str(),
            agent.mcp_server.as_deref().unwrap_or("-"),
            agent.capabilities.join(", ")
        );
    }

    Ok(())
}

fn spawn_refresh(client: &GatewayClient, tx: &UnboundedSender<AppEvent>) {
    let (servers_client, servers_tx) = (client.clone(), tx.clone());
    tokio::spawn(async move {
        let _ = servers_tx.send(AppEvent::Servers(servers_client.list_servers().await));
    });
    let (agents_client, agents_tx) = (client.clone(), tx.clone());
    tokio::spawn(async move {
        let _ = agents_tx.send(AppEvent::Agents(agents_client.list_agents().await));
    });
}

fn spawn_query(
    client: &GatewayClient,
    tx: &UnboundedSender<AppEvent>,
    query: String,
    session: Option<String>,
    approach: Approach,
) {
    let (client, tx) = (client.clone(), tx.clone());
    tokio::spawn(async move {
        let started = Instant::now();
        let result = client
            .submit_query(&query, session.as_deref(), approach)
            .await;
        let _ = tx.send(AppEvent::Answer {
            result,
            elapsed: started.elapsed(),
        });
    });
}

fn spawn_add_server(client: &GatewayClient, tx: &UnboundedSender<AppEvent>, mut form: ServerForm) {
    let (client, tx) = (client.clone(), tx.clone());
    tokio::spawn(async move {
        let result = form.submit(&client).await;
        let _ = tx.send(AppEvent::ServerAdded(result));
    });
}

fn spawn_delete(client: &GatewayClient, tx: &UnboundedSender<AppEvent>, target: DeleteTarget) {
    let (client, tx) = (client.clone(), tx.clone());
    tokio::spawn(async move {
        let result = match target {
            DeleteTarget::Server(name) => client.delete_server(&name).await.map(|r| r.message),
            DeleteTarget::Agent(name) => client.delete_agent(&name).await.map(|r| r.message),
        };
        let _ = tx.send(AppEvent::Done(result));
    });
}

fn spawn_clear(
    client: &GatewayClient,
    tx: &UnboundedSender<AppEvent>,
    session_id: String,
    approach: Approach,
) {
    let (client, tx) = (client.clone(), tx.clone());
    tokio::spawn(async move {
        let result = client
            .clear_session(&session_id, approach)
            .await
            .map(|_| format!("Cleared session: {}", session_id));
        let _ = tx.send(AppEvent::Done(result));
    });
}

/// Apply one key press to the view state, spawning any requests it triggers
fn handle_key(
    key: KeyEvent,
    app: &mut App,
    client: &GatewayClient,
    tx: &UnboundedSender<AppEvent>,
) {
    // Handle confirmation dialog first
    if app.pending_delete.is_some() {
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            if let Some(target) = app.confirm_delete() {
                spawn_delete(client, tx, target);
            }
        }
        app.cancel_delete();
        return;
    }

    // Handle help popup
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.server_form.is_some() {
        handle_form_key(key, app, client, tx);
        return;
    }

    if app.input_mode {
        match key.code {
            KeyCode::Esc => app.input_mode = false,
            KeyCode::Enter => {
                if let Some((query, session)) = app.begin_query() {
                    spawn_query(client, tx, query, session, app.approach);
                }
            }
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.should_quit = true;
            }
            KeyCode::Char(c) => app.input.push(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Tab => app.next_tab(),
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            app.set_tab(Tab::ALL[index]);
        }
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.previous(),
        KeyCode::Char('r') => {
            spawn_refresh(client, tx);
            app.set_status("Refreshing...");
        }
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('a') if app.tab == Tab::Servers => app.open_server_form(),
        KeyCode::Char('?') => app.show_help = !app.show_help,
        KeyCode::Char('i') if app.tab == Tab::Chat => app.input_mode = true,
        KeyCode::Char('a') if app.tab == Tab::Chat => app.toggle_approach(),
        KeyCode::Char('c') if app.tab == Tab::Chat => {
            if let Some(session_id) = app.reset_conversation() {
                spawn_clear(client, tx, session_id, app.approach);
            }
        }
        _ => {}
    }
}

/// Keys while the add-server popup is open
fn handle_form_key(
    key: KeyEvent,
    app: &mut App,
    client: &GatewayClient,
    tx: &UnboundedSender<AppEvent>,
) {
    let Some(editor) = app.server_form.as_mut() else {
        return;
    };
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.close_server_form(),
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Char('a') if ctrl => editor.add_arg_row(),
        KeyCode::Char('e') if ctrl => editor.add_env_row(),
        KeyCode::Char('x') if ctrl => editor.remove_focused_row(),
        KeyCode::Enter => {
            if let Some(form) = editor.begin_submit() {
                spawn_add_server(client, tx, form);
            }
        }
        KeyCode::Tab | KeyCode::Down => editor.focus_next(),
        KeyCode::BackTab | KeyCode::Up => editor.focus_previous(),
        KeyCode::Left | KeyCode::Right => editor.toggle_kind(),
        KeyCode::Char(' ') if editor.focused() == FormField::Kind => editor.toggle_kind(),
        KeyCode::Backspace => editor.backspace(),
        KeyCode::Char(c) if !ctrl => editor.insert_char(c),
        _ => {}
    }
}

async fn run_dashboard(client: GatewayClient, config: &Config) -> Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.gateway.approach);
    let mut rng = rand::rng();

    // The first poll tick fires immediately and loads both registries
    let poll_rate = Duration::from_secs(config.dashboard.refresh_interval.max(1));
    let animation_rate = Duration::from_secs(config.dashboard.animation_interval.max(1));
    let mut events = EventHandler::new(poll_rate, animation_rate);
    let tx = events.sender();

    let result: Result<()> = async {
        loop {
            terminal.draw(|f| ui::render(f, &app))?;

            if let Some(event) = events.next().await {
                match event {
                    AppEvent::Key(key) => handle_key(key, &mut app, &client, &tx),
                    AppEvent::Poll => spawn_refresh(&client, &tx),
                    AppEvent::Animate => {
                        app.clear_status();
                        app.workflow.advance(&mut rng);
                    }
                    AppEvent::Resize(_, _) => {
                        // Terminal will handle resize automatically
                    }
                    AppEvent::Servers(result) => app.apply_servers(result),
                    AppEvent::Agents(result) => app.apply_agents(result),
                    AppEvent::Answer { result, elapsed } => app.apply_answer(result, elapsed),
                    AppEvent::ServerAdded(result) => {
                        if app.apply_server_added(result) {
                            spawn_refresh(&client, &tx);
                        }
                    }
                    AppEvent::Done(Ok(message)) => {
                        app.set_status(message);
                        spawn_refresh(&client, &tx);
                    }
                    AppEvent::Done(Err(e)) => app.set_status(format!("Error: {}", e)),
                }
            }

            if app.should_quit {
                return Ok(());
            }
        }
    }
    .await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    result
}
