mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use catalog::{builtins, Catalog};
use clap::{Parser, Subcommand};
use oauth::{AuthFlow, CredentialResolver, HttpTokenEndpoint, RefreshManager};
use runtime::{project_safe, SessionId, SnapshotStore};
use storage::{AgentId, BindingStore};
use uuid::Uuid;

use config::Config;
use error::{Error, Result};

#[derive(Parser)]
#[command(name = "capstan")]
#[command(about = "Tool integration layer for realtime conversational agents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "capstan.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered tools and their actions
    Tools,
    /// Show an agent's bindings (safe view, no secrets)
    Bindings {
        /// Agent ID
        #[arg(short, long)]
        agent: String,
    },
    /// Generate a fresh agent ID
    NewAgent,
    /// Connect a tool to an agent
    Connect {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        tool: String,
        /// Non-secret binding settings, as a JSON object
        #[arg(long, default_value = "{}")]
        config: String,
    },
    /// Complete an OAuth authorization with the returned code
    Complete {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        tool: String,
        #[arg(long)]
        code: String,
    },
    /// Disconnect a tool from an agent
    Disconnect {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        tool: String,
    },
    /// Update a binding's configuration
    Update {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        tool: String,
        /// Replace the binding's settings with this JSON object
        #[arg(long)]
        config: Option<String>,
        /// Enable or disable the whole binding
        #[arg(long)]
        enabled: Option<bool>,
        /// Hide an action from future sessions (repeatable)
        #[arg(long)]
        disable_action: Vec<String>,
        /// Expose a previously hidden action again (repeatable)
        #[arg(long)]
        enable_action: Vec<String>,
    },
    /// Run token refresh, once or as a daemon
    Refresh {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Start a demo session: print its schemas, optionally invoke an action
    Call {
        #[arg(short, long)]
        agent: String,
        /// Session ID (defaults to a fresh one)
        #[arg(short, long)]
        session: Option<String>,
        /// Qualified action name, e.g. messaging.send_message
        #[arg(long)]
        action: Option<String>,
        /// Arguments for the action, as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let catalog = Arc::new(builtins::default_catalog()?);
    let store = Arc::new(BindingStore::open(&config.database.path)?);
    let resolver = CredentialResolver::new(config.providers.clone());

    match cli.command {
        Commands::Tools => cmd_tools(&catalog),
        Commands::Bindings { agent } => cmd_bindings(&catalog, &store, &agent),
        Commands::NewAgent => {
            println!("{}", AgentId::new());
            Ok(())
        }
        Commands::Connect {
            agent,
            tool,
            config,
        } => cmd_connect(&catalog, &store, resolver, &agent, &tool, &config),
        Commands::Complete { agent, tool, code } => {
            cmd_complete(&catalog, &store, resolver, &agent, &tool, &code).await
        }
        Commands::Disconnect { agent, tool } => {
            store.disconnect_tool(parse_agent(&agent)?, &tool)?;
            println!("Disconnected {tool}");
            Ok(())
        }
        Commands::Update {
            agent,
            tool,
            config,
            enabled,
            disable_action,
            enable_action,
        } => cmd_update(
            &store,
            &agent,
            &tool,
            config.as_deref(),
            enabled,
            &disable_action,
            &enable_action,
        ),
        Commands::Refresh { once } => cmd_refresh(catalog, store, resolver, &config, once).await,
        Commands::Call {
            agent,
            session,
            action,
            args,
        } => cmd_call(catalog, store, &agent, session, action.as_deref(), &args).await,
    }
}

fn parse_agent(raw: &str) -> Result<AgentId> {
    raw.parse()
        .map_err(|_| Error::InvalidArgument(format!("agent id {raw} is not a UUID")))
}

fn parse_object(raw: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(Error::InvalidArgument("expected a JSON object".into()));
    }
    Ok(value)
}

fn cmd_tools(catalog: &Catalog) -> Result<()> {
    for definition in catalog.list() {
        let auth = match &definition.auth_provider {
            Some(provider) => format!(" (auth: {provider})"),
            None => String::new(),
        };
        println!("{}{auth}", definition.name);
        for action in &definition.actions {
            let params: Vec<String> = action
                .parameters
                .iter()
                .map(|p| {
                    if p.required {
                        format!("{}: {}", p.name, p.ty)
                    } else {
                        format!("[{}: {}]", p.name, p.ty)
                    }
                })
                .collect();
            println!("  {}({})  {}", action.name, params.join(", "), action.description);
        }
    }
    Ok(())
}

fn cmd_bindings(catalog: &Catalog, store: &BindingStore, agent: &str) -> Result<()> {
    let agent = parse_agent(agent)?;
    let bindings = store.list_for_agent(agent)?;
    if bindings.is_empty() {
        println!("No tools connected.");
        return Ok(());
    }
    for binding in bindings {
        match catalog.get(&binding.tool_name) {
            Ok(tool) => {
                let view = project_safe(&binding, &tool.definition);
                println!("{}", serde_json::to_string_pretty(&view)?);
            }
            Err(_) => println!("{} (not in catalog)", binding.tool_name),
        }
    }
    Ok(())
}

fn cmd_connect(
    catalog: &Catalog,
    store: &BindingStore,
    resolver: CredentialResolver,
    agent: &str,
    tool: &str,
    config: &str,
) -> Result<()> {
    let agent = parse_agent(agent)?;
    let definition = &catalog.get(tool)?.definition;
    let binding = store.connect_tool(agent, tool, parse_object(config)?)?;
    println!("Connected {} to agent {agent}", binding.tool_name);

    if let Some(provider) = &definition.auth_provider {
        let (ok, missing) = resolver.validate(provider);
        if !ok {
            println!(
                "Provider {provider} is not configured; set {} and re-run connect",
                missing.join(", ")
            );
            return Ok(());
        }
        let flow = AuthFlow::new(resolver, Arc::new(HttpTokenEndpoint::new()));
        let state = Uuid::new_v4().to_string();
        let url = flow.authorization_url(provider, &state)?;
        println!("Authorize at:\n  {url}");
        println!("Then run: capstan complete --agent {agent} --tool {tool} --code <code>");
    }
    Ok(())
}

async fn cmd_complete(
    catalog: &Catalog,
    store: &BindingStore,
    resolver: CredentialResolver,
    agent: &str,
    tool: &str,
    code: &str,
) -> Result<()> {
    let agent = parse_agent(agent)?;
    let definition = &catalog.get(tool)?.definition;
    let provider = definition.auth_provider.as_deref().ok_or_else(|| {
        Error::InvalidArgument(format!("tool {tool} does not require authorization"))
    })?;

    let flow = AuthFlow::new(resolver, Arc::new(HttpTokenEndpoint::new()));
    let binding = flow.complete(store, agent, tool, provider, code).await?;
    println!(
        "Authorized {tool}; token expires at {}",
        binding
            .token_expires_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown".into())
    );
    Ok(())
}

fn cmd_update(
    store: &BindingStore,
    agent: &str,
    tool: &str,
    config: Option<&str>,
    enabled: Option<bool>,
    disable_actions: &[String],
    enable_actions: &[String],
) -> Result<()> {
    let agent = parse_agent(agent)?;
    let mut binding =
        store
            .read_binding(agent, tool)?
            .ok_or_else(|| storage::Error::BindingNotFound {
                agent_id: agent.to_string(),
                tool_name: tool.to_string(),
            })?;

    if let Some(config) = config {
        binding.config = parse_object(config)?;
    }
    if let Some(enabled) = enabled {
        binding.enabled = enabled;
    }
    for action in disable_actions {
        binding.disabled_actions.insert(action.clone());
    }
    for action in enable_actions {
        binding.disabled_actions.remove(action);
    }

    store.write_binding(&binding)?;
    println!("Updated {tool}. Changes apply to sessions started from now on.");
    Ok(())
}

async fn cmd_refresh(
    catalog: Arc<Catalog>,
    store: Arc<BindingStore>,
    resolver: CredentialResolver,
    config: &Config,
    once: bool,
) -> Result<()> {
    let manager = Arc::new(RefreshManager::new(
        store,
        catalog,
        resolver,
        Arc::new(HttpTokenEndpoint::new()),
        config.refresh_policy(),
    ));

    if once {
        manager.run_cycle().await;
    } else {
        println!("Refreshing every {}s. Ctrl+C to stop.", config.refresh.interval_secs);
        manager.run().await;
    }
    Ok(())
}

async fn cmd_call(
    catalog: Arc<Catalog>,
    store: Arc<BindingStore>,
    agent: &str,
    session: Option<String>,
    action: Option<&str>,
    args: &str,
) -> Result<()> {
    let agent = parse_agent(agent)?;
    let session = SessionId::new(session.unwrap_or_else(|| Uuid::new_v4().to_string()));

    let snapshots = SnapshotStore::new(catalog, store);
    let snapshot = snapshots.start(agent, session.clone()).await?;

    println!("Session {session} ({} actions):", snapshot.schemas().len());
    for schema in snapshot.schemas() {
        println!("{}", serde_json::to_string_pretty(schema)?);
    }

    if let Some(action) = action {
        let args = match parse_object(args)? {
            serde_json::Value::Object(map) => map,
            _ => unreachable!("parse_object only returns objects"),
        };
        let outcome = snapshots.dispatch(&session, action, args).await?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    snapshots.end(&session).await;
    Ok(())
}
