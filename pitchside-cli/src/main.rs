#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use pitchside_core::{
    Audience, Config, DispatchLog, Dispatcher, FcmAdapter, FcmConfig, InMemoryDispatchLog,
    InMemorySubscriberStore, LoggingAdapter, NotificationEvent, OneSignalAdapter, OneSignalConfig,
    Provider, RedbStorage, SubscriberStore, WebPushAdapter, WebPushConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pitchside")]
#[command(about = "Pitchside club notification service CLI", version)]
struct Cli {
    /// Override the platform data directory.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Keep all state in memory instead of opening the database.
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Subscribers {
        #[command(subcommand)]
        action: SubscriberAction,
    },
    Send {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        link: Option<String>,
        /// Restrict the audience; repeat for several users.
        #[arg(long = "user")]
        users: Vec<String>,
        /// Log deliveries instead of calling the push providers.
        #[arg(long)]
        dry_run: bool,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum SubscriberAction {
    List,
    Show {
        user_id: String,
    },
    RemoveChannel {
        user_id: String,
        provider: String,
    },
}

fn open_subscriber_store(
    in_memory: bool,
    config: &Config,
) -> Result<Arc<dyn SubscriberStore>, Box<dyn std::error::Error>> {
    if in_memory {
        return Ok(Arc::new(InMemorySubscriberStore::new()));
    }
    config.ensure_data_dir()?;
    let storage = RedbStorage::open(config.db_path())?;
    // The store keeps its own handle to the database.
    Ok(Arc::new(storage.subscriber_store()))
}

fn build_dispatcher(
    subscribers: Arc<dyn SubscriberStore>,
    config: &Config,
    dry_run: bool,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(subscribers).with_config(config.dispatch.clone());

    if dry_run {
        for provider in [Provider::WebPush, Provider::OneSignal, Provider::Fcm] {
            dispatcher.register_adapter(Arc::new(LoggingAdapter::new(provider)));
        }
        return dispatcher;
    }

    match WebPushConfig::from_env() {
        Some(config) => dispatcher.register_adapter(Arc::new(WebPushAdapter::new(config))),
        None => tracing::warn!("VAPID_PRIVATE_KEY not set, web push delivery disabled"),
    }
    match OneSignalConfig::from_env() {
        Some(config) => dispatcher.register_adapter(Arc::new(OneSignalAdapter::new(config))),
        None => tracing::warn!("ONESIGNAL_APP_ID not set, OneSignal delivery disabled"),
    }
    match FcmConfig::from_env() {
        Some(config) => dispatcher.register_adapter(Arc::new(FcmAdapter::new(config))),
        None => tracing::warn!("FCM_SERVICE_ACCOUNT not set, FCM delivery disabled"),
    }

    dispatcher
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = match cli.data_dir {
        Some(dir) => Config::default().with_data_dir(dir),
        None => Config::new()?,
    };

    let subscribers = open_subscriber_store(cli.memory, &config)?;

    match cli.command {
        Commands::Subscribers { action } => {
            handle_subscriber_action(action, &subscribers).await?
        }
        Commands::Send {
            title,
            body,
            icon,
            tag,
            link,
            users,
            dry_run,
        } => {
            let dispatcher = build_dispatcher(Arc::clone(&subscribers), &config, dry_run);

            let mut event = NotificationEvent::new(title, body);
            if let Some(icon) = icon {
                event = event.with_icon(icon);
            }
            if let Some(tag) = tag {
                event = event.with_tag(tag);
            }
            if let Some(link) = link {
                event = event.with_link(link);
            }
            if !users.is_empty() {
                event = event.with_audience(Audience::users(users));
            }

            match dispatcher.dispatch(event).await {
                Ok(report) => {
                    println!("Dispatch complete:");
                    println!("  Attempted: {}", report.attempted);
                    println!("  Delivered: {}", report.delivered);
                    println!("  Transient failures: {}", report.transient_failures);
                    println!("  Pruned addresses: {}", report.permanent_failures.len());
                }
                Err(e) => {
                    eprintln!("Dispatch failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Serve { host, port } => {
            let dispatch_log = Arc::new(InMemoryDispatchLog::new());
            let dispatcher = build_dispatcher(Arc::clone(&subscribers), &config, false)
                .with_dispatch_log(dispatch_log.clone() as Arc<dyn DispatchLog>);

            let state = pitchside_api::AppState::new(
                Arc::clone(&subscribers),
                Arc::new(dispatcher),
                dispatch_log as Arc<dyn DispatchLog>,
            );
            let app = pitchside_api::create_router(state);

            let host = host.unwrap_or_else(|| config.api.host.clone());
            let port = port.unwrap_or(config.api.port);
            let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
            println!("pitchside listening on http://{}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn handle_subscriber_action(
    action: SubscriberAction,
    store: &Arc<dyn SubscriberStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SubscriberAction::List => {
            let subscribers = store.list().await?;
            if subscribers.is_empty() {
                println!("No subscribers found");
            } else {
                for s in subscribers {
                    let providers: Vec<&str> =
                        s.channels.iter().map(|c| c.provider().as_str()).collect();
                    if providers.is_empty() {
                        println!("{} (no channels)", s.user_id);
                    } else {
                        println!("{} [{}]", s.user_id, providers.join(", "));
                    }
                }
            }
        }
        SubscriberAction::Show { user_id } => {
            if let Some(subscriber) = store.get(&user_id).await? {
                println!("{}", serde_json::to_string_pretty(&subscriber)?);
            } else {
                eprintln!("Subscriber not found: {}", user_id);
            }
        }
        SubscriberAction::RemoveChannel { user_id, provider } => {
            let provider: Provider = provider.parse()?;
            store.remove_channel(&user_id, provider).await?;
            println!("Removed {} channel for {}", provider, user_id);
        }
    }
    Ok(())
}
