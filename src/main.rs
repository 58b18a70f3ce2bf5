use clap::{Parser, Subcommand};
use pgsql_interface::{
    Config, ConnectionString, Error, InMemoryRegistry, PostgreSqlClient, RelationChanged, RemoteData, Result,
    StateManager,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "pgsql-interface")]
#[command(about = "Client side of the pgsql relation interface", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a libpq key=value connection string and print its properties
    Parse {
        connection_string: String,

        #[arg(long, help = "Print the password instead of masking it")]
        show_secrets: bool,
    },
    /// Deliver a relation-changed event carrying the given remote data
    RelationChanged {
        #[arg(long, default_value_t = 1, help = "Number of established relations")]
        relations: usize,

        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        data: Vec<(String, String)>,
    },
    /// Print the current master connection, or the status explaining why there is none
    Master {
        #[arg(long, default_value_t = 1, help = "Number of established relations")]
        relations: usize,
    },
    /// Forget the stored master
    Reset,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))?;
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    let config = match Config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(Error::Config(e.to_string()));
        }
    };

    info!(
        relation = %config.relation.name,
        state_path = ?config.state.path,
        "Configuration loaded"
    );

    let manager = StateManager::new(&config.state.path);

    match args.command {
        Command::Parse {
            connection_string,
            show_secrets,
        } => {
            let conn = ConnectionString::new(connection_string);
            let properties = if show_secrets {
                conn.properties().clone()
            } else {
                conn.redacted_properties()
            };
            println!("{}", serde_json::to_string_pretty(&properties)?);
        }
        Command::RelationChanged { relations, data } => {
            let snapshot: RemoteData = data.into_iter().collect();
            let (registry, first) = build_registry(&config, relations, snapshot);
            let relation = first.ok_or_else(|| {
                Error::Host(format!("no established relation on endpoint {}", config.relation.name))
            })?;

            let state = manager.load().await?.unwrap_or_default();
            let mut client = PostgreSqlClient::new(config.relation.name.clone(), state);

            let event = RelationChanged {
                relation,
                unit: config.relation.remote_unit.clone(),
            };
            if let Some(changed) = client.on_relation_changed(&registry, &event)? {
                manager.save(client.state()).await?;
                println!("{}", serde_json::to_string(&changed)?);
            }
        }
        Command::Master { relations } => {
            let state = manager.load().await?.unwrap_or_default();
            let client = PostgreSqlClient::new(config.relation.name.clone(), state);
            let (registry, _) = build_registry(&config, relations, RemoteData::new());

            match client.master(&registry) {
                Ok(conn) => println!("{}", serde_json::to_string_pretty(&conn.redacted_properties())?),
                Err(e) => match e.status() {
                    Some(status) => {
                        println!("{}", status);
                        std::process::exit(1);
                    }
                    None => return Err(e),
                },
            }
        }
        Command::Reset => manager.delete().await?,
    }

    Ok(())
}

/// Registry with `count` relations on the configured endpoint. The first one
/// belongs to the configured remote unit and carries `data`.
fn build_registry(
    config: &Config,
    count: usize,
    data: RemoteData,
) -> (InMemoryRegistry, Option<pgsql_interface::RelationHandle>) {
    let mut registry = InMemoryRegistry::new();
    let mut first = None;

    for i in 0..count {
        let id = if i == 0 {
            registry.create_relation(&config.relation.name, &config.relation.remote_unit, data.clone())
        } else {
            registry.create_relation(&config.relation.name, &format!("postgresql-{}/0", i), RemoteData::new())
        };
        if first.is_none() {
            first = registry.handle(id).cloned();
        }
    }

    (registry, first)
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("pgsql_interface=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pgsql_interface=warn,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}
