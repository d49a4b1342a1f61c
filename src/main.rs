#[macro_use]
extern crate log;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::{env, fs, thread};

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::Env;
use structopt::StructOpt;
use toml::Value;

use oramig::args::{Args, Command};
use oramig::common::helpers::print_error_chain;
use oramig::config::Config;
use oramig::connection::{DatabaseConnectionFactory, OracleConnection, SqlRunner};
use oramig::migrate::migrator::{ObjectMigrator, Operation};
use oramig::prepare::preparer::Preparer;
use oramig::prepare::template::parameter_scope;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    if let Err(errors) = init().await.with_context(|| "Run failed") {
        print_error_chain(&errors);
        std::process::exit(1);
    }

    Ok(())
}

async fn init() -> Result<()> {
    let options = Args::from_args();

    initialize_logger(options.verbose, options.quiet);

    // Parse config
    let config = load_config(&options.config).context("Failed to load config file")?;

    match options.command {
        Command::Prepare {
            environment,
            dry_run,
        } => run_prepare(&config, environment, dry_run),
        command => run_migration(&config, command).await,
    }
}

fn run_prepare(config: &Config, environment: Option<String>, dry_run: bool) -> Result<()> {
    let environment = environment.unwrap_or_else(|| config.migration().environment.clone());

    if environment.is_empty() {
        info!("Preparing sources with top-level parameters");
    } else {
        info!("Preparing sources for environment: {}", environment);
    }

    let scope = parameter_scope(&environment, config.params());
    debug!("Total parameters in scope: {}", scope.len());

    let preparer = Preparer::new(config.migration().paths.clone(), scope)?;
    preparer.run(dry_run)?;

    Ok(())
}

async fn run_migration(config: &Config, command: Command) -> Result<()> {
    info!("Initializing connection...");

    let factory = DatabaseConnectionFactory::<OracleConnection>::new(config.oracle().clone());
    let connection = factory
        .create_connection()
        .await
        .context("Failed to connect to the database")?;
    let runner: Arc<dyn SqlRunner> = Arc::new(connection);

    let migrator = ObjectMigrator::new(runner, config.migration())?;

    match command {
        Command::Create { kind, names } => {
            migrator.run_objects(&Operation::Create, kind, &names).await?
        }
        Command::Update {
            version,
            kind,
            names,
        } => {
            migrator
                .run_objects(&Operation::Update { version }, kind, &names)
                .await?
        }
        Command::Undo {
            version,
            kind,
            names,
        } => {
            migrator
                .run_objects(&Operation::Undo { version }, kind, &names)
                .await?
        }
        Command::Drop { kind, names } => {
            migrator.run_objects(&Operation::Drop, kind, &names).await?
        }
        Command::DropTable { tables } => migrator.drop_tables(&tables).await?,
        Command::RegenSeq { table, column } => {
            migrator.regenerate_sequence(&table, &column).await?
        }
        Command::Prepare { .. } => unreachable!("prepare runs before a connection is made"),
    }

    Ok(())
}

fn initialize_logger(verbose: bool, quiet: bool) {
    // Set the `RUST_LOG` environment variable to control the logging level

    if quiet {
        env::set_var("RUST_LOG", "warn");
    } else {
        env::set_var("RUST_LOG", if verbose { "debug" } else { "info" });
    }

    // Initialize the logger with the desired format and additional configuration
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let timestamp = Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "{} {:<5} [{}] - {}",
                timestamp,
                record.level(),
                thread::current().name().unwrap_or("<unnamed>"),
                record.args()
            )
        })
        .init();
}

fn load_config(config_file: &Path) -> Result<Config> {
    let content = fs::read_to_string(config_file)?;
    let value = content.parse::<Value>()?;
    let config = Config::from_toml(value)?;
    Ok(config)
}
