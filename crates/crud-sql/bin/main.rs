use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crud_sql::state::{self, State};
use crud_sql::{Params, Payload, RecordService};
use crud_sql_configuration::environment::ProcessEnvironment;
use crud_sql_configuration::{self as configuration, ParsedConfiguration};
use query_engine_execution::{Model, PostgresModel, PostgresOptions};
use query_engine_translation::translation::filter::{self, QueryFilter};
use query_engine_translation::translation::query as translation;

#[derive(Parser)]
#[command(author, version, about = "Find, create, change and remove records of SQL tables")]
struct Cli {
    /// The directory holding configuration.json
    #[arg(long, short, env = "CRUD_SQL_CONFIGURATION", default_value = ".")]
    configuration: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write an initial configuration into the configuration directory
    Initialize,
    /// Fill in the column types of every configured table from the database
    Introspect,
    /// Print the JSON schema of the configuration file
    PrintSchema,
    #[command(flatten)]
    Records(RecordCommand),
}

#[derive(Subcommand)]
enum RecordCommand {
    /// Find the records matching a query
    Find(Target),
    /// Get a record by id
    Get {
        #[command(flatten)]
        target: Target,
        id: String,
    },
    /// Create a record, or several from a JSON array
    Create {
        #[command(flatten)]
        target: Target,
        data: String,
    },
    /// Merge changes into a record, or into every record matching the query
    Patch {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        id: Option<String>,
        data: String,
    },
    /// Replace a record
    Update {
        #[command(flatten)]
        target: Target,
        id: String,
        data: String,
    },
    /// Remove a record, or every record matching the query
    Remove {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        id: Option<String>,
    },
    /// Print the SQL of a find and its query plan
    Explain(Target),
}

#[derive(Args)]
struct Target {
    /// The configured service to use
    service: String,
    /// The query filter, as a JSON object
    #[arg(long, short, default_value = "{}")]
    query: String,
    /// Run every statement of the operation in one transaction
    #[arg(long)]
    transaction: bool,
}

#[tokio::main]
pub async fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Initialize => {
            configuration::write_parsed_configuration(
                ParsedConfiguration::initial(),
                &cli.configuration,
            )
            .await?;
        }
        Command::Introspect => {
            let parsed = configuration::parse_configuration(&cli.configuration).await?;
            let introspected = configuration::configure(&parsed, ProcessEnvironment).await?;
            configuration::write_parsed_configuration(introspected, &cli.configuration).await?;
        }
        Command::PrintSchema => {
            let schema = schemars::schema_for!(ParsedConfiguration);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Command::Records(command) => {
            let parsed = configuration::parse_configuration(&cli.configuration).await?;
            let configuration =
                configuration::make_runtime_configuration(parsed, ProcessEnvironment)?;
            let mut metrics_registry = prometheus::Registry::new();
            let state = state::create_state(&configuration, &mut metrics_registry).await?;

            let output = run_record_command(&state, &configuration, command).await?;
            println!("{output}");
        }
    }
    Ok(())
}

async fn run_record_command(
    state: &State,
    configuration: &configuration::Configuration,
    command: RecordCommand,
) -> anyhow::Result<String> {
    match command {
        RecordCommand::Find(target) => {
            let (service, params) = prepare(state, configuration, &target).await?;
            let found = service.find(&params).await;
            finish(params, found).await
        }
        RecordCommand::Get { target, id } => {
            let (service, params) = prepare(state, configuration, &target).await?;
            let record = service.get(&parse_id(&id), &params).await;
            finish(params, record).await
        }
        RecordCommand::Create { target, data } => {
            let (service, params) = prepare(state, configuration, &target).await?;
            let created = service.create(parse_payload(&data)?, &params).await;
            finish(params, created).await
        }
        RecordCommand::Patch { target, id, data } => {
            let (service, params) = prepare(state, configuration, &target).await?;
            let id = id.as_deref().map(parse_id);
            let patched = service
                .patch(id.as_ref(), parse_payload(&data)?, &params)
                .await;
            finish(params, patched).await
        }
        RecordCommand::Update { target, id, data } => {
            let (service, params) = prepare(state, configuration, &target).await?;
            let updated = service
                .update(&parse_id(&id), parse_payload(&data)?, &params)
                .await;
            finish(params, updated).await
        }
        RecordCommand::Remove { target, id } => {
            let (service, params) = prepare(state, configuration, &target).await?;
            let id = id.as_deref().map(parse_id);
            let removed = service.remove(id.as_ref(), &params).await;
            finish(params, removed).await
        }
        RecordCommand::Explain(target) => {
            let (service, params) = prepare(state, configuration, &target).await?;
            let normalized =
                filter::parse(&params.query, &service.paginate(), service.id_field())?;
            let query = translation::translate(&normalized, service.model().table())?;
            let (sql, plan) = service.model().explain(&query, &params.options).await?;
            Ok(format!("{sql}\n\n{plan}"))
        }
    }
}

async fn prepare(
    state: &State,
    configuration: &configuration::Configuration,
    target: &Target,
) -> anyhow::Result<(RecordService<PostgresModel>, Params<PostgresOptions>)> {
    let service = state.service(configuration, &target.service)?;
    let query: QueryFilter = serde_json::from_str(&target.query)?;
    let transaction = if target.transaction {
        Some(service.model().begin().await?)
    } else {
        None
    };
    let params = Params::<()>::new(query).with_options(PostgresOptions {
        transaction,
        ..PostgresOptions::default()
    });
    Ok((service, params))
}

/// Commit the operation's transaction if it succeeded, and render its result.
async fn finish<T: serde::Serialize>(
    params: Params<PostgresOptions>,
    result: Result<T, crud_sql::Error>,
) -> anyhow::Result<String> {
    let result = result?;
    if let Some(transaction) = params.options.transaction {
        PostgresModel::commit(transaction).await?;
    }
    Ok(serde_json::to_string_pretty(&result)?)
}

/// An id given on the command line: JSON when it parses, a string otherwise.
fn parse_id(id: &str) -> Value {
    serde_json::from_str(id).unwrap_or_else(|_| Value::String(id.to_string()))
}

fn parse_payload(data: &str) -> anyhow::Result<Payload> {
    Ok(serde_json::from_str(data)?)
}
