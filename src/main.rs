//! # integration-sync
//!
//! Command-line entry point: provisions, rotates and resets a CloudWatch
//! integration together with the trust policy of the IAM role it assumes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use integration_sync::auth::{SessionAuthenticator, SessionClient};
use integration_sync::config::{AppConfig, ConfigLoader, ConfigOverrides};
use integration_sync::http::build_http_client;
use integration_sync::lifecycle::{DeletionStatus, TrustRevert};
use integration_sync::models::Binding;
use integration_sync::registry::IntegrationClient;
use integration_sync::store::{BindingStore, ShellEnvBindingStore};
use integration_sync::telemetry;
use integration_sync::trust_policy::IamRolePolicyApi;
use integration_sync::{Components, LifecycleError, LifecycleSettings, Orchestrator};

/// Keep a CloudWatch integration and its IAM trust policy in step
#[derive(Parser)]
#[command(name = "integration-sync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Directory holding the layered .env files
    #[arg(long, global = true, env = "SYNC_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Profile selecting .env.{profile} files
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Log filter, e.g. `debug` or `integration_sync=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format: pretty or json
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// API base URL, overriding the one derived from the realm
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Shell file holding the binding between runs
    #[arg(long, global = true)]
    binding_file: Option<PathBuf>,

    /// Account email used to open the API session
    #[arg(long, global = true)]
    email: Option<String>,

    /// Account password used to open the API session
    #[arg(long, global = true)]
    password: Option<String>,

    /// Organization the session is opened for
    #[arg(long, global = true)]
    org_id: Option<String>,

    /// Realm hosting the organization, e.g. `us1`
    #[arg(long, global = true)]
    realm: Option<String>,

    /// Name of the integration
    #[arg(long, global = true)]
    name: Option<String>,

    /// Access token name the integration reports under
    #[arg(long, global = true)]
    named_token: Option<String>,

    /// AWS regions to poll; repeat the flag or separate with commas
    #[arg(long, global = true, value_delimiter = ',')]
    regions: Vec<String>,

    /// AWS account the SaaS side assumes the role from
    #[arg(long, global = true)]
    sfx_aws_account_arn: Option<String>,

    /// IAM role whose trust policy follows the integration
    #[arg(long, global = true)]
    role_arn: Option<String>,

    /// Placeholder external id the trust policy holds while unbound
    #[arg(long, global = true)]
    default_external_id: Option<String>,

    /// Integration id to act on instead of the stored one
    #[arg(long, global = true)]
    integration_id: Option<String>,

    /// External id to act on instead of the stored one
    #[arg(long, global = true)]
    external_id: Option<String>,
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            api_base: self.api_base.clone(),
            binding_file: self.binding_file.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            org_id: self.org_id.clone(),
            realm: self.realm.clone(),
            integration_name: self.name.clone(),
            token_name: self.named_token.clone(),
            regions: self.regions.clone(),
            sfx_aws_account_arn: self.sfx_aws_account_arn.clone(),
            role_arn: self.role_arn.clone(),
            default_external_id: self.default_external_id.clone(),
            integration_id: self.integration_id.clone(),
            external_id: self.external_id.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Open a session and print the access token
    Login,

    /// Show the stored binding
    Status,

    /// Print the resolved configuration with secrets redacted
    Config,

    /// Create the integration and bind the role's trust policy to it
    Provision,

    /// Bind the trust policy for an integration left provisioned
    Sync,

    /// Push the configured integration fields, keeping the external id
    Rotate,

    /// Delete the integration and revert the trust policy to the placeholder
    Reset,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<LifecycleError>() {
            Some(failure) => {
                report_failure(failure);
                std::process::exit(failure.exit_code());
            }
            None => {
                eprintln!("error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let loader = match cli.global.config_dir.clone() {
        Some(dir) => ConfigLoader::with_base_dir(dir),
        None => ConfigLoader::new(),
    }
    .with_profile(cli.global.profile.clone());

    let mut config = loader.load().map_err(LifecycleError::from)?;
    config
        .apply_overrides(cli.global.overrides())
        .map_err(LifecycleError::from)?;

    telemetry::init_tracing(&config)?;

    let store = ShellEnvBindingStore::new(&config.binding_file);

    match cli.command {
        Command::Config => {
            println!("{}", config.redacted_json()?);
        }
        Command::Status => match store.load().await.map_err(LifecycleError::from)? {
            Some(binding) => print_binding(&binding, &store.location()),
            None => println!("No binding recorded in {}", store.location()),
        },
        Command::Login => {
            let identity = config.session_identity().map_err(LifecycleError::from)?;
            let token = session_client(&config)?
                .authenticate(&identity)
                .await
                .map_err(LifecycleError::from)?;
            println!("{}", token.expose());
        }
        command => run_lifecycle(command, &config, store).await?,
    }

    Ok(())
}

async fn run_lifecycle(
    command: Command,
    config: &AppConfig,
    store: ShellEnvBindingStore,
) -> Result<(), LifecycleError> {
    let needs_identity = !matches!(command, Command::Sync);
    let settings = LifecycleSettings {
        identity: if needs_identity {
            Some(config.session_identity()?)
        } else {
            None
        },
        target: Some(config.role_target()?),
        integration_id_override: config.integration_id.clone(),
        external_id_override: config.external_id.clone(),
    };
    let shape = match command {
        Command::Provision | Command::Rotate => Some(config.integration_shape()?),
        _ => None,
    };

    // Sync never calls the SaaS API, so it does not need a realm.
    let api_base = if needs_identity {
        config.api_base_url()?
    } else {
        config.api_base_url().unwrap_or_default()
    };

    let http = build_http_client(config.http_timeout())
        .map_err(integration_sync::auth::AuthError::from)?;
    let components = Components {
        auth: Arc::new(session_client_with(http.clone(), config)),
        registry: Arc::new(IntegrationClient::new(http, api_base)),
        role_policies: Arc::new(IamRolePolicyApi::from_env().await),
        store: Arc::new(store),
    };
    let location = components.store.location();
    let orchestrator = Orchestrator::new(components, settings);

    match (command, shape) {
        (Command::Provision, Some(shape)) => {
            let report = orchestrator.provision(&shape).await?;
            println!(
                "Provisioned integration {} with external id {}",
                report.binding.integration_id, report.binding.current_external_id
            );
            println!(
                "Trust policy of {} updated ({} statement(s))",
                report.trust.role_name, report.trust.statements_rewritten
            );
            print_binding(&report.binding, &location);
        }
        (Command::Rotate, Some(shape)) => {
            let report = orchestrator.rotate(&shape).await?;
            println!("Updated integration {}", report.binding.integration_id);
            print_binding(&report.binding, &location);
        }
        (Command::Sync, _) => {
            let report = orchestrator.sync().await?;
            println!(
                "Trust policy of {} bound to external id {}",
                report.trust.role_name, report.binding.current_external_id
            );
            print_binding(&report.binding, &location);
        }
        (Command::Reset, _) => {
            let report = orchestrator.reset().await?;
            match &report.deletion {
                DeletionStatus::Deleted => {
                    println!("Deleted integration {}", report.binding.integration_id)
                }
                DeletionStatus::Rejected { status, body } => println!(
                    "Integration {} was not deleted (status {}): {}",
                    report.binding.integration_id, status, body
                ),
                DeletionStatus::Failed { message } => println!(
                    "Integration {} was not deleted: {}",
                    report.binding.integration_id, message
                ),
            }
            match &report.trust {
                TrustRevert::Reverted(trust) => println!(
                    "Trust policy of {} reverted to the default external id",
                    trust.role_name
                ),
                TrustRevert::AlreadyDefault => {
                    println!("Trust policy already held the default external id")
                }
            }
            print_binding(&report.binding, &location);
        }
        _ => {}
    }

    Ok(())
}

fn session_client(config: &AppConfig) -> Result<SessionClient, LifecycleError> {
    let http = build_http_client(config.http_timeout())
        .map_err(integration_sync::auth::AuthError::from)?;
    Ok(session_client_with(http, config))
}

fn session_client_with(http: reqwest::Client, config: &AppConfig) -> SessionClient {
    match config.api_base.as_deref() {
        Some(base) => SessionClient::with_api_base(http, base),
        None => SessionClient::new(http),
    }
}

fn print_binding(binding: &Binding, location: &str) {
    println!("Binding ({})", location);
    println!("  state:          {}", binding.state);
    println!("  integration id: {}", binding.integration_id);
    println!("  external id:    {}", binding.current_external_id);
    if !binding.role_arn.is_empty() {
        println!("  role:           {}", binding.role_arn);
    }
    if let Some(updated_at) = binding.updated_at {
        println!("  updated at:     {}", updated_at.to_rfc3339());
    }
}

fn report_failure(err: &LifecycleError) {
    eprintln!("error [{}]: {}", err.category(), err);
    if let Some((integration_id, external_id)) = err.partial_ids() {
        eprintln!("The integration exists but its trust policy is not bound:");
        eprintln!("  INTEGRATION_ID={}", integration_id);
        eprintln!("  EXTERNAL_ID={}", external_id);
        eprintln!("Run `integration-sync sync` to finish binding the trust policy.");
    } else if let Some(integration_id) = err.created_integration_id() {
        eprintln!("The integration exists but no external id was returned for it:");
        eprintln!("  INTEGRATION_ID={}", integration_id);
        eprintln!("Delete it or look up its external id before provisioning again.");
    }
}
