// Operator CLI for the invitation vault

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use invitation_vault::config::{Config, StoreBackend};
use invitation_vault::core::models::{OrgId, OrgRole, SpaceId, SpaceRole};
use invitation_vault::services::{self, encryption_from_config, OnboardingService};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "invitation-vault", version, about = "Issue and redeem registration codes and pending access invitations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint a new security code for an email
    IssueCode { email: String },
    /// Show the record behind a code without consuming it
    Verify { code: String },
    /// Consume a code
    Redeem { code: String },
    /// Find the pending code for an email
    FindCode { email: String },
    /// Invite an email to an organization
    InviteOrg {
        email: String,
        org: String,
        #[arg(long = "role", value_enum, required = true)]
        roles: Vec<OrgRoleArg>,
    },
    /// Invite an email to a space
    InviteSpace {
        email: String,
        space: String,
        #[arg(long = "role", value_enum, required = true)]
        roles: Vec<SpaceRoleArg>,
    },
    /// Allow an email to create an organization once registered
    GrantOrgCreation { email: String },
    /// Show the pending access invitations for an email
    Show { email: String },
    /// List emails with pending access invitations
    Pending,
    /// Print the salted hash a key is stored under
    Hash { text: String },
}

impl Command {
    /// Subcommands that read or write stored records
    fn needs_shared_store(&self) -> bool {
        !matches!(self, Command::Hash { .. })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrgRoleArg {
    User,
    Manager,
    BillingManager,
    Auditor,
}

impl From<OrgRoleArg> for OrgRole {
    fn from(role: OrgRoleArg) -> Self {
        match role {
            OrgRoleArg::User => OrgRole::OrgUser,
            OrgRoleArg::Manager => OrgRole::OrgManager,
            OrgRoleArg::BillingManager => OrgRole::BillingManager,
            OrgRoleArg::Auditor => OrgRole::OrgAuditor,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SpaceRoleArg {
    Manager,
    Developer,
    Auditor,
}

impl From<SpaceRoleArg> for SpaceRole {
    fn from(role: SpaceRoleArg) -> Self {
        match role {
            SpaceRoleArg::Manager => SpaceRole::SpaceManager,
            SpaceRoleArg::Developer => SpaceRole::SpaceDeveloper,
            SpaceRoleArg::Auditor => SpaceRole::SpaceAuditor,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration first (before any logging)
    let config = Config::from_env().context("Configuration error")?;

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    ensure_persistent_backend(&config, &cli.command)?;

    // 3. Build stores and services
    let onboarding = services::from_config(&config).await?;
    info!(backend = ?config.store_backend, "Invitation vault initialized");

    run(&config, &onboarding, cli.command).await
}

async fn run(config: &Config, onboarding: &OnboardingService, command: Command) -> Result<()> {
    match command {
        Command::IssueCode { email } => {
            let code = onboarding.codes().generate_code(&email).await?;
            print_json(&code)?;
        }
        Command::Verify { code } => {
            let preview = onboarding.preview(&code).await?;
            print_json(&serde_json::json!({
                "code": preview.code,
                "invitations": preview.invitations,
            }))?;
        }
        Command::Redeem { code } => {
            let found = onboarding.codes().verify(&code).await?;
            let redeemed = onboarding.codes().redeem(&found).await?;
            print_json(&redeemed)?;
        }
        Command::FindCode { email } => {
            let found = onboarding.codes().find_by_email(&email).await?;
            print_json(&found)?;
        }
        Command::InviteOrg { email, org, roles } => {
            let org = OrgId::new(org);
            let roles: BTreeSet<OrgRole> = roles.into_iter().map(OrgRole::from).collect();
            let receipt = onboarding
                .invite(&email, |i| i.add_org_roles(org.clone(), roles.iter().copied()))
                .await?;
            print_json(&serde_json::json!({ "outcome": receipt.outcome, "code": receipt.code }))?;
        }
        Command::InviteSpace { email, space, roles } => {
            let space = SpaceId::new(space);
            let roles: BTreeSet<SpaceRole> = roles.into_iter().map(SpaceRole::from).collect();
            let receipt = onboarding
                .invite(&email, |i| i.add_space_roles(space.clone(), roles.iter().copied()))
                .await?;
            print_json(&serde_json::json!({ "outcome": receipt.outcome, "code": receipt.code }))?;
        }
        Command::GrantOrgCreation { email } => {
            let outcome = onboarding
                .invitations()
                .add_eligibility_to_create_org(&email)
                .await?;
            print_json(&outcome)?;
        }
        Command::Show { email } => {
            let pending = onboarding.invitations().get_access_invitations(&email).await?;
            print_json(&pending)?;
        }
        Command::Pending => {
            let keys = onboarding.invitations().get_keys().await?;
            print_json(&keys)?;
        }
        Command::Hash { text } => {
            let encryption = encryption_from_config(config)?;
            println!("{}", encryption.hash(&text));
        }
    }
    Ok(())
}

/// Each invocation is its own process, so in-memory records never reach the next one
fn ensure_persistent_backend(config: &Config, command: &Command) -> Result<()> {
    if config.store_backend == StoreBackend::Memory && command.needs_shared_store() {
        bail!("STORE_BACKEND=memory keeps records only for a single command; set STORE_BACKEND=redis");
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG takes precedence over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
