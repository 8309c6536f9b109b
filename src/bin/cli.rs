use anyhow::{Context, Result, bail};
use chrono::Local;
use clinicdesk::api;
use clinicdesk::cli::{self, Command};
use clinicdesk::client::HttpsApiClient;
use clinicdesk::config::Config;
use clinicdesk::context::{AppContext, StandardContext};
use clinicdesk::error::ClientError;
use clinicdesk::model::LoginInput;
use clinicdesk::session::SessionStore;
use rpassword::prompt_password;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::env;
use std::sync::Arc;

const BINARY_NAME: &str = "clinicdesk";

fn init_logging(config: &Config) {
    let level = env::var("CLINICDESK_LOG")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| config.log_level_filter());

    let log_config = ConfigBuilder::new()
        .add_filter_allow_str("clinicdesk")
        .build();
    // A second logger is the only failure here; ignore it.
    let _ = TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn load_config(ctx: &dyn AppContext) -> Result<Config> {
    match Config::load(ctx) {
        Ok(config) => Ok(config),
        Err(e) if Config::is_missing_config_error(&e) => bail!(
            "No configuration found. Run `{} init <api-url>` first.",
            BINARY_NAME
        ),
        Err(e) => Err(e),
    }
}

/// Loads the config, starts logging and builds the client over the stored session.
fn connect(ctx: &dyn AppContext) -> Result<HttpsApiClient> {
    let config = load_config(ctx)?;
    init_logging(&config);

    let session = SessionStore::for_context(ctx)?;
    let client = HttpsApiClient::new(
        &config,
        session,
        Arc::new(|_reason: &ClientError| {
            eprintln!(
                "Your session has expired. Run `{} login <email>` to sign in again.",
                BINARY_NAME
            );
        }),
    )?;
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    let invocation = match cli::parse_args(env::args().skip(1)) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!("Run `{} --help` for usage.", BINARY_NAME);
            std::process::exit(2);
        }
    };

    let ctx = StandardContext::new(invocation.root);

    match invocation.command {
        Command::Help => cli::print_help(BINARY_NAME),
        Command::Init { api_url } => {
            let config = Config::new(api_url);
            config.validate()?;
            config.save(&ctx)?;
            println!("Configuration saved to {}", Config::get_path_string(&ctx)?);
        }
        Command::Login { email, password } => {
            let client = connect(&ctx)?;
            let password = match password {
                Some(p) => p,
                None => prompt_password("Password: ")?,
            };
            let user = api::auth::login(&client, &LoginInput { email, password })
                .await
                .context("Sign-in failed")?;
            println!("Signed in as {} <{}>", user.display_name(), user.email);
        }
        Command::Logout => {
            api::auth::logout(&connect(&ctx)?).await?;
            println!("Signed out.");
        }
        Command::Whoami => {
            let client = connect(&ctx)?;
            if !client.session().is_logged_in().await? {
                println!("Not signed in.");
                return Ok(());
            }
            let user = api::auth::current_user(&client).await?;
            println!("{} <{}>", user.display_name(), user.email);
            if let Some(role) = &user.role {
                println!("Role: {}", role);
            }
        }
        Command::Appointments => {
            let appointments = api::appointments::doctor_appointments(&connect(&ctx)?).await?;
            if appointments.is_empty() {
                println!("No appointments.");
            }
            for a in appointments {
                println!(
                    "{}  {:<10} {}",
                    a.scheduled_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    a.status.to_string(),
                    a.patient_name()
                );
            }
        }
        Command::Clinics => {
            for c in api::clinics::my_clinics(&connect(&ctx)?).await? {
                let city = c.city.as_deref().unwrap_or("-");
                let verified = if c.is_verified { "" } else { " (pending verification)" };
                println!("{}  {}{}", c.name, city, verified);
            }
        }
        Command::Services => {
            for s in api::services::my_services(&connect(&ctx)?).await? {
                match s.duration_minutes {
                    Some(mins) => println!("{:<30} {:>9.2}  {} min", s.name, s.price, mins),
                    None => println!("{:<30} {:>9.2}", s.name, s.price),
                }
            }
        }
    }

    Ok(())
}
