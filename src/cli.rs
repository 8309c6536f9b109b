// File: ./src/cli.rs
//! Shared command-line interface logic: argument parsing and help.
use anyhow::{Result, anyhow, bail};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init { api_url: String },
    Login { email: String, password: Option<String> },
    Logout,
    Whoami,
    Appointments,
    Clinics,
    Services,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub root: Option<PathBuf>,
    pub command: Command,
}

/// Parses the arguments following the binary name.
pub fn parse_args<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut root = None;
    let mut positional = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Ok(Invocation {
                    root,
                    command: Command::Help,
                });
            }
            "-r" | "--root" => {
                let dir = args
                    .next()
                    .ok_or_else(|| anyhow!("--root needs a directory"))?;
                root = Some(PathBuf::from(dir));
            }
            flag if flag.starts_with('-') => bail!("Unknown option '{}'", flag),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        None | Some("help") => Command::Help,
        Some("init") => Command::Init {
            api_url: positional
                .next()
                .ok_or_else(|| anyhow!("init needs the API URL"))?,
        },
        Some("login") => Command::Login {
            email: positional
                .next()
                .ok_or_else(|| anyhow!("login needs an email address"))?,
            password: positional.next(),
        },
        Some("logout") => Command::Logout,
        Some("whoami") => Command::Whoami,
        Some("appointments") => Command::Appointments,
        Some("clinics") => Command::Clinics,
        Some("services") => Command::Services,
        Some(other) => bail!("Unknown command '{}'", other),
    };

    if let Some(extra) = positional.next() {
        bail!("Unexpected argument '{}'", extra);
    }

    Ok(Invocation { root, command })
}

pub fn print_help(binary_name: &str) {
    println!(
        "ClinicDesk v{} - Clinic management from the terminal",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [--root <path>] <command>", binary_name);
    println!();
    println!("COMMANDS:");
    println!("    init <api-url>              Save the backend URL to the config file");
    println!("    login <email> [password]    Sign in (prompts for the password if omitted)");
    println!("    logout                      Sign out and forget the stored session");
    println!("    whoami                      Show the signed-in user");
    println!("    appointments                List your upcoming appointments");
    println!("    clinics                     List your clinics");
    println!("    services                    List the services you offer");
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("ENVIRONMENT:");
    println!("    CLINICDESK_LOG        Log level (error, warn, info, debug, trace).");
    println!();
    println!("EXAMPLES:");
    println!("    {} init https://api.example.com/api/v1", binary_name);
    println!("    {} login dr.house@example.com", binary_name);
    println!("    {} --root /tmp/staging appointments", binary_name);
}
