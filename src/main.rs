//! Tollgate
//!
//! Command-line front end for the token gate: mint a cookie token for
//! a subject and address, or check a presented token the way the
//! server-side gate would.

use std::env;
use std::process::ExitCode;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tollgate::clock::{Clock, FixedClock, SystemClock};
use tollgate::config::{Settings, TtlSetting};
use tollgate::gate::{AuthGate, Decision};
use tollgate::nonce::{NonceSource, SequenceNonce, SystemNonce};
use tollgate::token::parse_stamp;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

fn main() -> ExitCode {
    // Parse command line arguments (simple std::env approach)
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let command = match args.get(1) {
        Some(c) if !c.starts_with('-') => c.clone(),
        _ => {
            print_help();
            return ExitCode::FAILURE;
        }
    };

    let config_path = get_config_path(&args);

    let settings = match Settings::load(&config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    match command.as_str() {
        "mint" => run_mint(&args, settings),
        "check" => run_check(&args, settings),
        other => {
            eprintln!("Unknown command '{}': expected 'mint' or 'check'", other);
            ExitCode::FAILURE
        }
    }
}

fn run_mint(args: &[String], mut settings: Settings) -> ExitCode {
    let Some(subject) = get_flag(args, "--subject") else {
        eprintln!("mint requires --subject <SUBJECT>");
        return ExitCode::FAILURE;
    };
    let Some(address) = get_flag(args, "--address") else {
        eprintln!("mint requires --address <ADDRESS>");
        return ExitCode::FAILURE;
    };

    if let Some(ttl) = get_flag(args, "--ttl") {
        settings.token.ttl = match ttl.parse::<u64>() {
            Ok(seconds) => TtlSetting::Seconds(seconds),
            Err(_) => TtlSetting::Named(ttl),
        };
    }

    let gate = match build_gate(&settings, get_flag(args, "--nonce"), None) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match gate.issue(&subject, &address) {
        Ok(issued) => {
            println!("{}", issued.token);
            println!("Set-Cookie: {}", issued.set_cookie);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error minting token: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_check(args: &[String], settings: Settings) -> ExitCode {
    let Some(token) = get_flag(args, "--token") else {
        eprintln!("check requires --token <TOKEN>");
        return ExitCode::FAILURE;
    };
    let Some(address) = get_flag(args, "--address") else {
        eprintln!("check requires --address <ADDRESS>");
        return ExitCode::FAILURE;
    };

    let gate = match build_gate(&settings, None, get_flag(args, "--now")) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match gate.check_token(&token, &address) {
        Decision::Granted { subject, .. } => {
            println!("accepted subject={}", subject);
            println!("Authorization: {}", AuthGate::basic_authorization(&subject));
            ExitCode::SUCCESS
        }
        Decision::Denied { cause, .. } => {
            println!("denied reason={}", cause.reason_name());
            ExitCode::FAILURE
        }
    }
}

/// Assemble a gate from settings, honoring the fixed-nonce and
/// fixed-clock overrides the mint and check commands accept.
fn build_gate(
    settings: &Settings,
    nonce: Option<String>,
    now: Option<String>,
) -> Result<AuthGate, String> {
    let clock: Box<dyn Clock> = match now {
        Some(stamp) => {
            let at = parse_stamp(&stamp)
                .ok_or_else(|| format!("--now must be a YYYYMMDDTHHMMSS stamp, got '{}'", stamp))?;
            Box::new(FixedClock::new(at))
        }
        None => Box::new(SystemClock),
    };

    let nonces: Box<dyn NonceSource> = match nonce {
        Some(value) => {
            let first = value
                .parse::<u64>()
                .map_err(|_| format!("--nonce must be a non-negative integer, got '{}'", value))?;
            Box::new(SequenceNonce::new(first))
        }
        None => Box::new(SystemNonce),
    };

    AuthGate::with_capabilities(settings, clock, nonces).map_err(|e| e.to_string())
}

/// Value of a `--flag VALUE` or `--flag=VALUE` argument.
fn get_flag(args: &[String], long: &str) -> Option<String> {
    let prefix = format!("{}=", long);
    for (i, arg) in args.iter().enumerate() {
        if arg == long && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
    }
    None
}

fn get_config_path(args: &[String]) -> String {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--config" || arg == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    "/etc/tollgate/config.toml".to_string()
}

fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"{} {}
Mint and check address-bound cookie authentication tokens.

USAGE:
    {} <COMMAND> [OPTIONS]

COMMANDS:
    mint     Mint a token and print it with its Set-Cookie value
    check    Validate a token against an observed client address

OPTIONS:
    -c, --config <PATH>      Path to configuration file
                             [default: /etc/tollgate/config.toml]
    -h, --help               Print help information
    -V, --version            Print version information

MINT OPTIONS:
    --subject <SUBJECT>      Subject to mint the token for
    --address <ADDRESS>      Client address the token is bound to
    --ttl <SECONDS|session>  Override the configured token lifetime
    --nonce <N>              Use a fixed nonce instead of a random draw

CHECK OPTIONS:
    --token <TOKEN>          Token to validate
    --address <ADDRESS>      Observed client address
    --now <STAMP>            Validate as of this YYYYMMDDTHHMMSS moment
"#,
        NAME, VERSION, NAME
    );
}
