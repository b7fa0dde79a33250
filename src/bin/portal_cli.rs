//!
//! campus_portal CLI
//! ------------------
//! Drives the session store and route guard against a portal backend from the terminal.
//! Runs one command from the arguments, or an interactive interpreter with `--repl`.

use std::env;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;

use campus_portal::config::PortalConfig;
use campus_portal::identity::Credentials;
use campus_portal::portal::Portal;
use campus_portal::routes::{access_level, can_access_route, RouteRequirement, SCREENS};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--token-dir <path>] [--no-verify] <command> [args...]\n  {program} [--api <url>] [--token-dir <path>] --repl\n\nFlags:\n  --api <url>          Backend base URL (env: CAMPUS_PORTAL_API_URL, default http://127.0.0.1:7880)\n  --token-dir <path>   Directory holding the persisted token (env: CAMPUS_PORTAL_TOKEN_DIR)\n  --no-verify          Trust a persisted token without asking the backend\n  --repl               Start interactive mode\n  -h, --help           Show this help\n\nCommands:\n  login <student-id> <password>        log in as a student\n  login --staff <username> <password>  log in as an officer\n  logout                               end the session\n  whoami                               show the current identity\n  go <path>                            navigate and show where the guard sends you\n  routes                               list screens and their access for the current identity\n  help | quit | exit"
    );
}

fn parse_credentials(args: &[&str]) -> Option<Credentials> {
    match args {
        ["--staff", user, pass] => Some(Credentials::Staff { username: user.to_string(), password: pass.to_string() }),
        [id, pass] => Some(Credentials::Student { student_id: id.to_string(), password: pass.to_string() }),
        _ => None,
    }
}

/// Run one command. Returns false when the interpreter should stop.
fn run_command(rt: &tokio::runtime::Runtime, portal: &Portal, line: &str) -> bool {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((cmd, rest)) = parts.split_first() else { return true; };
    match cmd.to_ascii_lowercase().as_str() {
        "quit" | "exit" => return false,
        "help" => print_usage("portal_cli"),
        "login" => {
            let Some(creds) = parse_credentials(rest) else {
                eprintln!("usage: login [--staff] <id> <password>");
                return true;
            };
            match rt.block_on(portal.login(&creds)) {
                Ok((identity, home)) => println!("logged in as {}; landing on {}", identity, home),
                Err(e) => {
                    eprintln!("{}", e.user_message());
                    tracing::debug!("login error: {}", e);
                }
            }
        }
        "logout" => {
            rt.block_on(portal.logout());
            println!("logged out");
        }
        "whoami" => match portal.session().current_identity() {
            Some(id) => println!("{}", id),
            None => println!("not logged in"),
        },
        "go" => {
            let Some(path) = rest.first() else {
                eprintln!("usage: go <path>");
                return true;
            };
            let nav = portal.navigate(path);
            if let Some(notice) = nav.notice { println!("{}", notice); }
            println!("{} -> {:?} -> {} ({:?})", nav.requested, nav.decision, nav.path, nav.access);
        }
        "routes" => {
            let position = portal.session().current_identity().and_then(|i| i.position());
            for s in SCREENS {
                let level = match s.requirement {
                    RouteRequirement::Admin if position.is_none() => "admin only".to_string(),
                    RouteRequirement::Admin if !can_access_route(s.path, position) => "denied".to_string(),
                    _ => format!("{:?}", access_level(s.path, position)),
                };
                println!("{:<24} {:<22} {:?} [{}]", s.path, s.title, s.requirement, level);
            }
        }
        other => eprintln!("unknown command '{}'; type 'help'", other),
    }
    true
}

fn run_repl(rt: &tokio::runtime::Runtime, portal: &Portal) -> Result<()> {
    let mut rl = rustyline::DefaultEditor::new().context("failed to start line editor")?;
    println!("campus_portal interpreter. Type 'help' for commands.");
    loop {
        let prompt = match portal.session().current_identity() {
            Some(id) => format!("{}> ", id.id()),
            None => "> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() { continue; }
                let _ = rl.add_history_entry(line);
                if !run_command(rt, portal, line) { break; }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config = PortalConfig::from_env();
    let mut repl = false;
    let mut command: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                if i + 1 >= args.len() { eprintln!("--api requires a URL"); print_usage(&program); std::process::exit(2); }
                config.api_base_url = args[i + 1].clone();
                i += 2; continue;
            }
            "--token-dir" => {
                if i + 1 >= args.len() { eprintln!("--token-dir requires a value"); print_usage(&program); std::process::exit(2); }
                config.token_dir = args[i + 1].clone().into();
                i += 2; continue;
            }
            "--no-verify" => { config.verify_on_start = false; i += 1; continue; }
            "--repl" => { repl = true; i += 1; continue; }
            "-h" | "--help" if command.is_empty() => {
                print_usage(&program);
                return Ok(());
            }
            _ => {
                // everything from the first non-flag on is the command
                command.extend(args[i..].iter().cloned());
                break;
            }
        }
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    let portal = Portal::from_config(config)?;
    rt.block_on(portal.start());

    if repl {
        return run_repl(&rt, &portal);
    }
    if command.is_empty() {
        print_usage(&program);
        std::process::exit(2);
    }
    run_command(&rt, &portal, &command.join(" "));
    Ok(())
}
