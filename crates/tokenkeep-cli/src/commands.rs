use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tokenkeep_core::{ApiClient, SessionError, SessionManager, SessionPhase, User};
use tracing::debug;

use crate::todos;

pub const USAGE: &str = "\
Usage: tokenkeep <command>

Commands:
  status                      Show who is signed in
  login <email>               Sign in (prompts for password)
  register <email> <nickname> Create an account and sign in
  passwd                      Change your password
  refresh                     Renew the session tokens
  logout                      Sign out and forget stored tokens
  mine                        List your todos
  help                        Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Login { email: String },
    Register { email: String, nickname: String },
    Passwd,
    Refresh,
    Logout,
    Mine,
    Help,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            [] | ["status"] => Command::Status,
            ["login", email] => Command::Login {
                email: email.to_string(),
            },
            ["register", email, nickname] => Command::Register {
                email: email.to_string(),
                nickname: nickname.to_string(),
            },
            ["passwd"] => Command::Passwd,
            ["refresh"] => Command::Refresh,
            ["logout"] => Command::Logout,
            ["mine"] => Command::Mine,
            ["help"] | ["-h"] | ["--help"] => Command::Help,
            [name, ..] => bail!("Unknown command or wrong arguments: {}", name),
        };
        Ok(command)
    }
}

pub async fn run(command: Command, session: &SessionManager, api: &ApiClient) -> Result<()> {
    // Commands that start a fresh session don't need the stored one checked first
    if !matches!(command, Command::Login { .. } | Command::Register { .. }) {
        if let Err(e) = session.initialize().await {
            debug!(error = %e, "Initialization failed");
            eprintln!("Could not verify stored session: {}", e);
        }
    }

    match command {
        Command::Status => print_status(session),
        Command::Login { email } => {
            let password = prompt_password("Password: ")?;
            let user = session.login(&email, &password).await.map_err(user_facing)?;
            println!("Signed in as {}", describe(&user));
        }
        Command::Register { email, nickname } => {
            let password = prompt_password("Password: ")?;
            let confirm = prompt_password("Confirm password: ")?;
            if password != confirm {
                bail!("Passwords do not match");
            }
            let user = session
                .register(&email, &password, &nickname)
                .await
                .map_err(user_facing)?;
            println!("Welcome, {}", describe(&user));
        }
        Command::Passwd => {
            let current = prompt_password("Current password: ")?;
            let new = prompt_password("New password: ")?;
            session
                .change_password(&current, &new)
                .await
                .map_err(user_facing)?;
            println!("Password changed.");
        }
        Command::Refresh => match session.refresh().await.map_err(user_facing)? {
            Some(user) => println!("Session renewed for {}", describe(&user)),
            None => println!("Please sign in."),
        },
        Command::Logout => {
            session.logout().await.map_err(user_facing)?;
            println!("Signed out.");
        }
        Command::Mine => {
            let todos = todos::fetch_my_todos(session, api).await?;
            if todos.is_empty() {
                println!("No todos yet.");
            }
            for todo in todos {
                println!("{}", todo.summary_line());
            }
        }
        Command::Help => println!("{}", USAGE),
    }
    Ok(())
}

fn print_status(session: &SessionManager) {
    match (session.phase(), session.current_user()) {
        (SessionPhase::Authenticated, Some(user)) => {
            println!("Signed in as {}", describe(&user));
            if let Some(last) = user.last_login_at {
                println!("Last login: {}", last.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        _ => println!("Not signed in."),
    }
}

fn describe(user: &User) -> String {
    format!("{} <{}>", user.display_name(), user.email)
}

/// Session errors already carry a presentable message
fn user_facing(err: SessionError) -> anyhow::Error {
    match err {
        SessionError::Unauthenticated => anyhow::anyhow!("Please sign in first: tokenkeep login <email>"),
        other => anyhow::Error::new(other),
    }
}

fn prompt_password(prompt: &str) -> Result<String> {
    io::stdout().flush()?;
    rpassword::prompt_password(prompt).context("Failed to read password")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&args(&[])).unwrap(), Command::Status);
        assert_eq!(
            Command::parse(&args(&["login", "a@b.com"])).unwrap(),
            Command::Login {
                email: "a@b.com".to_string()
            }
        );
        assert_eq!(
            Command::parse(&args(&["register", "a@b.com", "Ada"])).unwrap(),
            Command::Register {
                email: "a@b.com".to_string(),
                nickname: "Ada".to_string()
            }
        );
        assert_eq!(Command::parse(&args(&["--help"])).unwrap(), Command::Help);
        assert_eq!(Command::parse(&args(&["mine"])).unwrap(), Command::Mine);
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(Command::parse(&args(&["login"])).is_err());
        assert!(Command::parse(&args(&["register", "a@b.com"])).is_err());
        assert!(Command::parse(&args(&["frobnicate"])).is_err());
    }

    #[test]
    fn test_user_facing_messages() {
        let err = user_facing(SessionError::AuthRejected {
            status: 401,
            message: "invalid credentials".to_string(),
        });
        assert_eq!(err.to_string(), "invalid credentials");

        let err = user_facing(SessionError::Unauthenticated);
        assert!(err.to_string().starts_with("Please sign in first"));
    }
}
