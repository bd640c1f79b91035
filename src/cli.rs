//! Command line arguments

use reqwest::Url;
use thiserror::Error;

use crate::mail::jmap::well_known_url;

pub const USAGE: &str = r#"lttr - terminal JMAP thread viewer

Usage: lttr [url] <username> <password>

Arguments:
    url         JMAP session resource (default: https://<domain>/.well-known/jmap)
    username    Account name, usually the email address
    password    Account password

Configuration file: ~/.config/lttr/config.toml
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub url: Option<Url>,
    pub username: String,
    pub password: String,
}

impl Args {
    /// The explicit URL, or the well-known resource of the username's domain.
    pub fn session_url(&self) -> Option<String> {
        match &self.url {
            Some(url) => Some(url.to_string()),
            None => well_known_url(&self.username),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Run(Args),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("expected 2 or 3 arguments, got {0}")]
    ArgumentCount(usize),
    #[error("invalid url {0}: {1}")]
    InvalidUrl(String, String),
}

/// Parse the arguments following the program name.
pub fn parse_args(args: &[String]) -> Result<Command, UsageError> {
    if let [flag] = args
        && (flag == "-h" || flag == "--help")
    {
        return Ok(Command::Help);
    }

    let (url, username, password) = match args {
        [username, password] => (None, username, password),
        [url, username, password] => {
            let parsed = Url::parse(url)
                .map_err(|e| UsageError::InvalidUrl(url.clone(), e.to_string()))?;
            (Some(parsed), username, password)
        }
        _ => return Err(UsageError::ArgumentCount(args.len())),
    };

    Ok(Command::Run(Args {
        url,
        username: username.clone(),
        password: password.clone(),
    }))
}
