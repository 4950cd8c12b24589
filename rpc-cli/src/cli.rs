//! # CLI
//!
//! The original framework ships two binaries (a provider process and a
//! gateway process); this port merges both into one entry point selected by
//! `--role`, defaulting to `provider` to preserve the original single-role
//! invocation (`./provider -i config.conf`) when the flag is omitted.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Provider,
    Proxy,
}

#[derive(Debug, Parser)]
#[command(name = "rpc-cli", about = "RPC framework provider/proxy entry point")]
pub struct Cli {
    /// Path to the `key=value` configuration file.
    #[arg(short = 'i', long = "config")]
    pub config: PathBuf,

    /// Which component to run.
    #[arg(long, value_enum, default_value_t = Role::Provider)]
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_provider_role() {
        let cli = Cli::parse_from(["rpc-cli", "-i", "app.conf"]);
        assert_eq!(cli.role, Role::Provider);
        assert_eq!(cli.config, PathBuf::from("app.conf"));
    }

    #[test]
    fn accepts_explicit_proxy_role() {
        let cli = Cli::parse_from(["rpc-cli", "-i", "app.conf", "--role", "proxy"]);
        assert_eq!(cli.role, Role::Proxy);
    }

    #[test]
    fn missing_config_flag_is_an_error() {
        let result = Cli::try_parse_from(["rpc-cli"]);
        assert!(result.is_err());
    }
}
