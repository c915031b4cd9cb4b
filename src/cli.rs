use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vault-ingest")]
#[command(about = "Converts deposits into RDA bags for the vault", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $VAULT_INGEST_CONFIG or config/vault-ingest.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the inbox and convert deposits until stopped
    Run,
    /// Convert a single deposit directory and exit
    Convert(ConvertArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Deposit directory
    pub deposit_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::parse_from(["vault-ingest", "--config", "ingest.toml", "convert", "/inbox/d1"]);
        assert_eq!(cli.config, Some(PathBuf::from("ingest.toml")));
        assert!(matches!(cli.command, Commands::Convert(args) if args.deposit_dir == PathBuf::from("/inbox/d1")));
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["vault-ingest", "run"]);
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Commands::Run));
    }
}
