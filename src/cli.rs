use crate::riot::Region;
use clap::{Parser, Subcommand, ValueEnum};

/// Player data sync against the Riot Games API
#[derive(Parser, Debug)]
#[command(name = "riftsync", version, about)]
#[command(after_long_help = r#"EXAMPLES
    Sync a player's profile and champion masteries:
        $ riftsync sync 'Alex#1234' --region EUW

    Also ingest their recent matches:
        $ riftsync sync 'Alex#1234' --region EUW --matches

ENVIRONMENT VARIABLES
    RIOT_API_KEY              Riot developer or production key (required)
    DATABASE_URL              Postgres connection string (in-memory store when unset)
    METADATA_TIMEOUT          Wait limit for the metadata stage (default: 20s)
    MATCHES_TIMEOUT           Wait limit for the match stage (default: 60s)
    REFRESH_EXISTING_PROFILES Overwrite stored profiles on re-sync (default: false)
"#)]
pub struct Args {
    /// Log formatter to use
    #[arg(long, value_enum, global = true, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync one player by their `name#tag` handle
    Sync {
        /// Riot ID, e.g. `Alex#1234`
        handle: String,
        /// Platform the account plays on (`EUW`, `NA1`, `KR`, ...)
        #[arg(short, long)]
        region: Region,
        /// Also ingest the player's recent matches
        #[arg(short, long)]
        matches: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply pending database migrations and exit
    Migrate,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable output for terminals
    Pretty,
    /// One JSON object per line
    Json,
}

/// Pretty in debug builds, JSON in release builds.
const fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_command() {
        let args = Args::parse_from(["riftsync", "sync", "Alex#1234", "--region", "euw", "--matches"]);
        match args.command {
            Command::Sync {
                handle,
                region,
                matches,
                json,
            } => {
                assert_eq!(handle, "Alex#1234");
                assert_eq!(region, Region::Euw1);
                assert!(matches);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn tracing_flag_is_global() {
        let args = Args::parse_from(["riftsync", "migrate", "--tracing", "json"]);
        assert_eq!(args.tracing, TracingFormat::Json);
    }

    #[test]
    fn unknown_region_is_rejected() {
        assert!(Args::try_parse_from(["riftsync", "sync", "Alex#1", "--region", "moon"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
