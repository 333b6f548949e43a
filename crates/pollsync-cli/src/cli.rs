use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pollsync", version, about = "Live poll client with optimistic updates")]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "pollsync.toml")]
    pub config: PathBuf,

    /// Bearer token; overrides the config file and POLLSYNC_TOKEN.
    #[arg(long)]
    pub token: Option<String>,

    /// Load this poll with its options after start.
    #[arg(long)]
    pub focus: Option<i64>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::parse_from(["pollsync", "--focus", "7", "--log-json", "-c", "x.toml"]);
        assert_eq!(args.focus, Some(7));
        assert!(args.log_json);
        assert_eq!(args.config, PathBuf::from("x.toml"));
        assert!(args.token.is_none());
    }
}
