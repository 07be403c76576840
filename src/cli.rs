//! Command-line interface definition for Chathist
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to browse and manage conversation history.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chathist - Conversation history store
///
/// List, search, delete, duplicate, export, rename, and share stored
/// chat conversations.
#[derive(Parser, Debug, Clone)]
#[command(name = "chathist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the history database location
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Chathist
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List stored conversations, newest first
    List {
        /// Only show conversations matching this text
        #[arg(short, long)]
        query: Option<String>,

        /// Group conversations by recency (Today, Yesterday, ...)
        #[arg(short, long)]
        grouped: bool,
    },

    /// Delete one or more conversations and their snapshots
    Delete {
        /// Conversation IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Copy a conversation under a new ID
    Duplicate {
        /// Conversation ID
        id: String,
    },

    /// Write a conversation as a JSON bundle
    Export {
        /// Conversation ID
        id: String,

        /// Output file; `-` writes to stdout. Defaults to `chat-<ID>.json`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Change a conversation's description
    Rename {
        /// Conversation ID
        id: String,

        /// New description
        description: String,
    },

    /// Print the share link for a conversation
    Share {
        /// Conversation ID
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            db: None,
            verbose: false,
            command: Commands::List {
                query: None,
                grouped: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(cli.db.is_none());
        assert!(!cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::List {
                query: None,
                grouped: false
            }
        ));
    }

    #[test]
    fn test_cli_parse_list_with_query() {
        let cli = Cli::try_parse_from(["chathist", "list", "--query", "api", "--grouped"]).unwrap();
        if let Commands::List { query, grouped } = cli.command {
            assert_eq!(query, Some("api".to_string()));
            assert!(grouped);
        } else {
            panic!("Expected List command");
        }
    }

    #[test]
    fn test_cli_parse_delete_many() {
        let cli = Cli::try_parse_from(["chathist", "delete", "a", "b", "c"]).unwrap();
        if let Commands::Delete { ids } = cli.command {
            assert_eq!(ids, vec!["a", "b", "c"]);
        } else {
            panic!("Expected Delete command");
        }
    }

    #[test]
    fn test_cli_parse_delete_requires_id() {
        assert!(Cli::try_parse_from(["chathist", "delete"]).is_err());
    }

    #[test]
    fn test_cli_parse_export_with_output() {
        let cli =
            Cli::try_parse_from(["chathist", "export", "01HX", "--output", "out.json"]).unwrap();
        if let Commands::Export { id, output } = cli.command {
            assert_eq!(id, "01HX");
            assert_eq!(output, Some(PathBuf::from("out.json")));
        } else {
            panic!("Expected Export command");
        }
    }

    #[test]
    fn test_cli_parse_rename() {
        let cli = Cli::try_parse_from(["chathist", "rename", "01HX", "New title"]).unwrap();
        if let Commands::Rename { id, description } = cli.command {
            assert_eq!(id, "01HX");
            assert_eq!(description, "New title");
        } else {
            panic!("Expected Rename command");
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "chathist",
            "--db",
            "/tmp/history.db",
            "-v",
            "--config",
            "custom.yaml",
            "share",
            "01HX",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/history.db")));
        assert!(cli.verbose);
        assert_eq!(cli.config, Some("custom.yaml".to_string()));
        assert!(matches!(cli.command, Commands::Share { .. }));
    }

    #[test]
    fn test_cli_parse_duplicate() {
        let cli = Cli::try_parse_from(["chathist", "duplicate", "01HX"]).unwrap();
        assert!(matches!(cli.command, Commands::Duplicate { id } if id == "01HX"));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["chathist", "chat"]).is_err());
    }
}
