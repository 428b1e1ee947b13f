//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

use crate::domain::{Direction, NodeId};

/// Syllabus template builder: hierarchical sections, field values, and document export
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Working directory holding the local .syllabus.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the template as a tree
    Tree {
        /// Levels below the root to show
        #[arg(long, default_value_t = 8)]
        depth: usize,
    },

    /// Add a section under a parent node
    Add {
        /// Parent node id
        parent: NodeId,
        /// Section type tag (e.g. SUMILLA)
        #[arg(value_name = "TYPE")]
        kind: String,
        /// Display name (default: the type tag)
        #[arg(short, long)]
        name: Option<String>,
        /// Field with default value, repeatable
        #[arg(short, long = "attr", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        attrs: Vec<(String, String)>,
    },

    /// Delete a node and everything below it
    Delete {
        /// Node id
        id: NodeId,
    },

    /// Move a node (with its subtree) under another node
    Move {
        /// Node to move
        id: NodeId,
        /// New parent
        target: NodeId,
    },

    /// Swap a node with its neighbouring sibling
    Reorder {
        /// Node id
        id: NodeId,
        /// up | down
        direction: Direction,
    },

    /// Check the template structure
    Validate,

    /// Find nodes by name or field name
    Search {
        /// Case-insensitive search term
        term: String,
    },

    /// Enter a field value
    Set {
        /// Node id
        node: NodeId,
        /// Field name
        field: String,
        /// Value
        value: String,
        /// Store as one cell of a grouped value
        #[arg(short, long, value_name = "KEY")]
        group: Option<String>,
    },

    /// Show an entered field value
    Get {
        /// Node id
        node: NodeId,
        /// Field name
        field: String,
    },

    /// Show completion and generation statistics
    Stats,

    /// Generate the syllabus document
    Generate {
        /// Output file name (default: derived from course code and semester)
        #[arg(short, long)]
        filename: Option<String>,
    },

    /// Import/export the template
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// Write the template as a versioned JSON document
    Export {
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Replace the template with a JSON snapshot
    Import {
        /// Snapshot file (versioned document or bare node list)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented config template
    Template,
    /// Show config file locations
    Path,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty field name in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_attr_flags_when_parsing_add_then_pairs_in_order() {
        let cli = Cli::parse_from([
            "syllabus", "add", "1", "SUMILLA", "--attr", "Texto=", "-a", "Horas=4",
        ]);
        match cli.command {
            Some(Commands::Add { parent, kind, attrs, name }) => {
                assert_eq!(parent, 1);
                assert_eq!(kind, "SUMILLA");
                assert!(name.is_none());
                assert_eq!(
                    attrs,
                    vec![
                        ("Texto".to_string(), String::new()),
                        ("Horas".to_string(), "4".to_string())
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn given_bad_direction_when_parsing_reorder_then_error() {
        assert!(Cli::try_parse_from(["syllabus", "reorder", "2", "left"]).is_err());
    }

    #[test]
    fn given_repeated_debug_flag_then_counts() {
        let cli = Cli::parse_from(["syllabus", "-ddd", "tree"]);
        assert_eq!(cli.debug, 3);
    }
}
