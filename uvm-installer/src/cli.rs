//! CLI argument parsing for uvm
//!
//! The wizard is the default entry point when no subcommand is provided.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "uvm", version)]
#[command(about = "uvm - Ubuntu VM provisioning wizard")]
#[command(long_about = "uvm - Ubuntu VM provisioning wizard\n\n\
    Collects what a new Ubuntu machine needs (user, SSH keys, packages) and\n\
    provisions it with Multipass, Terraform/libvirt, a USB installer, or as\n\
    plain config files.\n\n\
    Run without arguments to launch the interactive wizard.\n\
    Or use subcommands for scripting.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Settings file (defaults to <config_dir>/uvm/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs here instead of the settings' or default location
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Preload a saved profile and open the wizard at Review
    #[arg(long)]
    pub profile: Option<String>,

    /// Dump every wizard phase as text to stdout and exit
    #[arg(long)]
    pub dump_tui: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage saved wizard profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesCommand,
    },

    /// Generate config files for a saved profile without the wizard
    Generate {
        /// Saved profile to generate from
        #[arg(long)]
        profile: String,

        /// Output directory (defaults to the profile's, then the settings')
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProfilesCommand {
    /// List saved profile names
    List,
    /// Print a profile with secrets masked
    Show { name: String },
    /// Delete a saved profile
    Delete { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_launches_wizard() {
        let cli = Cli::parse_from(["uvm", "--profile", "lab"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.profile.as_deref(), Some("lab"));
        assert!(!cli.dump_tui);
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::parse_from([
            "uvm",
            "generate",
            "--profile",
            "lab",
            "--config",
            "/tmp/uvm.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/uvm.toml")));
        match cli.command {
            Some(Command::Generate { profile, output }) => {
                assert_eq!(profile, "lab");
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn profiles_show_takes_a_name() {
        let cli = Cli::parse_from(["uvm", "profiles", "show", "lab"]);
        assert!(matches!(
            cli.command,
            Some(Command::Profiles {
                action: ProfilesCommand::Show { ref name }
            }) if name == "lab"
        ));
        assert!(Cli::try_parse_from(["uvm", "profiles", "show"]).is_err());
    }
}
