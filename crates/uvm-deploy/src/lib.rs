//! uvm deployment layer.
//!
//! Turns reviewed wizard data into [`DeployOptions`], picks a [`Deployer`] for
//! the chosen target and runs it on a worker thread, streaming
//! [`ProgressEvent`]s back over a bounded channel.

pub mod config_only;
pub mod deployer;
pub mod dispatch;
pub mod multipass;
pub mod options;
pub mod progress;
pub mod runner;
pub mod summary;
pub mod terraform;
pub mod usb;

pub use deployer::{DeployResult, Deployer};
pub use dispatch::{
    run_deployer, select_deployer, spawn_deploy, DeployHandle, DeployPoll, PROGRESS_CAPACITY,
};
pub use options::{build_deploy_options, DeployOptions};
pub use progress::ProgressEvent;
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
