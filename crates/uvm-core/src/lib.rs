//! uvm core library.
//!
//! `uvm-core` holds the types every other crate agrees on: deployment targets,
//! the data a wizard session collects, the package catalogue, the provisioning
//! config record, cloud-init rendering, saved profiles and the GitHub lookup.

pub mod cloud_init;
pub mod errors;
pub mod github;
pub mod logging;
pub mod packages;
pub mod profile;
pub mod provision;
pub mod settings;
pub mod ssh;
pub mod target;
pub mod wizard_data;

pub use errors::{Result, UvmError};
pub use packages::{Catalogue, Package, PackagePreset, PackageRegistry};
pub use target::DeploymentTarget;
pub use wizard_data::WizardData;
