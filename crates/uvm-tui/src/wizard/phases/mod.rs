//! One handler per wizard phase.

mod complete;
mod deploy;
pub(crate) mod form;
mod git;
mod host;
mod optional;
mod packages;
mod review;
mod ssh;
mod target;
mod target_options;

pub use complete::CompletePhase;
pub use deploy::DeployPhase;
pub use git::GitPhase;
pub use host::HostPhase;
pub use optional::OptionalPhase;
pub use packages::PackagesPhase;
pub use review::ReviewPhase;
pub(crate) use review::summary_lines;
pub use ssh::SshPhase;
pub use target::TargetPhase;
pub use target_options::TargetOptionsPhase;
