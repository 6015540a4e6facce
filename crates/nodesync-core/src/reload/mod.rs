// # Reload Trigger Implementations
//
// - [`CommandReloadTrigger`]: runs an external command (`ufw reload`,
//   `systemctl reload nginx`)
// - [`DryRunReloadTrigger`]: logs what would have run

pub mod command;
pub mod dry_run;

pub use command::CommandReloadTrigger;
pub use dry_run::DryRunReloadTrigger;
