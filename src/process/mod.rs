//! Subprocess plumbing: executable resolution and detached spawning.

mod executable;
mod spawn;

pub use executable::lookup_executable;
pub use spawn::{DetachedSpawner, Spawner, resolve_runner_executable};
