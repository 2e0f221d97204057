pub mod compiler;
pub mod process;
pub mod reload;
pub mod writer;

pub use process::{CommandRunner, NginxProcess, TokioCommandRunner};
pub use reload::ReloadCoordinator;
pub use writer::ConfigWriter;
