pub mod git;
pub mod process;

pub use git::{slugify, Git};
pub use process::{CommandLine, ProcessHelper, ProcessOutput, ProcessRunner, RecordingRunner, SystemRunner};
