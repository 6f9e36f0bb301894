pub mod config;
pub mod filesystem;
pub mod pipeline;
pub mod publish;
pub mod repair;
pub mod rewrite;
pub mod runtime;
pub mod vcs;
