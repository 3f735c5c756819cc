//! Fatal pipeline errors.
//!
//! Everything that can go wrong with a single file or manifest is recorded as
//! data on the analysis. Only problems with the root directory itself stop a
//! run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read root directory {path}: {source}")]
    RootUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("root path {0} is not a directory")]
    RootNotDirectory(String),
}
