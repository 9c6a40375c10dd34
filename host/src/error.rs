use std::path::PathBuf;

/// Failures before the loader gets an image to look at.
#[derive(thiserror::Error, Debug)]
pub enum HostError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
