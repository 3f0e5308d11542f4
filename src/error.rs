/// Failure classes that end the process.
///
/// Gameplay never produces these: dying is a state reset, not an error.
/// Only asset loading and terminal I/O can fail.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// An image (sprite, backdrop, or level bitmap) is missing or unreadable.
    #[error("cannot load image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// None of the accepted file names for an asset exist.
    #[error("missing asset in {}: expected one of {}", dir.display(), names.join(", "))]
    MissingAsset { dir: PathBuf, names: Vec<String> },

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}
