mod backend;
mod backends;

pub use backend::{LineBackend, PedestrianBackend};
pub use backends::{select_backends, Backends, BlobBackend, HoughBackend};
#[cfg(feature = "opencv")]
pub use backends::{HogBackend, HoughPBackend};
