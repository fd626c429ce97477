//! magplay - play catalog titles from torrent streams, optionally unlocked
//! through Real-Debrid.

pub mod cinemeta;
pub mod config;
pub mod debrid;
pub mod descriptor;
pub mod doctor;
pub mod http;
pub mod player;
pub mod resolver;
pub mod selector;
pub mod torrentio;

pub use cinemeta::{CinemetaClient, MediaItem};
pub use debrid::{DebridClient, PollPolicy, UnlockError};
pub use descriptor::{StreamDescriptor, StreamKind};
pub use resolver::{Playable, ResolveError, Resolver, Route};
pub use torrentio::TorrentioClient;
