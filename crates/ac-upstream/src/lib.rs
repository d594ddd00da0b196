pub mod client;
pub mod raw;

pub use client::{BandsintownClient, HttpBandsintownClient, HttpMusicBrainzClient, MusicBrainzClient};
