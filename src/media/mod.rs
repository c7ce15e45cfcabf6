//! Resolving media references to something a player can open

pub mod uri;

use crate::types::{MediaRef, UploadCandidate};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use uri::path_to_file_uri;

/// Maps opaque media references to locations
pub trait MediaResolver: Send + Sync {
    /// Location for `media`, or `None` when the reference is unknown
    fn resolve(&self, media: &MediaRef) -> Option<String>;
}

/// Resolver for candidates that came from the local filesystem
#[derive(Debug, Default)]
pub struct LocalMediaResolver {
    sources: HashMap<MediaRef, PathBuf>,
}

impl LocalMediaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember where a candidate's audio lives
    ///
    /// Returns the audio reference, or `None` if the candidate has no source
    /// path.
    pub fn register(&mut self, candidate: &UploadCandidate) -> Option<MediaRef> {
        let source = candidate.source.as_ref()?;
        let media = MediaRef::audio_for(candidate);
        debug!("Registered {} -> {}", media, source.display());
        self.sources.insert(media.clone(), source.clone());
        Some(media)
    }

    /// Registered path for `media`
    pub fn source_of(&self, media: &MediaRef) -> Option<&Path> {
        self.sources.get(media).map(PathBuf::as_path)
    }
}

impl MediaResolver for LocalMediaResolver {
    fn resolve(&self, media: &MediaRef) -> Option<String> {
        self.source_of(media).map(path_to_file_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaType;

    fn candidate(source: Option<&str>) -> UploadCandidate {
        UploadCandidate {
            name: "night one.wav".to_string(),
            size_bytes: 1024,
            media_type: MediaType::Wav,
            source: source.map(PathBuf::from),
        }
    }

    #[test]
    fn test_resolves_registered_audio() {
        let mut resolver = LocalMediaResolver::new();
        let c = candidate(Some("/recordings/night one.wav"));
        let media = resolver.register(&c).unwrap();
        assert_eq!(media, MediaRef::audio_for(&c));

        let uri = resolver.resolve(&media).unwrap();
        assert!(uri.starts_with("file://localhost/"));
        assert!(uri.ends_with("night%20one.wav"));
    }

    #[test]
    fn test_unknown_refs_resolve_to_none() {
        let mut resolver = LocalMediaResolver::new();
        let c = candidate(None);
        assert!(resolver.register(&c).is_none());
        assert!(resolver.resolve(&MediaRef::audio_for(&c)).is_none());
        assert!(resolver.resolve(&MediaRef::visualization_for(&c)).is_none());
    }
}
