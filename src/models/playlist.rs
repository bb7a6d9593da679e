use std::fmt;

/// Opaque identifier for a displayable image (URL or filesystem path).
///
/// The controller never interprets the contents; loading and rendering are
/// delegated to the [`crate::surface`] collaborators. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageSource(String);

impl ImageSource {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageSource {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ImageSource {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// One slot in display order.
///
/// `index` is the display position, not an identifier: duplicates of the same
/// source at different indices are legal and common (short source lists are
/// cycled up to the slide count).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub index: usize,
    pub source: ImageSource,
}

/// Ordered sequence of slides for one cycle.
///
/// May be empty at construction; [`crate::cycle::SlideCycle::start`] rejects
/// empty playlists rather than this type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
}

impl Playlist {
    /// Build a playlist from sources in the given order.
    pub fn new(sources: Vec<ImageSource>) -> Self {
        let entries = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| PlaylistEntry { index, source })
            .collect();
        Self { entries }
    }

    /// Build a fixed-length playlist by cycling through `sources`.
    ///
    /// Entry `i` gets `sources[i % sources.len()]`, so a pool shorter than
    /// `count` repeats in order. An empty pool yields an empty playlist.
    pub fn cycled(sources: &[ImageSource], count: usize) -> Self {
        if sources.is_empty() {
            return Self::default();
        }
        let entries = (0..count)
            .map(|index| PlaylistEntry {
                index,
                source: sources[index % sources.len()].clone(),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.entries.iter()
    }
}

impl FromIterator<ImageSource> for Playlist {
    fn from_iter<I: IntoIterator<Item = ImageSource>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
