//! Resolution of user-supplied Spotify identifiers.
//!
//! Accepts the three shapes Spotify hands out in the wild and maps them
//! onto a REST endpoint: public web links
//! (`https://open.spotify.com/track/...`), Web API URLs
//! (`https://api.spotify.com/v1/tracks/...`) and bare URIs
//! (`spotify:track:...`). Pure functions, no I/O.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

const OPEN_HOST: &str = "open.spotify.com";
const API_HOST: &str = "api.spotify.com";

/// The closed set of item types a Spotify identifier can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Track,
    Album,
    Artist,
    Playlist,
    Show,
    Episode,
    Chapter,
    Audiobook,
    User,
}

impl ResourceKind {
    const ALL: [ResourceKind; 9] = [
        ResourceKind::Track,
        ResourceKind::Album,
        ResourceKind::Artist,
        ResourceKind::Playlist,
        ResourceKind::Show,
        ResourceKind::Episode,
        ResourceKind::Chapter,
        ResourceKind::Audiobook,
        ResourceKind::User,
    ];

    /// Singular keyword as used in web URLs and URIs.
    pub fn keyword(&self) -> &'static str {
        match self {
            ResourceKind::Track => "track",
            ResourceKind::Album => "album",
            ResourceKind::Artist => "artist",
            ResourceKind::Playlist => "playlist",
            ResourceKind::Show => "show",
            ResourceKind::Episode => "episode",
            ResourceKind::Chapter => "chapter",
            ResourceKind::Audiobook => "audiobook",
            ResourceKind::User => "user",
        }
    }

    /// REST collection segment as used in Web API paths.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Track => "tracks",
            ResourceKind::Album => "albums",
            ResourceKind::Artist => "artists",
            ResourceKind::Playlist => "playlists",
            ResourceKind::Show => "shows",
            ResourceKind::Episode => "episodes",
            ResourceKind::Chapter => "chapters",
            ResourceKind::Audiobook => "audiobooks",
            ResourceKind::User => "users",
        }
    }

    fn from_segment(segment: &str) -> Option<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| segment == kind.keyword() || segment == kind.collection())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// A fully resolved identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    /// Host the identifier came from (web URLs keep theirs, URIs get the
    /// public web host).
    pub hostname: String,
    pub kind: ResourceKind,
    pub id: String,
    /// REST path for the item, e.g. `/tracks/abc123`.
    pub endpoint: String,
    /// Canonical `spotify:<type>:<id>` form.
    pub uri: String,
}

impl ResolvedId {
    fn new(hostname: &str, kind: ResourceKind, id: &str) -> ResolvedId {
        ResolvedId {
            hostname: hostname.to_string(),
            kind,
            id: id.to_string(),
            endpoint: format!("/{}/{}", kind.collection(), id),
            uri: format!("spotify:{}:{}", kind.keyword(), id),
        }
    }
}

/// Resolves a Spotify URL or URI into its type, id and REST endpoint.
///
/// Fails with [`Error::InvalidIdentifier`] when the input is none of the
/// recognized shapes; callers commonly fall back to treating the input as
/// a raw id in that case.
pub fn resolve(identifier: &str) -> Result<ResolvedId> {
    let identifier = identifier.trim();

    if let Some(rest) = identifier.strip_prefix("spotify:") {
        return resolve_uri(identifier, rest);
    }

    let url = Url::parse(identifier)
        .map_err(|_| Error::InvalidIdentifier(identifier.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::InvalidIdentifier(identifier.to_string()))?;
    if host != OPEN_HOST && host != API_HOST {
        return Err(Error::InvalidIdentifier(identifier.to_string()));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    // Web links may carry locale ("intl-de") or "embed" prefixes and API
    // paths start with a version segment; scan for the first recognized
    // type keyword with an id right behind it.
    for (i, segment) in segments.iter().enumerate() {
        if let Some(kind) = ResourceKind::from_segment(segment) {
            if let Some(id) = segments.get(i + 1) {
                return Ok(ResolvedId::new(host, kind, id));
            }
        }
    }

    Err(Error::InvalidIdentifier(identifier.to_string()))
}

fn resolve_uri(identifier: &str, rest: &str) -> Result<ResolvedId> {
    let parts: Vec<&str> = rest.split(':').collect();

    // Scan from the back so nested forms like spotify:user:x:playlist:y
    // resolve to the innermost item.
    for i in (0..parts.len().saturating_sub(1)).rev() {
        if let Some(kind) = ResourceKind::from_segment(parts[i]) {
            let id = parts[i + 1];
            if !id.is_empty() {
                return Ok(ResolvedId::new(OPEN_HOST, kind, id));
            }
        }
    }

    Err(Error::InvalidIdentifier(identifier.to_string()))
}

/// Non-throwing predicate form of [`resolve`].
pub fn is_resolvable(identifier: &str) -> bool {
    resolve(identifier).is_ok()
}
