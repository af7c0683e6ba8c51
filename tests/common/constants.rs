//! Shared constants for end-to-end tests

// ============================================================================
// Catalog IDs
// ============================================================================

/// Artist of "First Album"
pub const ARTIST_1_ID: &str = "artist-1";

/// Artist of "Jazz Collection"
pub const ARTIST_2_ID: &str = "artist-2";

pub const ALBUM_1_ID: &str = "album-1";

pub const ALBUM_2_ID: &str = "album-2";

/// "Opening Track" on First Album, 3 minutes
pub const TRACK_1_ID: &str = "track-1";

/// "Second Song" on First Album, 4 minutes
pub const TRACK_2_ID: &str = "track-2";

/// "Blue Hour" on Jazz Collection, 6 minutes
pub const TRACK_3_ID: &str = "track-3";

// ============================================================================
// Mail
// ============================================================================

pub const SENDER: &str = "recap@example.com";

pub const RECIPIENT: &str = "listener@example.com";
