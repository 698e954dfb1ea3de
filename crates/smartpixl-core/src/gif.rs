//! The fixed 1x1 transparent GIF89a payload and its response headers
//! (spec §6.1). A single `&'static [u8]` constant — there's nothing to
//! parameterize, so this stays a plain module rather than a type.

/// `R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7` base64-decoded.
pub const TRANSPARENT_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

pub const GIF_CONTENT_TYPE: &str = "image/gif";
pub const JS_CONTENT_TYPE: &str = "application/javascript";
pub const CACHE_CONTROL_NO_CACHE: &str = "no-cache, no-store, must-revalidate";
pub const PRAGMA_NO_CACHE: &str = "no-cache";
pub const EXPIRES_ZERO: &str = "0";
pub const X_CONTENT_TYPE_OPTIONS_NOSNIFF: &str = "nosniff";
