//! Image metadata, storage keys and the random display attributes of a new
//! board.

use super::error::BoardError;
use image::ImageReader;
use rand::Rng;
use rand::seq::SliceRandom;
use std::borrow::Cow;
use std::io::Cursor;
use std::ops::RangeInclusive;

/// Length of the random hex prefix on storage keys.
const KEY_PREFIX_LEN: usize = 10;

/// Reads `(width, height)` from encoded image bytes, sniffing the format.
pub fn image_dimensions(bytes: &[u8]) -> Result<(i32, i32), BoardError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BoardError::InvalidImage(e.to_string()))?
        .into_dimensions()
        .map_err(|e| BoardError::InvalidImage(e.to_string()))?;

    let width =
        i32::try_from(width).map_err(|_| BoardError::InvalidImage("width overflow".to_owned()))?;
    let height =
        i32::try_from(height).map_err(|_| BoardError::InvalidImage("height overflow".to_owned()))?;
    Ok((width, height))
}

/// Final path component of an uploaded file's name.
pub fn sanitize_file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Object key for a fresh upload: 10 lowercase hex characters followed by
/// the sanitized file name.
pub fn storage_key(file_name: &str) -> String {
    let prefix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}{}",
        &prefix[..KEY_PREFIX_LEN],
        sanitize_file_name(file_name)
    )
}

/// Key of the object a stored image URL points at.
///
/// Public URLs carry the key percent-encoded; a segment that does not decode
/// to UTF-8 is used as is.
pub fn key_from_url(url: &str) -> Cow<'_, str> {
    let segment = url.rsplit('/').next().unwrap_or(url);
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

pub fn pick_color<R: Rng + ?Sized>(palette: &[String], rng: &mut R) -> Option<String> {
    palette.choose(rng).cloned()
}

pub fn pick_tag_id<R: Rng + ?Sized>(tag_ids: RangeInclusive<i64>, rng: &mut R) -> i64 {
    rng.gen_range(tag_ids)
}
