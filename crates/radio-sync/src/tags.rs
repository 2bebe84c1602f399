//! ID3 tagging using lofty
//!
//! Every download gets both an ID3v1 tag (for old players) and an ID3v2.4
//! tag carrying the same title, album and artist.

use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::id3::v1::Id3v1Tag;
use lofty::id3::v2::Id3v2Tag;
use lofty::mpeg::MpegFile;
use lofty::tag::{Accessor, TagExt, TagType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{Stage, SyncError};
use crate::materialize::staging_file;

/// What happens to tag fields this tool does not manage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagPolicy {
    /// Keep every other ID3v1/ID3v2 field the file already has.
    #[default]
    Preserve,
    /// Drop all existing ID3v1, ID3v2 and APE tags first.
    Clear,
}

/// The three fields written to every download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFields {
    pub title: String,
    pub album: String,
    pub artist: String,
}

impl TagFields {
    fn first_blank(&self) -> Option<&'static str> {
        [("title", &self.title), ("album", &self.album), ("artist", &self.artist)]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
    }
}

/// Tag values read back from a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSnapshot {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadTags {
    pub id3v2: Option<TagSnapshot>,
    pub id3v1: Option<TagSnapshot>,
}

/// Write `fields` into the MP3 at `local_path`.
///
/// The file must exist. A file with no ID3 header gets fresh tags. The tags
/// are written into a copy which then replaces `local_path`, so a concurrent
/// run never observes a half-written file.
pub async fn write_tags(
    local_path: &Path,
    fields: &TagFields,
    policy: TagPolicy,
) -> Result<(), SyncError> {
    // Use blocking task for file I/O
    let path = local_path.to_path_buf();
    let fields = fields.clone();

    tokio::task::spawn_blocking(move || write_tags_blocking(&path, &fields, policy))
        .await
        .map_err(|e| {
            SyncError::filesystem(
                Stage::Tag,
                local_path,
                std::io::Error::new(std::io::ErrorKind::Other, e),
            )
        })?
}

pub fn write_tags_blocking(
    local_path: &Path,
    fields: &TagFields,
    policy: TagPolicy,
) -> Result<(), SyncError> {
    if let Some(name) = fields.first_blank() {
        return Err(SyncError::malformed(
            Stage::Tag,
            format!("refusing to write an empty {name} tag to {}", local_path.display()),
        ));
    }
    let fs_err = |e| SyncError::filesystem(Stage::Tag, local_path, e);

    let mut staging = staging_file(local_path, Stage::Tag)?;
    let mut source = std::fs::File::open(local_path).map_err(fs_err)?;
    std::io::copy(&mut source, staging.as_file_mut()).map_err(fs_err)?;
    drop(source);
    staging.as_file().sync_all().map_err(fs_err)?;

    tag_file(staging.path(), fields, policy).map_err(|source| SyncError::Tagging {
        path: local_path.to_path_buf(),
        source,
    })?;

    staging
        .persist(local_path)
        .map_err(|e| SyncError::filesystem(Stage::Tag, local_path, e.error))?;
    Ok(())
}

fn tag_file(path: &Path, fields: &TagFields, policy: TagPolicy) -> lofty::error::Result<()> {
    let mpeg = read_mpeg(path)?;

    let (mut id3v2, mut id3v1) = match policy {
        TagPolicy::Preserve => {
            let id3v2 = mpeg.id3v2().cloned().unwrap_or_else(|| {
                debug!("Adding ID3 header");
                Id3v2Tag::default()
            });
            (id3v2, mpeg.id3v1().cloned().unwrap_or_default())
        }
        TagPolicy::Clear => {
            debug!("Removing tags");
            for tag_type in [TagType::Id3v2, TagType::Id3v1, TagType::Ape] {
                tag_type.remove_from_path(path)?;
            }
            (Id3v2Tag::default(), Id3v1Tag::default())
        }
    };

    apply(&mut id3v2, fields);
    apply(&mut id3v1, fields);

    debug!("Saving tags");
    id3v2.save_to_path(path, WriteOptions::default())?;
    id3v1.save_to_path(path, WriteOptions::default())?;
    Ok(())
}

fn apply<T: Accessor>(tag: &mut T, fields: &TagFields) {
    tag.set_title(fields.title.clone());
    tag.set_album(fields.album.clone());
    tag.set_artist(fields.artist.clone());
}

fn read_mpeg(path: &Path) -> lofty::error::Result<MpegFile> {
    let mut file = std::fs::File::open(path)?;
    MpegFile::read_from(&mut file, ParseOptions::new().read_properties(false))
}

/// Read the tags back (for verification)
pub fn read_tags(local_path: &Path) -> Result<ReadTags, SyncError> {
    let mpeg = read_mpeg(local_path).map_err(|source| SyncError::Tagging {
        path: local_path.to_path_buf(),
        source,
    })?;

    Ok(ReadTags {
        id3v2: mpeg.id3v2().map(snapshot),
        id3v1: mpeg.id3v1().map(snapshot),
    })
}

fn snapshot<T: Accessor>(tag: &T) -> TagSnapshot {
    TagSnapshot {
        title: tag.title().map(|s| s.into_owned()),
        album: tag.album().map(|s| s.into_owned()),
        artist: tag.artist().map(|s| s.into_owned()),
        genre: tag.genre().map(|s| s.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A few silent MPEG-1 Layer III frames (128 kbit/s, 44.1 kHz).
    fn silent_mp3() -> Vec<u8> {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        frame.repeat(8)
    }

    fn fields() -> TagFields {
        TagFields {
            title: "Morning Drive #12".into(),
            album: "Morning Drive".into(),
            artist: "Alice,Bob".into(),
        }
    }

    fn seed_with_genre(path: &Path) {
        std::fs::write(path, silent_mp3()).unwrap();
        let mut v2 = Id3v2Tag::default();
        v2.set_title("Old title".into());
        v2.set_genre("Jazz".into());
        v2.save_to_path(path, WriteOptions::default()).unwrap();
    }

    #[test]
    fn test_tags_file_without_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show-newest.mp3");
        std::fs::write(&path, silent_mp3()).unwrap();
        assert_eq!(read_tags(&path).unwrap().id3v2, None);

        write_tags_blocking(&path, &fields(), TagPolicy::Preserve).unwrap();

        let read = read_tags(&path).unwrap();
        for snap in [read.id3v2.unwrap(), read.id3v1.unwrap()] {
            assert_eq!(snap.title.as_deref(), Some("Morning Drive #12"));
            assert_eq!(snap.album.as_deref(), Some("Morning Drive"));
            assert_eq!(snap.artist.as_deref(), Some("Alice,Bob"));
        }
    }

    #[test]
    fn test_preserve_keeps_unmanaged_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show-newest.mp3");
        seed_with_genre(&path);

        write_tags_blocking(&path, &fields(), TagPolicy::Preserve).unwrap();

        let v2 = read_tags(&path).unwrap().id3v2.unwrap();
        assert_eq!(v2.title.as_deref(), Some("Morning Drive #12"));
        assert_eq!(v2.genre.as_deref(), Some("Jazz"));
    }

    #[test]
    fn test_clear_drops_unmanaged_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show-newest.mp3");
        seed_with_genre(&path);

        write_tags_blocking(&path, &fields(), TagPolicy::Clear).unwrap();

        let v2 = read_tags(&path).unwrap().id3v2.unwrap();
        assert_eq!(v2.title.as_deref(), Some("Morning Drive #12"));
        assert_eq!(v2.artist.as_deref(), Some("Alice,Bob"));
        assert_eq!(v2.genre, None);
    }

    #[test]
    fn test_retagging_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show-newest.mp3");
        std::fs::write(&path, silent_mp3()).unwrap();

        write_tags_blocking(&path, &fields(), TagPolicy::Preserve).unwrap();
        let first = read_tags(&path).unwrap();

        write_tags_blocking(&path, &fields(), TagPolicy::Preserve).unwrap();
        assert_eq!(read_tags(&path).unwrap(), first);
    }

    #[test]
    fn test_missing_file_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let err = write_tags_blocking(&dir.path().join("nope.mp3"), &fields(), TagPolicy::Preserve)
            .unwrap_err();
        assert!(matches!(err, SyncError::Filesystem { stage: Stage::Tag, .. }));
        // no staging residue
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_blank_field_is_rejected_before_touching_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show-newest.mp3");
        std::fs::write(&path, silent_mp3()).unwrap();

        let mut blank = fields();
        blank.album = " ".into();
        let err = write_tags_blocking(&path, &blank, TagPolicy::Preserve).unwrap_err();

        assert!(matches!(err, SyncError::Malformed { stage: Stage::Tag, .. }));
        assert_eq!(std::fs::read(&path).unwrap(), silent_mp3());
    }

    #[test]
    fn test_concurrent_writers_leave_one_whole_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show-newest.mp3");
        std::fs::write(&path, silent_mp3()).unwrap();

        let mut other = fields();
        other.title = "Morning Drive #13".into();
        other.artist = "Carol".into();
        let writers = [fields(), other.clone()];

        std::thread::scope(|scope| {
            for f in &writers {
                let path = &path;
                scope.spawn(move || {
                    for _ in 0..5 {
                        write_tags_blocking(path, f, TagPolicy::Clear).unwrap();
                    }
                });
            }
        });

        let read = read_tags(&path).unwrap();
        let v2 = read.id3v2.unwrap();
        let winner = writers
            .iter()
            .find(|f| v2.title.as_deref() == Some(f.title.as_str()))
            .expect("title from one of the writers");
        assert_eq!(v2.album.as_deref(), Some(winner.album.as_str()));
        assert_eq!(v2.artist.as_deref(), Some(winner.artist.as_str()));
        assert_eq!(read.id3v1.unwrap().title.as_deref(), Some(winner.title.as_str()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_async_write_tags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("show-newest.mp3");
        std::fs::write(&path, silent_mp3()).unwrap();

        write_tags(&path, &fields(), TagPolicy::Clear).await.unwrap();
        let v1 = read_tags(&path).unwrap().id3v1.unwrap();
        assert_eq!(v1.album.as_deref(), Some("Morning Drive"));
    }
}
