use super::types::FileRecord;

const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp", "heic"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// Days a file stays in the bin before the backend purges it
pub const TRASH_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

impl FileRecord {
    pub fn is_image(&self) -> bool {
        self.kind.as_deref() == Some("img") || has_extension(&self.name, IMAGE_EXTENSIONS)
    }

    pub fn is_video(&self) -> bool {
        self.kind.as_deref() == Some("video") || has_extension(&self.name, VIDEO_EXTENSIONS)
    }

    pub fn media_kind(&self) -> MediaKind {
        if self.is_image() {
            MediaKind::Image
        } else if self.is_video() {
            MediaKind::Video
        } else {
            MediaKind::Document
        }
    }

    pub fn is_created_by(&self, user_name: &str) -> bool {
        self.uploaded_by.as_deref() == Some(user_name)
    }
}

/// Files shown for a view: the folder's files, or the recent list at the root.
pub fn files_in_view<'a>(
    files: &'a [FileRecord],
    recent: &'a [FileRecord],
    folder_id: Option<&str>,
) -> Vec<&'a FileRecord> {
    match folder_id {
        Some(folder_id) => files
            .iter()
            .filter(|file| file.folder_id.as_deref() == Some(folder_id))
            .collect(),
        None => recent.iter().collect(),
    }
}

/// Next file after `current_id` in a listing, stopping at the end.
pub fn next_file<'a>(listing: &[&'a FileRecord], current_id: &str) -> Option<&'a FileRecord> {
    let index = listing.iter().position(|file| file.id == current_id)?;
    listing.get(index + 1).copied()
}

/// Previous file before `current_id` in a listing, stopping at the start.
pub fn previous_file<'a>(listing: &[&'a FileRecord], current_id: &str) -> Option<&'a FileRecord> {
    let index = listing.iter().position(|file| file.id == current_id)?;
    index.checked_sub(1).and_then(|previous| listing.get(previous).copied())
}

/// Public link for a shared folder.
pub fn share_link(origin: &str, share_id: &str) -> String {
    format!("{}/share/{}", origin.trim_end_matches('/'), share_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, name: &str, kind: Option<&str>, folder: Option<&str>) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: name.to_string(),
            size: None,
            kind: kind.map(String::from),
            uploaded_by: Some("Guest".to_string()),
            folder_id: folder.map(String::from),
            created_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_media_classification() {
        assert_eq!(file("1", "IMG_0001.HEIC", None, None).media_kind(), MediaKind::Image);
        assert_eq!(file("2", "scan", Some("img"), None).media_kind(), MediaKind::Image);
        assert_eq!(file("3", "clip.MOV", None, None).media_kind(), MediaKind::Video);
        assert_eq!(file("4", "notes.pdf", None, None).media_kind(), MediaKind::Document);
        assert_eq!(file("5", "jpg", None, None).media_kind(), MediaKind::Document);
    }

    #[test]
    fn test_view_and_navigation() {
        let files = vec![
            file("a", "a.jpg", None, Some("d1")),
            file("b", "b.jpg", None, Some("d2")),
            file("c", "c.jpg", None, Some("d1")),
        ];
        let recent = vec![file("b", "b.jpg", None, Some("d2"))];

        let view = files_in_view(&files, &recent, Some("d1"));
        assert_eq!(view.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(), ["a", "c"]);
        assert_eq!(files_in_view(&files, &recent, None).len(), 1);

        assert_eq!(next_file(&view, "a").map(|f| f.id.as_str()), Some("c"));
        assert!(next_file(&view, "c").is_none());
        assert_eq!(previous_file(&view, "c").map(|f| f.id.as_str()), Some("a"));
        assert!(previous_file(&view, "a").is_none());
        assert!(next_file(&view, "missing").is_none());
    }

    #[test]
    fn test_share_link() {
        assert_eq!(share_link("https://cloud.example/", "abc"), "https://cloud.example/share/abc");
    }

    #[test]
    fn test_creator() {
        let f = file("a", "a.jpg", None, None);
        assert!(f.is_created_by("Guest"));
        assert!(!f.is_created_by("Dad"));
    }
}
