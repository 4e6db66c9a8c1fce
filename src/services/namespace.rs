//! Key namespace rules for the gallery bucket.
//!
//! The bucket is flat. Keys under `trash/` are soft-deleted items; every
//! other key is live. A live key `K` and its trashed form `trash/K` map one
//! to one, and these helpers are the only place that mapping is spelled out.

/// Prefix that marks a key as soft-deleted.
pub const TRASH_PREFIX: &str = "trash/";

/// Physical key a live item occupies once moved to the trash.
pub fn trash_key(key: &str) -> String {
    format!("{TRASH_PREFIX}{key}")
}

/// Original key of a trashed object, or `None` when `physical` is not in the
/// trash namespace or is the bare prefix (a folder placeholder).
pub fn original_key(physical: &str) -> Option<&str> {
    physical
        .strip_prefix(TRASH_PREFIX)
        .filter(|stripped| !stripped.is_empty())
}

pub fn is_trashed(key: &str) -> bool {
    key.starts_with(TRASH_PREFIX)
}

/// Key to read when exporting `key` from either namespace.
pub fn physical_key(key: &str, from_trash: bool) -> String {
    if from_trash {
        trash_key(key)
    } else {
        key.to_string()
    }
}

/// Flat archive entry name: the last path segment of the logical key.
pub fn entry_name(key: &str) -> &str {
    match key.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => key,
    }
}

/// Key an upload is stored under.
///
/// Without a usable custom name the original filename is the key. A custom
/// name that already ends in an extension is used verbatim; otherwise the
/// extension of the original filename (everything from its last `.`) is
/// appended so a rename never drops the file type.
pub fn upload_key(original_filename: &str, custom_name: Option<&str>) -> String {
    let custom = custom_name.map(str::trim).filter(|name| !name.is_empty());
    let Some(custom) = custom else {
        return original_filename.to_string();
    };

    if has_extension(custom) {
        return custom.to_string();
    }

    let extension = original_filename
        .rfind('.')
        .map(|dot| &original_filename[dot..])
        .unwrap_or("");
    format!("{custom}{extension}")
}

/// True when `name` ends in `.<ext>` where `<ext>` is non-empty and holds no
/// dot or path separator.
fn has_extension(name: &str) -> bool {
    match name.rfind('.') {
        Some(dot) => {
            let ext = &name[dot + 1..];
            !ext.is_empty() && !ext.contains(['/', '\\'])
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trash_mapping_is_a_bijection() {
        for key in ["a.png", "2024/summer/b.jpg", "trash-can.gif"] {
            let trashed = trash_key(key);
            assert!(is_trashed(&trashed));
            assert_eq!(original_key(&trashed), Some(key));
        }
    }

    #[test]
    fn folder_placeholder_has_no_original() {
        assert_eq!(original_key("trash/"), None);
        assert_eq!(original_key("photos/a.png"), None);
        assert!(!is_trashed("trashy.png"));
    }

    #[test]
    fn physical_key_depends_on_namespace() {
        assert_eq!(physical_key("a/b.png", true), "trash/a/b.png");
        assert_eq!(physical_key("a/b.png", false), "a/b.png");
    }

    #[test]
    fn entry_name_collapses_folders() {
        assert_eq!(entry_name("2024/summer/beach.jpg"), "beach.jpg");
        assert_eq!(entry_name("beach.jpg"), "beach.jpg");
        assert_eq!(entry_name("odd/"), "odd/");
    }

    #[test]
    fn custom_name_without_extension_borrows_original() {
        assert_eq!(upload_key("IMG001.jpg", Some("vacation")), "vacation.jpg");
        assert_eq!(upload_key("clip.tar.gz", Some("backup")), "backup.gz");
        assert_eq!(upload_key("README", Some("notes")), "notes");
    }

    #[test]
    fn custom_name_with_extension_is_verbatim() {
        assert_eq!(upload_key("IMG001.jpg", Some("vacation.png")), "vacation.png");
        assert_eq!(upload_key("IMG001.jpg", Some("  trip.webp ")), "trip.webp");
    }

    #[test]
    fn dot_inside_a_folder_is_not_an_extension() {
        assert_eq!(upload_key("a.jpg", Some("v1.2/photo")), "v1.2/photo.jpg");
        assert_eq!(upload_key("a.jpg", Some("name.")), "name..jpg");
    }

    #[test]
    fn blank_custom_name_falls_back_to_filename() {
        assert_eq!(upload_key("IMG001.jpg", None), "IMG001.jpg");
        assert_eq!(upload_key("IMG001.jpg", Some("   ")), "IMG001.jpg");
    }
}
