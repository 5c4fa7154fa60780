use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "3g2", "3gp2", "3gp", "3gpp", "aax", "ai", "ait", "arq", "arw", "avif", "cr2", "cr3", "crm",
    "crw", "ciff", "cs1", "dcp", "dng", "dr4", "dvb", "eps", "epsf", "ps", "erf", "exv", "f4a",
    "f4b", "f4p", "f4v", "fff", "flif", "gif", "gpr", "hdp", "wdp", "jxr", "heic", "heif", "iiq",
    "ind", "indd", "indt", "insp", "jp2", "jpf", "jpm", "jpx", "jpeg", "jpg", "jpe", "lrv", "m4a",
    "m4b", "m4p", "m4v", "mef", "mie", "mos", "mov", "qt", "mp4", "mpo", "mqv", "nef", "nrw",
    "orf", "pdf", "pef", "png", "jng", "mng", "ppm", "pbm", "pgm", "psd", "psb", "psdt", "qtif",
    "qti", "qif", "raf", "raw", "rw2", "rwl", "sr2", "srw", "thm", "tiff", "tif", "x3f", "webp",
];

/// Whether ExifTool can write metadata for this file type, judged by extension.
#[must_use]
pub fn is_supported_file(path: &Path) -> bool {
    path.extension().is_some_and(|extension| {
        let ext = extension.to_string_lossy().to_lowercase();
        SUPPORTED_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Expand files and directories (walked recursively, links not followed) into
/// supported files, keeping the order the inputs were given in.
#[must_use]
pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut file_paths = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_file(path) {
                file_paths.push(path.clone());
            }
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file() && is_supported_file(entry.path()))
                .map(walkdir::DirEntry::into_path)
                .collect();
            debug!("Expanded {} into {} files", path.display(), found.len());
            file_paths.append(&mut found);
        } else {
            debug!("Skipping missing input {}", path.display());
        }
    }

    file_paths
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{expand_paths, is_supported_file};

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported_file(Path::new("IMG_0001.JPG")));
        assert!(is_supported_file(Path::new("scan.tiff")));
        assert!(!is_supported_file(Path::new("notes.txt")));
        assert!(!is_supported_file(Path::new("Makefile")));
    }

    #[test]
    fn expand_walks_directories_and_filters_types() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let album = temp.path().join("album");
        std::fs::create_dir_all(album.join("nested")).expect("album tree should be created");
        std::fs::write(album.join("b.jpg"), b"").expect("jpg should be written");
        std::fs::write(album.join("a.png"), b"").expect("png should be written");
        std::fs::write(album.join("readme.md"), b"").expect("md should be written");
        std::fs::write(album.join("nested/c.heic"), b"").expect("heic should be written");
        let single = temp.path().join("single.pdf");
        std::fs::write(&single, b"").expect("pdf should be written");

        let expanded = expand_paths(&[
            single.clone(),
            album.clone(),
            temp.path().join("missing.jpg"),
        ]);

        let expected: Vec<PathBuf> = vec![
            single,
            album.join("a.png"),
            album.join("b.jpg"),
            album.join("nested/c.heic"),
        ];
        assert_eq!(expanded, expected);
    }
}
