//! Class listings for classpath roots: jar archives and class directories.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::classfile;
use crate::error::IndexBuildError;
use crate::project::scan_files;

/// Largest class file accepted from an archive. The header's declared size is
/// only a hint and never sizes an allocation beyond this.
const MAX_CLASS_BYTES: u64 = 16 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Dotted binary name, e.g. `java.util.Map$Entry`.
    pub binary_name: String,
    /// Entry name inside the root, e.g. `java/util/Map$Entry.class`.
    pub entry: String,
    pub deprecated: bool,
}

pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"))
}

pub fn catalog_archive(archive_path: &Path) -> Result<Vec<CatalogEntry>, IndexBuildError> {
    let io_err = |source| IndexBuildError::Io {
        path: archive_path.to_path_buf(),
        source,
    };
    let zip_err = |source| IndexBuildError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(io_err)?;
    // SAFETY: The file is opened read-only and remains valid for the lifetime of the mmap.
    // The mmap is dropped before the file, ensuring memory safety.
    let mmap = unsafe { Mmap::map(&file) }.map_err(io_err)?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..])).map_err(zip_err)?;

    let mut classes = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_err)?;
        let name = entry.name().to_string();
        let Some(binary_name) = binary_name_of_entry(&name) else {
            continue;
        };

        let declared = entry.size();
        let bytes = read_class_bytes(&mut entry, declared, MAX_CLASS_BYTES).map_err(|source| {
            IndexBuildError::Io {
                path: archive_path.join(&name),
                source,
            }
        })?;
        classes.push(CatalogEntry {
            deprecated: deprecated_or_log(&bytes, &name),
            binary_name,
            entry: name,
        });
    }
    Ok(classes)
}

pub fn catalog_directory(dir: &Path) -> Result<Vec<CatalogEntry>, IndexBuildError> {
    let mut files = scan_files(dir, |p| p.extension().is_some_and(|e| e == "class"));
    files.sort();

    let mut classes = Vec::with_capacity(files.len());
    for path in files {
        let Ok(rel) = path.strip_prefix(dir) else {
            continue;
        };
        let entry = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let Some(binary_name) = binary_name_of_entry(&entry) else {
            continue;
        };

        let bytes = std::fs::read(&path).map_err(|source| IndexBuildError::Io {
            path: path.clone(),
            source,
        })?;
        classes.push(CatalogEntry {
            deprecated: deprecated_or_log(&bytes, &entry),
            binary_name,
            entry,
        });
    }
    Ok(classes)
}

/// Reads at most `limit` bytes; anything longer is `InvalidData`.
fn read_class_bytes(reader: impl Read, declared: u64, limit: u64) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(declared.min(limit) as usize);
    reader.take(limit + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("class file larger than {limit} bytes"),
        ));
    }
    Ok(bytes)
}

/// Maps `a/b/C$D.class` to `a.b.C$D`.
///
/// Module and package descriptors and anonymous or local classes (`C$1`,
/// `C$1Local`) are not addressable from source and yield `None`.
pub fn binary_name_of_entry(entry: &str) -> Option<String> {
    let stem = entry.strip_suffix(".class")?;
    let simple = stem.rsplit('/').next().unwrap_or(stem);
    if simple == "module-info" || simple == "package-info" {
        return None;
    }
    if simple
        .split('$')
        .skip(1)
        .any(|part| part.is_empty() || part.starts_with(|c: char| c.is_ascii_digit()))
    {
        return None;
    }
    Some(stem.replace(['/', '\\'], "."))
}

fn deprecated_or_log(bytes: &[u8], entry: &str) -> bool {
    match classfile::is_deprecated(bytes) {
        Ok(deprecated) => deprecated,
        Err(err) => {
            tracing::trace!(entry, error = %err, "unreadable class file, assuming not deprecated");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::tests::{deprecated_class, plain_class};
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "classpath_bridge_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }

        zip.finish()?;
        Ok(())
    }

    #[test]
    fn binary_name_of_entry_keeps_member_classes_only() {
        assert_eq!(
            binary_name_of_entry("java/util/Map$Entry.class").as_deref(),
            Some("java.util.Map$Entry")
        );
        assert_eq!(
            binary_name_of_entry("Top.class").as_deref(),
            Some("Top")
        );
        assert_eq!(binary_name_of_entry("a/B$1.class"), None);
        assert_eq!(binary_name_of_entry("a/B$1Local.class"), None);
        assert_eq!(binary_name_of_entry("a/package-info.class"), None);
        assert_eq!(binary_name_of_entry("module-info.class"), None);
        assert_eq!(binary_name_of_entry("META-INF/MANIFEST.MF"), None);
    }

    #[test]
    fn catalog_archive_reads_names_and_deprecation() -> anyhow::Result<()> {
        let jar = temp_path("catalog_ok.jar");
        let fresh = plain_class("org/example/A");
        let old = deprecated_class("org/example/A$Old");
        write_jar(
            &jar,
            &[
                ("org/example/A.class", fresh.as_slice()),
                ("org/example/A$Old.class", old.as_slice()),
                ("org/example/A$1.class", b""),
                ("org/example/Stub.class", b""),
                ("META-INF/MANIFEST.MF", b""),
            ],
        )?;

        let mut classes = catalog_archive(&jar)?;
        classes.sort_by(|a, b| a.binary_name.cmp(&b.binary_name));
        let names: Vec<_> = classes.iter().map(|c| c.binary_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["org.example.A", "org.example.A$Old", "org.example.Stub"]
        );
        assert!(!classes[0].deprecated);
        assert!(classes[1].deprecated);
        assert_eq!(classes[1].entry, "org/example/A$Old.class");
        assert!(!classes[2].deprecated);

        std::fs::remove_file(jar)?;
        Ok(())
    }

    #[test]
    fn catalog_archive_rejects_non_zip() {
        let jar = temp_path("broken.jar");
        std::fs::write(&jar, b"not a zip").unwrap();
        assert!(matches!(
            catalog_archive(&jar),
            Err(IndexBuildError::Archive { .. })
        ));
        let _ = std::fs::remove_file(jar);
    }

    /// Stored zip with one empty `a/Big.class` whose central directory claims
    /// `declared` uncompressed bytes through a zip64 extra field.
    fn zip_with_declared_size(declared: u64) -> Vec<u8> {
        let name = b"a/Big.class";
        let mut out = Vec::new();

        // local file header
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&[20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        out.extend_from_slice(&[0; 12]); // crc, compressed, uncompressed
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&[45, 0, 45, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        out.extend_from_slice(&0u32.to_le_bytes()); // crc
        out.extend_from_slice(&0u32.to_le_bytes()); // compressed
        out.extend_from_slice(&u32::MAX.to_le_bytes()); // uncompressed, see extra
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&12u16.to_le_bytes());
        out.extend_from_slice(&[0; 6]); // comment length, disk, internal attributes
        out.extend_from_slice(&[0; 4]); // external attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        out.extend_from_slice(name);
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&declared.to_le_bytes());
        let cd_size = out.len() as u32 - cd_offset;

        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn catalog_archive_ignores_overstated_entry_size() -> anyhow::Result<()> {
        let jar = temp_path("overstated.jar");
        std::fs::write(&jar, zip_with_declared_size(1 << 62))?;

        let classes = catalog_archive(&jar)?;
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].binary_name, "a.Big");
        assert!(!classes[0].deprecated);

        std::fs::remove_file(jar)?;
        Ok(())
    }

    #[test]
    fn read_class_bytes_rejects_oversized_entries() {
        let bytes = read_class_bytes(&b"CAFE"[..], u64::MAX, 4).unwrap();
        assert_eq!(bytes, b"CAFE");

        let err = read_class_bytes(&b"CAFEBABE"[..], 2, 4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn catalog_directory_walks_class_files() -> anyhow::Result<()> {
        let dir = temp_path("classes");
        std::fs::create_dir_all(dir.join("org/example"))?;
        std::fs::write(dir.join("org/example/B.class"), deprecated_class("org/example/B"))?;
        std::fs::write(dir.join("org/example/B.java"), "class B {}")?;

        let classes = catalog_directory(&dir)?;
        assert_eq!(
            classes,
            vec![CatalogEntry {
                binary_name: "org.example.B".to_string(),
                entry: "org/example/B.class".to_string(),
                deprecated: true,
            }]
        );

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[test]
    fn is_archive_matches_jar_and_zip() {
        assert!(is_archive(Path::new("lib/a.jar")));
        assert!(is_archive(Path::new("lib/A.ZIP")));
        assert!(!is_archive(Path::new("lib/classes")));
    }
}
