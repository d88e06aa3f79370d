//! Host-side behavior of the archive backing.

use std::fs;

use scriptvol::{Archive, FileContent, NewlineStyle, Volume, VolumePath};
use tempfile::TempDir;

fn path(text: &str) -> VolumePath {
    VolumePath::from_string(text).unwrap()
}

fn archive(newline: NewlineStyle) -> (TempDir, Volume) {
    let temp = TempDir::new().unwrap();
    let volume = Volume::new(Archive::with_newline(temp.path().join("root"), newline).unwrap());
    (temp, volume)
}

#[test]
fn test_text_round_trip_is_lossless_for_both_styles() {
    let samples = [
        "plain",
        "line one\nline two\n",
        "windows\r\nstyle\r\n",
        "mixed\n\r\n\r\r\n",
        "trailing cr\r",
    ];
    for style in [NewlineStyle::Lf, NewlineStyle::CrLf] {
        let (_temp, volume) = archive(style);
        for (index, sample) in samples.iter().enumerate() {
            let target = path(&format!("/sample{index}.txt"));
            volume.save_file(&target, &FileContent::from_string(sample), true).unwrap();
            let read = volume.open_file(&target, false).unwrap().unwrap().read_all().unwrap();
            assert_eq!(read.as_string(), *sample, "style {style:?}");
        }
    }
}

#[test]
fn test_lf_style_writes_bytes_unchanged() {
    let (temp, volume) = archive(NewlineStyle::Lf);
    volume.save_file(&path("/a.txt"), &"x\ny\n".into(), true).unwrap();
    assert_eq!(fs::read(temp.path().join("root").join("a.txt")).unwrap(), b"x\ny\n");
}

#[test]
fn test_host_files_are_visible() {
    let (temp, volume) = archive(NewlineStyle::Lf);
    let root = temp.path().join("root");
    fs::create_dir_all(root.join("boot")).unwrap();
    fs::write(root.join("boot").join("launch.ks"), "print 1.").unwrap();

    let file = volume.open_file(&path("/boot/launch"), false).unwrap().unwrap();
    assert_eq!(file.name(), "launch.ks");
    assert_eq!(file.read_all().unwrap().as_string(), "print 1.");
    assert_eq!(volume.size(), 8);
}

#[test]
fn test_siblings_of_root_are_unreachable() {
    let (temp, volume) = archive(NewlineStyle::Lf);
    fs::write(temp.path().join("secret"), "x").unwrap();

    let outside = path("/../secret");
    assert!(volume.open(&outside, false).unwrap_err().is_invalid_path());
    assert!(volume.save_file(&outside, &"y".into(), true).unwrap_err().is_invalid_path());
    assert_eq!(fs::read_to_string(temp.path().join("secret")).unwrap(), "x");
}

#[test]
fn test_root_with_similar_prefix_is_not_inside() {
    let temp = TempDir::new().unwrap();
    let volume = Volume::new(Archive::new(temp.path().join("data")).unwrap());
    fs::create_dir(temp.path().join("data2")).unwrap();

    volume.create_directory(&path("/dir")).unwrap();
    assert!(temp.path().join("data").join("dir").is_dir());
    assert!(!temp.path().join("data2").join("dir").exists());
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_cannot_be_written_through() {
    let (temp, volume) = archive(NewlineStyle::Lf);
    let outside = temp.path().join("outside");
    fs::create_dir(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, temp.path().join("root").join("escape")).unwrap();

    let err = volume.save_file(&path("/escape/new.txt"), &"x".into(), true).unwrap_err();
    assert!(err.is_invalid_path());
    assert!(!outside.join("new.txt").exists());
}

#[cfg(windows)]
#[test]
fn test_drive_prefixed_segment_is_refused() {
    let (_temp, volume) = archive(NewlineStyle::Lf);
    let err = volume.create_directory(&path("/C:")).unwrap_err();
    assert!(err.is_invalid_path());
}

#[test]
fn test_clear_keeps_root_directory() {
    let (temp, volume) = archive(NewlineStyle::Lf);
    volume.save_file(&path("/a/b"), &"x".into(), true).unwrap();
    volume.clear().unwrap();
    assert!(temp.path().join("root").is_dir());
    assert_eq!(fs::read_dir(temp.path().join("root")).unwrap().count(), 0);
}
