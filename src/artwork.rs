use anyhow::{Context, Result};
use oxipng::{InFile, OutFile, Options};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// ディレクトリ直下の `<id>.<ext>` を列挙（id 昇順）
pub fn collect_artwork(dir: &Path, ext: &str) -> Result<BTreeMap<u32, PathBuf>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.into_path();
        let matches_ext = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case(ext))
            .unwrap_or(false);
        if !matches_ext {
            continue;
        }
        if let Some(token_id) = file_stem(&path).and_then(|s| s.parse::<u32>().ok()) {
            files.insert(token_id, path);
        }
    }
    Ok(files)
}

/// パスから拡張子抜きのファイル名を取得
fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// 画像サイズだけを読み取る（全体はデコードしない）
pub fn dimensions(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path)
        .with_context(|| format!("画像の読み込みに失敗しました: {:?}", path))
}

/// アップロード前に PNG をその場で最適化する
pub fn compress_png(path: &Path, level: u8) -> Result<()> {
    let level = level.min(6);
    let mut options = Options::from_preset(level);
    options.fix_errors = true;

    let in_file = InFile::Path(path.to_path_buf());
    let out_file = OutFile::Path {
        path: Some(path.to_path_buf()),
        preserve_attrs: true,
    };

    oxipng::optimize(&in_file, &out_file, &options)
        .with_context(|| format!("PNG 圧縮に失敗しました: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;

    fn write_png(path: &Path, w: u32, h: u32) {
        let img = RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_collect_artwork_only_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("2.png"), 2, 2);
        write_png(&dir.path().join("10.PNG"), 2, 2);
        fs::write(dir.path().join("cover.png"), b"x").unwrap();
        fs::write(dir.path().join("3.json"), b"{}").unwrap();

        let files = collect_artwork(dir.path(), "png").unwrap();
        assert_eq!(files.keys().copied().collect::<Vec<_>>(), vec![2, 10]);
    }

    #[test]
    fn test_dimensions_and_compression() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.png");
        write_png(&path, 8, 4);

        assert_eq!(dimensions(&path).unwrap(), (8, 4));
        compress_png(&path, 2).unwrap();
        assert_eq!(dimensions(&path).unwrap(), (8, 4));
    }

    #[test]
    fn test_dimensions_of_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.png");
        fs::write(&path, b"not a png").unwrap();
        assert!(dimensions(&path).is_err());
    }
}
