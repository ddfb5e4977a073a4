use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use letras_model::{FetchError, SongJob, SongResult};

use crate::normalize::{format_lyrics, sanitize_filename};

pub const ALL_LYRICS_FILE: &str = "all_lyrics.txt";
const DELIMITER: &str = "===================";

/// Create the output directory for a run if it doesn't exist.
pub fn ensure_output_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() && !dir.is_dir() {
        anyhow::bail!("{} exists and is not a directory", dir.display());
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Output directory for one artist under the configured root.
pub fn artist_dir(root: &Path, artist: &str) -> PathBuf {
    root.join(sanitize_filename(artist))
}

pub fn song_filename(title: &str) -> String {
    format!("{}.txt", sanitize_filename(title))
}

pub fn llm_filename(artist: &str) -> String {
    format!("{}_llm_format.txt", sanitize_filename(artist))
}

/// Per-song file names for one run.
///
/// Names are handed out in listing order, so a rerun puts every song in the
/// same file. Titles that sanitize to a name already taken, including the
/// combined and LLM files, get a ` (2)`, ` (3)`, ... suffix. Comparison
/// ignores case because some filesystems do.
#[derive(Debug, Default)]
pub struct SongFiles {
    names: HashMap<usize, String>,
}

impl SongFiles {
    pub fn assign(artist: &str, jobs: &[SongJob]) -> Self {
        let mut taken: HashSet<String> = [ALL_LYRICS_FILE.to_string(), llm_filename(artist)]
            .iter()
            .map(|name| name.to_lowercase())
            .collect();
        let mut names = HashMap::with_capacity(jobs.len());

        for job in jobs {
            let stem = sanitize_filename(&job.title);
            let mut name = format!("{stem}.txt");
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{stem} ({n}).txt");
                n += 1;
            }
            names.insert(job.index, name);
        }

        Self { names }
    }

    /// File name reserved for `job`, or the plain title-based name for a job
    /// that was not part of the listing.
    pub fn name(&self, job: &SongJob) -> String {
        self.names
            .get(&job.index)
            .cloned()
            .unwrap_or_else(|| song_filename(&job.title))
    }
}

/// The text of one song's file: title and artist header, then lyrics.
pub fn song_document(artist: &str, title: &str, lyrics: &str) -> String {
    format!(
        "Title: {title}\nArtist: {artist}\n\n{}\n",
        format_lyrics(lyrics)
    )
}

/// Write one song to `{dir}/{file_name}`, replacing any previous file.
pub fn write_song(
    dir: &Path,
    file_name: &str,
    artist: &str,
    song: &SongResult,
) -> Result<PathBuf, FetchError> {
    let path = dir.join(file_name);
    if song.lyrics.trim().is_empty() {
        return Err(persist_error(&path, "no lyrics to save"));
    }
    let content = song_document(artist, song.title(), &song.lyrics);
    fs::write(&path, content).map_err(|err| persist_error(&path, err))?;
    tracing::debug!(path = %path.display(), "Wrote song");
    Ok(path)
}

/// All songs in one file, in the order given, separated by a fixed delimiter.
pub fn all_lyrics_document(artist: &str, songs: &[SongResult]) -> String {
    let mut content = String::new();
    let _ = writeln!(content, "Artist: {artist}");
    let _ = writeln!(content, "Number of songs: {}", songs.len());
    let _ = writeln!(content, "{DELIMITER}\n");

    for song in songs {
        let _ = writeln!(content, "### {} ###\n", song.title());
        content.push_str(&format_lyrics(&song.lyrics));
        let _ = writeln!(content, "\n\n{DELIMITER}\n");
    }

    content
}

/// All songs in one file, each wrapped in `[SONG:title]` / `[END]` markers
/// so a language model can tell where one song stops and the next begins.
pub fn llm_document(artist: &str, songs: &[SongResult]) -> String {
    let mut content = String::new();
    let _ = writeln!(content, "Collection of lyrics by {artist}");
    let _ = writeln!(
        content,
        "Format: Each song is marked with [SONG] and [END] tags\n"
    );

    for song in songs {
        let _ = writeln!(content, "[SONG:{}]", song.title());
        content.push_str(&format_lyrics(&song.lyrics));
        content.push_str("\n[END]\n\n");
    }

    content
}

pub fn write_all_lyrics(
    dir: &Path,
    artist: &str,
    songs: &[SongResult],
) -> Result<PathBuf, FetchError> {
    let path = dir.join(ALL_LYRICS_FILE);
    fs::write(&path, all_lyrics_document(artist, songs)).map_err(|err| persist_error(&path, err))?;
    tracing::info!(path = %path.display(), songs = songs.len(), "Wrote combined lyrics");
    Ok(path)
}

pub fn write_llm_format(
    dir: &Path,
    artist: &str,
    songs: &[SongResult],
) -> Result<PathBuf, FetchError> {
    let path = dir.join(llm_filename(artist));
    fs::write(&path, llm_document(artist, songs)).map_err(|err| persist_error(&path, err))?;
    tracing::info!(path = %path.display(), songs = songs.len(), "Wrote LLM format");
    Ok(path)
}

fn persist_error(path: &Path, err: impl ToString) -> FetchError {
    FetchError::Persist {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letras_model::SongJob;
    use tempfile::TempDir;

    fn song(index: usize, title: &str, lyrics: &str) -> SongResult {
        SongResult::success(
            SongJob::new(index, title, format!("https://example.com/{index}/")),
            lyrics.to_string(),
        )
    }

    #[test]
    fn test_song_document_header() {
        let doc = song_document("coldplay", "Yellow", "Look at the stars");
        assert_eq!(doc, "Title: Yellow\nArtist: coldplay\n\nLook at the stars\n");
    }

    #[test]
    fn test_write_song_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let result = song(0, "Yellow", "Look at the stars. Look how they shine");

        let first = write_song(temp.path(), "Yellow.txt", "coldplay", &result).unwrap();
        let first_content = fs::read_to_string(&first).unwrap();
        let second = write_song(temp.path(), "Yellow.txt", "coldplay", &result).unwrap();
        let second_content = fs::read_to_string(&second).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_content, second_content);
        assert_eq!(first.file_name().unwrap(), "Yellow.txt");
    }

    #[test]
    fn test_write_song_rejects_empty_lyrics() {
        let temp = TempDir::new().unwrap();
        let err = write_song(temp.path(), "Silence.txt", "coldplay", &song(0, "Silence", "  ")).unwrap_err();
        assert!(matches!(err, FetchError::Persist { .. }));
        assert!(!temp.path().join("Silence.txt").exists());
    }

    #[test]
    fn test_write_song_into_missing_dir_fails() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = write_song(&missing, "Yellow.txt", "coldplay", &song(0, "Yellow", "x")).unwrap_err();
        assert!(matches!(err, FetchError::Persist { .. }));
    }

    #[test]
    fn test_song_files_suffix_collisions() {
        let jobs = vec![
            SongJob::new(0, "Intro", "https://example.com/a/intro/"),
            SongJob::new(1, "Intro", "https://example.com/b/intro/"),
            SongJob::new(2, "intro", "https://example.com/c/intro/"),
            SongJob::new(3, "Intro?", "https://example.com/d/intro/"),
            SongJob::new(4, "Yellow", "https://example.com/yellow/"),
        ];
        let files = SongFiles::assign("coldplay", &jobs);
        let names: Vec<_> = jobs.iter().map(|job| files.name(job)).collect();
        assert_eq!(
            names,
            ["Intro.txt", "Intro (2).txt", "intro (3).txt", "Intro_.txt", "Yellow.txt"]
        );
    }

    #[test]
    fn test_song_files_reserve_combined_outputs() {
        let jobs = vec![
            SongJob::new(0, "all_lyrics", "https://example.com/all/"),
            SongJob::new(1, "coldplay_llm_format", "https://example.com/llm/"),
        ];
        let files = SongFiles::assign("coldplay", &jobs);
        assert_eq!(files.name(&jobs[0]), "all_lyrics (2).txt");
        assert_eq!(files.name(&jobs[1]), "coldplay_llm_format (2).txt");

        let stray = SongJob::new(9, "Stray", "https://example.com/stray/");
        assert_eq!(files.name(&stray), "Stray.txt");
    }

    #[test]
    fn test_all_lyrics_document_layout() {
        let doc = all_lyrics_document("coldplay", &[song(0, "A", "first"), song(1, "B", "second")]);
        assert!(doc.starts_with("Artist: coldplay\nNumber of songs: 2\n===================\n\n"));
        let a = doc.find("### A ###").unwrap();
        let b = doc.find("### B ###").unwrap();
        assert!(a < b);
        assert_eq!(doc.matches(DELIMITER).count(), 3);
    }

    #[test]
    fn test_llm_document_markers() {
        let doc = llm_document("coldplay", &[song(0, "A", "first"), song(1, "B", "second")]);
        assert!(doc.starts_with("Collection of lyrics by coldplay\n"));
        assert!(doc.contains("[SONG:A]\nfirst\n[END]\n"));
        assert!(doc.contains("[SONG:B]\nsecond\n[END]\n"));
        assert_eq!(doc.matches("[END]").count(), 2);
    }

    #[test]
    fn test_ensure_output_dir() {
        let temp = TempDir::new().unwrap();
        let dir = artist_dir(temp.path(), "ac/dc");
        ensure_output_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir.file_name().unwrap(), "ac_dc");

        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();
        assert!(ensure_output_dir(&file).is_err());
    }
}
