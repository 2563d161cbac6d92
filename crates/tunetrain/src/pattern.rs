//! Glob expansion over a directory walk.
//!
//! Supports `*`, `?`, `[...]` / `[!...]` classes, and `**` as a whole path
//! component. Wildcards never match a leading `.`, so hidden files are only
//! picked up when the pattern names them explicitly. Symbolic links are
//! followed; link loops are reported and skipped.

use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern {pattern:?}: {message}")]
    Invalid { pattern: String, message: String },
}

fn has_wildcard(component: &str) -> bool {
    component.contains(|c| matches!(c, '*' | '?' | '['))
}

/// Expand `pattern` into the files it matches, sorted by path.
///
/// A pattern without wildcards matches itself if it names an existing file.
/// A missing base directory matches nothing.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, PatternError> {
    let components: Vec<&str> = pattern.split('/').collect();

    let Some(first_glob) = components.iter().position(|c| has_wildcard(c)) else {
        let path = PathBuf::from(pattern);
        return Ok(if path.is_file() { vec![path] } else { Vec::new() });
    };

    let literal = components[..first_glob].join("/");
    let (root, implicit_root) = match literal.as_str() {
        "" if pattern.starts_with('/') => (PathBuf::from("/"), false),
        "" => (PathBuf::from("."), true),
        prefix => (PathBuf::from(prefix), false),
    };

    let glob = components[first_glob..].join("/");
    let matcher = compile(&glob).map_err(|message| PatternError::Invalid {
        pattern: pattern.to_string(),
        message,
    })?;

    if !root.is_dir() {
        debug!(root = %root.display(), "pattern base directory does not exist");
        return Ok(Vec::new());
    }

    let depth = if glob.split('/').any(|c| c == "**") {
        usize::MAX
    } else {
        components.len() - first_glob
    };

    let mut matches = Vec::new();
    for entry in WalkDir::new(&root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(depth)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error accessing entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative) = relative_path(entry.path(), &root) else {
            continue;
        };
        if matcher.is_match(&relative) {
            matches.push(if implicit_root {
                PathBuf::from(relative)
            } else {
                entry.path().to_path_buf()
            });
        }
    }

    matches.sort();
    Ok(matches)
}

/// `path` relative to `root`, with `/` separators.
fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// A compiled glob: the regex plus the per-component hidden-file rule.
struct Matcher {
    regex: Regex,
    components: Vec<String>,
}

impl Matcher {
    fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path) && self.dot_components_named(path)
    }

    /// Every path component starting with `.` lines up with a glob
    /// component that starts with a literal `.`.
    fn dot_components_named(&self, path: &str) -> bool {
        let path: Vec<&str> = path.split('/').collect();
        let glob = &self.components;
        let allowed = |g: &String, p: &&str| !p.starts_with('.') || g.starts_with('.');

        match (
            glob.iter().position(|c| c == "**"),
            glob.iter().rposition(|c| c == "**"),
        ) {
            (Some(first), Some(last)) => {
                let tail = &glob[last + 1..];
                path.len() >= first + tail.len()
                    && glob[..first].iter().zip(&path).all(|(g, p)| allowed(g, p))
                    && tail
                        .iter()
                        .rev()
                        .zip(path.iter().rev())
                        .all(|(g, p)| allowed(g, p))
            }
            _ => {
                glob.len() == path.len() && glob.iter().zip(&path).all(|(g, p)| allowed(g, p))
            }
        }
    }
}

fn compile(glob: &str) -> Result<Matcher, String> {
    let source = glob_to_regex(glob)?;
    let regex = Regex::new(&source).map_err(|e| e.to_string())?;
    Ok(Matcher {
        regex,
        components: glob.split('/').map(str::to_string).collect(),
    })
}

/// Translate a glob (relative, `/`-separated) into an anchored regex.
fn glob_to_regex(glob: &str) -> Result<String, String> {
    let chars: Vec<char> = glob.chars().collect();
    let mut re = String::from("^");
    let mut i = 0;
    let mut component_start = true;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let closes_component = matches!(chars.get(i + 2), None | Some('/'));
                if !component_start || !closes_component {
                    return Err("`**` must be a whole path component".to_string());
                }
                if chars.get(i + 2) == Some(&'/') {
                    // Zero or more directories
                    re.push_str("(?:[^/.][^/]*/)*");
                    i += 3;
                    component_start = true;
                } else {
                    // Trailing: everything below this point
                    re.push_str("(?:[^/.][^/]*(?:/[^/.][^/]*)*)?");
                    i += 2;
                    component_start = false;
                }
                continue;
            }
            '*' if component_start => re.push_str("(?:[^/.][^/]*)?"),
            '*' => re.push_str("[^/]*"),
            '?' if component_start => re.push_str("[^/.]"),
            '?' => re.push_str("[^/]"),
            '[' => {
                let mut j = i + 1;
                let negated = chars.get(j) == Some(&'!');
                if negated {
                    j += 1;
                }
                // A `]` right after the opening bracket is literal
                let body_start = j;
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err("unclosed `[` in character class".to_string());
                }

                re.push('[');
                if negated {
                    re.push('^');
                }
                for &c in &chars[body_start..j] {
                    match c {
                        '\\' | '[' | ']' | '^' | '&' | '~' => {
                            re.push('\\');
                            re.push(c);
                        }
                        _ => re.push(c),
                    }
                }
                re.push(']');
                i = j;
            }
            '/' => re.push('/'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        component_start = chars[i] == '/';
        i += 1;
    }

    re.push('$');
    Ok(re)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn matches(glob: &str, path: &str) -> bool {
        compile(glob).unwrap().is_match(path)
    }

    #[test]
    fn star_stays_within_component() {
        assert!(matches("*.mid", "song.mid"));
        assert!(!matches("*.mid", "dir/song.mid"));
        assert!(!matches("*.mid", "song.midi"));
    }

    #[test]
    fn wildcards_skip_hidden_files() {
        assert!(!matches("*.mid", ".hidden.mid"));
        assert!(matches(".*.mid", ".hidden.mid"));
    }

    #[test]
    fn empty_leading_star_does_not_expose_hidden_files() {
        assert!(!matches("*.mid", ".mid"));
        assert!(!matches("*[.]mid", ".mid"));
        assert!(!matches("songs/*.mid", "songs/.mid"));
        assert!(!matches("**/*.mid", "x/.mid"));
        assert!(matches("*.mid", "a.mid"));
        assert!(matches(".mid", ".mid"));
    }

    #[test]
    fn question_mark_and_classes() {
        assert!(matches("track?.mid", "track1.mid"));
        assert!(matches("track[0-3].mid", "track2.mid"));
        assert!(!matches("track[0-3].mid", "track7.mid"));
        assert!(matches("track[!0-3].mid", "track7.mid"));
    }

    #[test]
    fn double_star_spans_directories() {
        assert!(matches("**/*.mid", "a.mid"));
        assert!(matches("**/*.mid", "x/y/a.mid"));
        assert!(matches("songs/**", "songs/x/a.mid"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("a+b (1).mid", "a+b (1).mid"));
        assert!(!matches("a+b.mid", "aab.mid"));
    }

    #[test]
    fn malformed_globs_are_rejected() {
        assert!(glob_to_regex("a**.mid").is_err());
        assert!(glob_to_regex("track[12.mid").is_err());
    }

    #[test]
    fn expand_sorts_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        for name in ["b.mid", "a.mid", "notes.txt", "nested/c.mid"] {
            fs::write(root.join(name), b"").unwrap();
        }

        let pattern = format!("{}/*.mid", root.display());
        let found = expand_pattern(&pattern).unwrap();
        assert_eq!(found, vec![root.join("a.mid"), root.join("b.mid")]);

        let recursive = format!("{}/**/*.mid", root.display());
        let found = expand_pattern(&recursive).unwrap();
        assert_eq!(
            found,
            vec![root.join("a.mid"), root.join("b.mid"), root.join("nested/c.mid")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_and_directories_are_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("songs")).unwrap();
        fs::create_dir_all(root.join("store/set")).unwrap();
        fs::write(root.join("songs/a.mid"), b"").unwrap();
        fs::write(root.join("store/real.mid"), b"").unwrap();
        fs::write(root.join("store/set/c.mid"), b"").unwrap();
        symlink(root.join("store/real.mid"), root.join("songs/b.mid")).unwrap();
        symlink(root.join("store/set"), root.join("songs/linked")).unwrap();

        let flat = expand_pattern(&format!("{}/songs/*.mid", root.display())).unwrap();
        assert_eq!(flat, vec![root.join("songs/a.mid"), root.join("songs/b.mid")]);

        let deep = expand_pattern(&format!("{}/songs/**/*.mid", root.display())).unwrap();
        assert_eq!(
            deep,
            vec![
                root.join("songs/a.mid"),
                root.join("songs/b.mid"),
                root.join("songs/linked/c.mid"),
            ]
        );
    }

    #[test]
    fn literal_pattern_matches_existing_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.mid");
        fs::write(&file, b"").unwrap();

        assert_eq!(expand_pattern(&file.to_string_lossy()).unwrap(), vec![file.clone()]);
        let missing = dir.path().join("two.mid");
        assert!(expand_pattern(&missing.to_string_lossy()).unwrap().is_empty());
    }

    #[test]
    fn missing_base_directory_matches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/absent/*.mid", dir.path().display());
        assert!(expand_pattern(&pattern).unwrap().is_empty());
    }
}
