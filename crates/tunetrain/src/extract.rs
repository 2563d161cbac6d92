//! Score files → token corpus.

use score::{Chord, Event, Score};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::corpus::{Corpus, CorpusError, Token};
use crate::pattern::{expand_pattern, PatternError};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: score::Error,
    },

    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

/// Reads one score file.
pub trait ScoreParser {
    fn parse(&self, path: &Path) -> score::Result<Score>;
}

/// Parses Standard MIDI Files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct MidiScoreParser;

impl ScoreParser for MidiScoreParser {
    fn parse(&self, path: &Path) -> score::Result<Score> {
        Score::from_path(path)
    }
}

/// `"0.4.7"` for a major triad in any voicing.
pub fn chord_token(chord: &Chord) -> Token {
    chord
        .normal_order_offsets()
        .iter()
        .map(|pc| pc.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Token for a note or chord; `None` for anything else.
pub fn tokenize_event(event: &Event) -> Option<Token> {
    match event {
        Event::Note(note) => Some(note.pitch.name()),
        Event::Chord(chord) => Some(chord_token(chord)),
        Event::Rest(_) | Event::Meta(_) => None,
    }
}

fn tokenize<'a>(events: impl IntoIterator<Item = &'a Event>) -> Vec<Token> {
    events.into_iter().filter_map(tokenize_event).collect()
}

/// Tokens of a score's lead line.
///
/// Uses the first instrument part when the score has one, otherwise every
/// note of the score.
pub fn score_tokens(score: &Score) -> Vec<Token> {
    match score.partition_by_instrument() {
        Some(parts) => {
            let Some(first) = parts.first() else {
                return Vec::new();
            };
            let label = first
                .instrument
                .as_ref()
                .map(|i| i.label())
                .unwrap_or_default();
            debug!(
                parts = parts.len(),
                instrument = %label,
                "extracting first instrument part"
            );
            tokenize(first.recurse())
        }
        None => {
            debug!("no instrument parts, extracting flat note stream");
            tokenize(&score.flat_notes())
        }
    }
}

/// Parse `paths` in order and concatenate their tokens.
///
/// The first unparseable file aborts the run.
pub fn extract_tokens(paths: &[PathBuf], parser: &dyn ScoreParser) -> Result<Corpus, ExtractError> {
    let mut tokens = Vec::new();
    for path in paths {
        info!("Parsing file {}", path.display());
        let score = parser.parse(path).map_err(|source| ExtractError::Parse {
            path: path.clone(),
            source,
        })?;
        let file_tokens = score_tokens(&score);
        debug!(path = %path.display(), tokens = file_tokens.len(), "extracted file");
        tokens.extend(file_tokens);
    }
    Ok(Corpus::new(tokens))
}

/// Extract every file matching `pattern` and persist the corpus to
/// `corpus_path`, replacing what was there.
pub fn extract_corpus(
    pattern: &str,
    parser: &dyn ScoreParser,
    corpus_path: &Path,
) -> Result<Corpus, ExtractError> {
    let paths = expand_pattern(pattern)?;
    if paths.is_empty() {
        warn!(pattern, "pattern matched no files");
    }

    let corpus = extract_tokens(&paths, parser)?;
    corpus.save(corpus_path)?;

    info!(
        files = paths.len(),
        tokens = corpus.len(),
        "extraction complete"
    );
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use score::parse::{TimedNote, Track};
    use score::{Note, Pitch, Rest};
    use std::collections::HashMap;

    const PPQ: u16 = 480;

    fn note(onset: u64, pitch: u8) -> TimedNote {
        TimedNote {
            onset_tick: onset * PPQ as u64,
            offset_tick: (onset + 1) * PPQ as u64,
            pitch,
            channel: 0,
        }
    }

    fn score(tracks: Vec<Track>) -> Score {
        Score {
            ticks_per_quarter: PPQ,
            tracks,
        }
    }

    /// Serves prebuilt scores by path; unknown paths fail to parse.
    #[derive(Default)]
    struct FakeParser(HashMap<PathBuf, Score>);

    impl ScoreParser for FakeParser {
        fn parse(&self, path: &Path) -> score::Result<Score> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| score::Error::MidiParse(format!("no fixture for {}", path.display())))
        }
    }

    #[test]
    fn notes_become_pitch_names() {
        let event = Event::Note(Note {
            pitch: Pitch::new(63),
            offset: 0.0,
            duration: 1.0,
        });
        assert_eq!(tokenize_event(&event).as_deref(), Some("E-4"));
    }

    #[test]
    fn chords_become_dotted_offsets() {
        let g7 = Chord::new(
            [55, 59, 62, 65].into_iter().map(Pitch::new).collect(),
            0.0,
            1.0,
        );
        assert_eq!(tokenize_event(&Event::Chord(g7)).as_deref(), Some("0.3.6.8"));

        let c_major_inverted = Chord::new(
            [64, 67, 72].into_iter().map(Pitch::new).collect(),
            0.0,
            1.0,
        );
        assert_eq!(chord_token(&c_major_inverted), "0.4.7");
    }

    #[test]
    fn rests_and_meta_are_skipped() {
        let rest = Event::Rest(Rest {
            offset: 0.0,
            duration: 1.0,
        });
        assert_eq!(tokenize_event(&rest), None);
    }

    #[test]
    fn unlabelled_score_uses_flat_stream() {
        let s = score(vec![
            Track {
                notes: vec![note(0, 60), note(2, 64)],
                ..Track::default()
            },
            Track {
                index: 1,
                notes: vec![note(1, 62)],
                ..Track::default()
            },
        ]);

        assert!(s.partition_by_instrument().is_none());
        assert_eq!(score_tokens(&s), vec!["C4", "D4", "E4"]);
    }

    #[test]
    fn labelled_score_uses_first_part_only() {
        let s = score(vec![
            Track {
                program: Some(0),
                notes: vec![note(0, 72), note(1, 74)],
                ..Track::default()
            },
            Track {
                index: 1,
                program: Some(32),
                notes: vec![note(0, 48), note(0, 52), note(0, 55)],
                ..Track::default()
            },
        ]);

        assert_eq!(score_tokens(&s), vec!["C5", "D5"]);
    }

    #[test]
    fn files_concatenate_in_given_order() {
        let mut parser = FakeParser::default();
        parser.0.insert(
            PathBuf::from("a.mid"),
            score(vec![Track {
                notes: vec![note(0, 60), note(1, 62)],
                ..Track::default()
            }]),
        );
        parser.0.insert(
            PathBuf::from("b.mid"),
            score(vec![Track {
                notes: vec![note(0, 60), note(0, 64), note(0, 67), note(1, 64)],
                ..Track::default()
            }]),
        );

        let paths = vec![PathBuf::from("b.mid"), PathBuf::from("a.mid")];
        let corpus = extract_tokens(&paths, &parser).unwrap();
        assert_eq!(corpus.tokens(), &["0.4.7", "E4", "C4", "D4"]);
    }

    #[test]
    fn parse_failure_aborts_with_path() {
        let mut parser = FakeParser::default();
        parser.0.insert(PathBuf::from("good.mid"), score(vec![]));

        let paths = vec![PathBuf::from("good.mid"), PathBuf::from("bad.mid")];
        let err = extract_tokens(&paths, &parser).unwrap_err();
        match err {
            ExtractError::Parse { path, .. } => assert_eq!(path, PathBuf::from("bad.mid")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn empty_match_persists_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = dir.path().join("data").join("notes");
        let pattern = format!("{}/*.mid", dir.path().display());

        let corpus = extract_corpus(&pattern, &FakeParser::default(), &corpus_path).unwrap();
        assert!(corpus.is_empty());
        assert!(Corpus::load(&corpus_path).unwrap().is_empty());
    }

    #[test]
    fn extract_corpus_reads_matching_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let mut parser = FakeParser::default();
        for (name, pitch) in [("b.mid", 62), ("a.mid", 60), ("c.txt", 64)] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"").unwrap();
            parser.0.insert(
                path,
                score(vec![Track {
                    notes: vec![note(0, pitch)],
                    ..Track::default()
                }]),
            );
        }

        let corpus_path = dir.path().join("notes");
        let pattern = format!("{}/*.mid", dir.path().display());
        let corpus = extract_corpus(&pattern, &parser, &corpus_path).unwrap();

        assert_eq!(corpus.tokens(), &["C4", "D4"]);
        assert_eq!(Corpus::load(&corpus_path).unwrap(), corpus);
    }
}
