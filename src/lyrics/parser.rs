//! LRC format parser
//!
//! Parses synchronized lyrics in LRC format:
//! [mm:ss.xx] Lyrics line here
//!
//! Also accepted:
//! - several leading timestamps on one line: `[00:12.00][00:40.00]Chorus`
//! - enhanced word timestamps: `[00:12.00]Hel<00:12.50>lo`
//! - metadata tags such as `[ti:Title]`, which are skipped

use std::time::Duration;

/// Shown when a track has no usable lyrics.
pub const NO_LYRICS: &str = "no lyrics";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LrcError {
    #[error("no timed lines in lyric payload")]
    NoTimedLines,
}

/// One time-stamped piece of lyric text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricFragment {
    pub at: Duration,
    pub text: String,
}

impl LyricFragment {
    pub fn new(at: Duration, text: impl Into<String>) -> Self {
        Self {
            at,
            text: text.into(),
        }
    }
}

/// Fragments of one track, sorted by timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricTrack {
    fragments: Vec<LyricFragment>,
}

impl LyricTrack {
    pub fn new(mut fragments: Vec<LyricFragment>) -> Self {
        fragments.sort_by_key(|f| f.at);
        Self { fragments }
    }

    /// A single "no lyrics" fragment at t=0.
    pub fn placeholder() -> Self {
        Self::new(vec![LyricFragment::new(Duration::ZERO, NO_LYRICS)])
    }

    /// Parse an LRC payload.
    pub fn parse(content: &str) -> Result<Self, LrcError> {
        let mut fragments = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || is_metadata(line) {
                continue;
            }
            if let Some(parsed) = parse_timed_line(line) {
                fragments.extend(parsed);
            }
        }

        if fragments.is_empty() {
            return Err(LrcError::NoTimedLines);
        }
        Ok(Self::new(fragments))
    }

    /// Parse, falling back to [`LyricTrack::placeholder`].
    pub fn parse_or_placeholder(content: Option<&str>) -> Self {
        match content.map(Self::parse) {
            Some(Ok(track)) => track,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "lyrics unusable, showing placeholder");
                Self::placeholder()
            }
            None => Self::placeholder(),
        }
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[LyricFragment] {
        &self.fragments
    }

    /// Fragment at an ordinal, `None` outside the track.
    pub fn fragment_at(&self, index: isize) -> Option<&LyricFragment> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.fragments.get(i))
    }

    /// Index of the last fragment starting at or before `elapsed`.
    pub fn active_index(&self, elapsed: Duration) -> Option<usize> {
        self.fragments
            .partition_point(|f| f.at <= elapsed)
            .checked_sub(1)
    }
}

/// Metadata tag like [ti:Title]
fn is_metadata(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('[') else {
        return false;
    };
    let Some(end) = rest.find(']') else {
        return false;
    };
    let Some((tag, _)) = rest[..end].split_once(':') else {
        return false;
    };
    // Metadata tags are 2-6 ascii letters (ti, ar, al, by, offset, length)
    (2..=6).contains(&tag.len()) && tag.chars().all(|c| c.is_ascii_alphabetic())
}

/// Parse [00:12.34]Lyrics or [00:12.34][00:15.00]Lyrics
fn parse_timed_line(line: &str) -> Option<Vec<LyricFragment>> {
    let mut stamps = Vec::new();
    let mut rest = line;

    while let Some(inner) = rest.strip_prefix('[') {
        let end = inner.find(']')?;
        let Some(at) = parse_timestamp(&inner[..end]) else {
            break;
        };
        stamps.push(at);
        rest = &inner[end + 1..];
    }

    if stamps.is_empty() {
        return None;
    }

    let words = split_word_stamps(rest.trim());
    let mut out = Vec::new();
    for at in stamps {
        let Some((first_text, tail)) = words.split_first() else {
            continue;
        };
        out.push(LyricFragment::new(at, first_text.1.clone()));
        // word stamps are absolute; only the first occurrence carries them
        if out.len() == 1 {
            out.extend(tail.iter().map(|(t, text)| LyricFragment::new(*t, text.clone())));
        }
    }
    Some(out)
}

/// Split "a<00:01.00>b<00:02.00>c" into [(0,"a"), (1s,"b"), (2s,"c")].
/// The first entry's time is a dummy; callers use the line stamp instead.
fn split_word_stamps(text: &str) -> Vec<(Duration, String)> {
    let mut parts = vec![(Duration::ZERO, String::new())];
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let stamp = &rest[open + 1..open + close];
        let Some(at) = parse_timestamp(stamp) else {
            // not a stamp, keep the bracket as text
            if let Some(last) = parts.last_mut() {
                last.1.push_str(&rest[..open + close + 1]);
            }
            rest = &rest[open + close + 1..];
            continue;
        };
        if let Some(last) = parts.last_mut() {
            last.1.push_str(&rest[..open]);
        }
        parts.push((at, String::new()));
        rest = &rest[open + close + 1..];
    }
    if let Some(last) = parts.last_mut() {
        last.1.push_str(rest);
    }

    for p in &mut parts {
        p.1 = p.1.trim().to_string();
    }
    let first = parts.remove(0);
    parts.retain(|p| !p.1.is_empty());
    parts.insert(0, first);
    parts
}

/// Parse timestamp string like "00:12.34" or "00:12:34"
fn parse_timestamp(s: &str) -> Option<Duration> {
    let parts: Vec<&str> = s.split([':', '.']).collect();

    let ms = match parts.len() {
        2 => {
            let min: u64 = parts[0].parse().ok()?;
            let sec: u64 = parts[1].parse().ok()?;
            to_millis(min, sec, 0)?
        }
        3 => {
            let min: u64 = parts[0].parse().ok()?;
            let sec: u64 = parts[1].parse().ok()?;
            let frac = parts[2];
            // "34" is centiseconds, "340" milliseconds
            let frac_ms: u64 = match frac.len() {
                1 => frac.parse::<u64>().ok()? * 100,
                2 => frac.parse::<u64>().ok()? * 10,
                3 => frac.parse().ok()?,
                _ => return None,
            };
            to_millis(min, sec, frac_ms)?
        }
        _ => return None,
    };
    Some(Duration::from_millis(ms))
}

/// `None` when the stamp does not fit in a u64 of milliseconds.
fn to_millis(min: u64, sec: u64, frac_ms: u64) -> Option<u64> {
    min.checked_mul(60_000)?
        .checked_add(sec.checked_mul(1000)?)?
        .checked_add(frac_ms)
}
