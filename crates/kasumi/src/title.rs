use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::{error::KasumiError, select::RenditionTarget};

/// Opaque platform identifier or URL of a playback session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReference(String);

impl PlaybackReference {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlaybackReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Episode {
    pub service: &'static str,
    pub show: String,
    pub season: u32,
    pub number: u32,
    pub name: String,
    pub description: Option<String>,
    pub playback: PlaybackReference,
}

#[derive(Debug, Clone)]
pub struct Movie {
    pub service: &'static str,
    pub name: String,
    pub year: Option<u32>,
    pub synopsis: Option<String>,
    pub playback: PlaybackReference,
}

#[derive(Debug, Clone)]
pub enum Title {
    Episode(Episode),
    Movie(Movie),
}

impl Title {
    pub fn playback(&self) -> &PlaybackReference {
        match self {
            Title::Episode(episode) => &episode.playback,
            Title::Movie(movie) => &movie.playback,
        }
    }

    /// `Show.S01E02.Name.1080p.AAC2.0` or `Movie.2001.1080p.AAC2.0`.
    pub fn file_stem(&self, target: &RenditionTarget) -> String {
        let stem = match self {
            Title::Episode(episode) => format!(
                "{}.S{:02}E{:02}.{}",
                episode.show, episode.season, episode.number, episode.name
            ),
            Title::Movie(movie) => match movie.year {
                Some(year) => format!("{}.{year}", movie.name),
                None => movie.name.clone(),
            },
        };
        format!(
            "{}.{}p.{}",
            sanitize(&stem),
            target.height,
            target.audio
        )
    }
}

impl Display for Title {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Title::Episode(episode) => write!(
                f,
                "{} S{:02}E{:02} {}",
                episode.show, episode.season, episode.number, episode.name
            ),
            Title::Movie(movie) => match movie.year {
                Some(year) => write!(f, "{} ({year})", movie.name),
                None => write!(f, "{}", movie.name),
            },
        }
    }
}

/// Keeps filename-safe characters and joins words with dots.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .map(|c| if c.is_whitespace() { '.' } else { c })
        .collect();

    cleaned
        .split('.')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Every title found behind one URL.
#[derive(Debug, Clone)]
pub struct Content {
    pub title: String,
    pub titles: Vec<Title>,
}

impl Content {
    pub fn new(title: impl Into<String>, titles: Vec<Title>) -> Self {
        Self {
            title: title.into(),
            titles,
        }
    }

    pub fn seasons(&self) -> usize {
        self.titles
            .iter()
            .filter_map(|title| match title {
                Title::Episode(episode) => Some(episode.season),
                Title::Movie(_) => None,
            })
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn episodes(&self) -> usize {
        self.titles
            .iter()
            .filter(|title| matches!(title, Title::Episode(_)))
            .count()
    }

    pub fn select(&self, selection: &Selection) -> Vec<Title> {
        self.titles
            .iter()
            .filter(|title| selection.matches(title))
            .cloned()
            .collect()
    }
}

impl Display for Content {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.episodes() > 0 {
            write!(
                f,
                "{}: {} Season(s), {} Episode(s)",
                self.title,
                self.seasons(),
                self.episodes()
            )
        } else {
            write!(f, "{}", self.title)
        }
    }
}

/// How a URL should be resolved into titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleQuery {
    Series,
    Movies,
    /// The URL points at one episode.
    Single,
}

/// Which resolved titles to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Episode { season: u32, episode: u32 },
    Season(u32),
    Complete,
    Movies,
    /// Only list titles.
    List,
}

impl Selection {
    pub fn matches(&self, title: &Title) -> bool {
        match (self, title) {
            (Selection::Episode { season, episode }, Title::Episode(e)) => {
                e.season == *season && e.number == *episode
            }
            (Selection::Season(season), Title::Episode(e)) => e.season == *season,
            (Selection::Complete, _) => true,
            (Selection::Movies, Title::Movie(_)) => true,
            _ => false,
        }
    }
}

impl FromStr for Selection {
    type Err = KasumiError;

    /// Parses `S01E02` (one episode), `S01` or `1` (one season).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KasumiError::InvalidSelection(s.to_string());
        let upper = s.trim().to_ascii_uppercase();
        let rest = upper.strip_prefix('S').unwrap_or(&upper);

        match rest.split_once('E') {
            Some((season, episode)) => Ok(Selection::Episode {
                season: season.parse().map_err(|_| invalid())?,
                episode: episode.parse().map_err(|_| invalid())?,
            }),
            None => Ok(Selection::Season(rest.parse().map_err(|_| invalid())?)),
        }
    }
}
