//! Maps an [`AnalysisResult`] into display sections and their HTML fragment.

use std::fmt::{self, Display};

use serde::Serialize;

use crate::error::{CLIPBOARD_COPIED_NOTICE, CLIPBOARD_FAILED_NOTICE};
use crate::models::{AnalysisResult, EditingStep, MoodEntry, SongRecord, StyleSuggestion};
use crate::narrative::{parse_editing_steps, parse_mood_entries};

pub const NO_ANALYSIS: &str = "No analysis available.";
pub const NO_EDITING_STEPS: &str = "⚠️ No valid editing steps were detected. Try again or use a different style.";
pub const NO_CAPTIONS: &str = "No captions available.";
pub const NO_SONGS: &str = "🎵 No songs available.";
pub const DEFAULT_COVER: &str = "/static/music-default.svg";
pub const UNTITLED: &str = "Untitled";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
const HINDI_TAG: &str = "hindi";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Section<T> {
    Items(Vec<T>),
    Placeholder(String),
}

impl<T> Section<T> {
    fn from_items(items: Vec<T>, placeholder: &str) -> Self {
        if items.is_empty() { Section::Placeholder(placeholder.to_string()) } else { Section::Items(items) }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Section::Items(items) => items.as_slice(),
            Section::Placeholder(_) => &[],
        }
    }

    pub fn placeholder(&self) -> Option<&str> {
        match self {
            Section::Placeholder(text) => Some(text.as_str()),
            Section::Items(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionCard {
    /// Element id the copy button targets.
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongCard {
    pub cover: String,
    /// Swapped in when `cover` fails to load.
    pub fallback_cover: String,
    pub title: String,
    pub artist: String,
    pub preview: Option<String>,
}

/// Songs grouped by language tag: `hindi` in one list, everything else
/// (including untagged records) in the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongSections {
    pub hindi: Section<SongCard>,
    pub english: Section<SongCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSections {
    pub mood: Section<MoodEntry>,
    pub editing: Section<EditingStep>,
    pub captions: Section<CaptionCard>,
    pub songs: SongSections,
}

impl RenderedSections {
    pub fn to_html(&self) -> String { self.to_string() }
}

pub fn render(result: &AnalysisResult) -> RenderedSections {
    RenderedSections {
        mood: render_mood(result.mood_narrative.as_deref()),
        editing: render_editing(result.editing_narrative.as_deref()),
        captions: render_captions(result.captions.as_deref()),
        songs: render_songs(result.songs.as_deref()),
    }
}

fn render_mood(narrative: Option<&str>) -> Section<MoodEntry> {
    Section::from_items(parse_mood_entries(narrative.unwrap_or_default()), NO_ANALYSIS)
}

fn render_editing(narrative: Option<&str>) -> Section<EditingStep> {
    Section::from_items(parse_editing_steps(narrative.unwrap_or_default()), NO_EDITING_STEPS)
}

fn render_captions(captions: Option<&[String]>) -> Section<CaptionCard> {
    let cards = captions
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, text)| CaptionCard { id: format!("caption-{index}"), text: text.clone() })
        .collect();
    Section::from_items(cards, NO_CAPTIONS)
}

fn song_card(song: &SongRecord) -> SongCard {
    SongCard {
        cover: song.cover.clone().unwrap_or_else(|| DEFAULT_COVER.to_string()),
        fallback_cover: DEFAULT_COVER.to_string(),
        title: song.title.clone().unwrap_or_else(|| UNTITLED.to_string()),
        artist: song.artist.clone().unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        preview: song.preview.clone(),
    }
}

fn render_songs(songs: Option<&[SongRecord]>) -> SongSections {
    let songs = songs.unwrap_or_default();
    if songs.is_empty() {
        return SongSections {
            hindi: Section::Placeholder(NO_SONGS.to_string()),
            english: Section::Placeholder(NO_SONGS.to_string()),
        };
    }
    let (hindi, english): (Vec<&SongRecord>, Vec<&SongRecord>) = songs
        .iter()
        .partition(|s| s.language.as_deref().is_some_and(|l| l.eq_ignore_ascii_case(HINDI_TAG)));
    SongSections {
        hindi: Section::Items(hindi.into_iter().map(song_card).collect()),
        english: Section::Items(english.into_iter().map(song_card).collect()),
    }
}

/// Style suggestion text, shown verbatim.
pub fn render_suggestion(suggestion: &StyleSuggestion) -> String {
    format!("<pre style=\"white-space: pre-wrap;\">{}</pre>", escape_html(&suggestion.result))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn write_placeholder(f: &mut fmt::Formatter<'_>, class: &str, text: &str) -> fmt::Result {
    write!(f, "<div class=\"{class}\">{}</div>", escape_html(text))
}

fn write_song_section(f: &mut fmt::Formatter<'_>, id: &str, section: &Section<SongCard>) -> fmt::Result {
    write!(f, "<section id=\"{id}\">")?;
    match section {
        Section::Placeholder(text) => write_placeholder(f, "music-card", text)?,
        Section::Items(cards) => {
            for card in cards {
                f.write_str("<div class=\"song-card\">")?;
                write!(
                    f,
                    "<img src=\"{}\" alt=\"cover\" data-fallback=\"{}\" onerror=\"this.onerror=null;this.src=this.dataset.fallback\">",
                    escape_html(&card.cover),
                    escape_html(&card.fallback_cover)
                )?;
                write!(f, "<div class=\"song-title\">{}</div>", escape_html(&card.title))?;
                write!(f, "<div class=\"song-artist\">{}</div>", escape_html(&card.artist))?;
                if let Some(preview) = &card.preview {
                    write!(f, "<audio controls src=\"{}\"></audio>", escape_html(preview))?;
                }
                f.write_str("</div>")?;
            }
        }
    }
    f.write_str("</section>")
}

impl Display for RenderedSections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<section id=\"moodInfo\">")?;
        match &self.mood {
            Section::Placeholder(text) => write_placeholder(f, "analysis-entry", text)?,
            Section::Items(entries) => {
                for e in entries {
                    write!(
                        f,
                        "<div class=\"analysis-entry\"><span class=\"analysis-label\">{}</span><span class=\"analysis-value\">{}</span></div>",
                        escape_html(&e.label),
                        escape_html(&e.value)
                    )?;
                }
            }
        }
        f.write_str("</section>")?;

        f.write_str("<section id=\"editingValues\"><div class=\"edit-category\"><h3>📋 Recommended Edits</h3>")?;
        match &self.editing {
            Section::Placeholder(text) => write_placeholder(f, "edit-step-box", text)?,
            Section::Items(steps) => {
                for step in steps {
                    f.write_str("<div class=\"edit-step-group\">")?;
                    write_placeholder(f, "edit-step-box", &step.instruction)?;
                    if let Some(reason) = &step.reason {
                        write_placeholder(f, "edit-reason-box", reason)?;
                    }
                    f.write_str("</div>")?;
                }
            }
        }
        f.write_str("</div></section>")?;

        f.write_str("<section id=\"captionList\">")?;
        match &self.captions {
            Section::Placeholder(text) => write_placeholder(f, "caption-empty", text)?,
            Section::Items(cards) => {
                for card in cards {
                    let id = escape_html(&card.id);
                    write!(
                        f,
                        "<div class=\"caption-card\"><span id=\"{id}\">{}</span><button class=\"copy-btn\" data-copy-target=\"{id}\" data-copied=\"{}\" data-copy-failed=\"{}\">Copy</button></div>",
                        escape_html(&card.text),
                        escape_html(CLIPBOARD_COPIED_NOTICE),
                        escape_html(CLIPBOARD_FAILED_NOTICE)
                    )?;
                }
            }
        }
        f.write_str("</section>")?;

        write_song_section(f, "hindiSongs", &self.songs.hindi)?;
        write_song_section(f, "englishSongs", &self.songs.english)
    }
}
