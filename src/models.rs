use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const WEBP_MEDIA_TYPE: &str = "image/webp";
pub const COMPRESSED_FILE_NAME: &str = "compressed.webp";

/// A file as the user selected it, before any pre-processing.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadableImage {
    pub bytes: Bytes,
    pub media_type: String,
    pub file_name: String,
}

impl UploadableImage {
    pub fn new(bytes: impl Into<Bytes>, media_type: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self { bytes: bytes.into(), media_type: media_type.into(), file_name: file_name.into() }
    }
}

/// Downscaled, lossy WebP replacement for an [`UploadableImage`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

impl ProcessedImage {
    pub fn media_type(&self) -> &'static str { WEBP_MEDIA_TYPE }
    pub fn file_name(&self) -> &'static str { COMPRESSED_FILE_NAME }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub cover: Option<String>,
    pub preview: Option<String>,
    pub language: Option<String>,
}

/// Analysis collaborator response, validated field by field.
///
/// A field with the wrong JSON type is treated as absent so that one bad
/// section never prevents the others from rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct AnalysisResult {
    pub mood_narrative: Option<String>,
    pub editing_narrative: Option<String>,
    pub captions: Option<Vec<String>>,
    pub songs: Option<Vec<SongRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditingStep {
    pub instruction: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoodEntry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSuggestion {
    #[serde(default)]
    pub result: String,
}

// Older collaborator revisions used different key names for song fields.
// Left column is the deprecated alias, right column the canonical key.
const SONG_FIELD_ALIASES: &[(&str, &str)] = &[
    ("image", "cover"),
    ("name", "title"),
    ("primaryArtists", "artist"),
    ("preview_url", "preview"),
];

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn song_field(obj: &Map<String, Value>, canonical: &str) -> Option<String> {
    obj.get(canonical).and_then(non_empty_str).or_else(|| {
        SONG_FIELD_ALIASES
            .iter()
            .filter(|(_, target)| *target == canonical)
            .find_map(|(alias, _)| obj.get(*alias).and_then(non_empty_str))
    })
}

impl SongRecord {
    pub fn from_wire(obj: &Map<String, Value>) -> Self {
        Self {
            title: song_field(obj, "title"),
            artist: song_field(obj, "artist"),
            cover: song_field(obj, "cover"),
            preview: song_field(obj, "preview"),
            language: song_field(obj, "language").map(|l| l.to_lowercase()),
        }
    }
}

impl From<Value> for AnalysisResult {
    fn from(value: Value) -> Self {
        let Some(obj) = value.as_object() else { return Self::default() };

        let captions = obj.get("captions").and_then(Value::as_array).map(|items| {
            items.iter().filter_map(Value::as_str).map(|c| c.trim().to_string()).collect()
        });
        let songs = obj.get("songs").and_then(Value::as_array).map(|items| {
            items.iter().filter_map(Value::as_object).map(SongRecord::from_wire).collect()
        });

        Self {
            mood_narrative: obj.get("mood_info").and_then(Value::as_str).map(str::to_string),
            editing_narrative: obj.get("editing_values").and_then(Value::as_str).map(str::to_string),
            captions,
            songs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn image_alias_maps_to_cover() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "songs": [{ "title": "Raabta", "image": "https://img/1.jpg", "language": "Hindi" }]
        }))
        .unwrap();
        let song = &result.songs.unwrap()[0];
        assert_eq!(song.cover.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(song.language.as_deref(), Some("hindi"));
    }

    #[test]
    fn canonical_key_wins_over_alias() {
        let obj = json!({ "cover": "a.jpg", "image": "b.jpg", "name": "Alias", "title": "" });
        let song = SongRecord::from_wire(obj.as_object().unwrap());
        assert_eq!(song.cover.as_deref(), Some("a.jpg"));
        // blank canonical value falls through to the alias
        assert_eq!(song.title.as_deref(), Some("Alias"));
    }

    #[test]
    fn wrong_typed_fields_are_absent_not_fatal() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "mood_info": "Mood: calm",
            "captions": "not a list",
            "songs": { "title": "x" },
            "editing_values": 42
        }))
        .unwrap();
        assert_eq!(result.mood_narrative.as_deref(), Some("Mood: calm"));
        assert_eq!(result.captions, None);
        assert_eq!(result.songs, None);
        assert_eq!(result.editing_narrative, None);
    }

    #[test]
    fn non_object_body_yields_empty_result() {
        let result: AnalysisResult = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(result, AnalysisResult::default());
    }

    #[test]
    fn non_string_caption_items_are_skipped() {
        let result: AnalysisResult =
            serde_json::from_value(json!({ "captions": ["one", 2, " two "] })).unwrap();
        assert_eq!(result.captions, Some(vec!["one".to_string(), "two".to_string()]));
    }
}
