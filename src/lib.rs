pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod narrative;
pub mod preprocess;
pub mod render;
pub mod routes;
pub mod submission;

pub use client::{AnalysisBackend, AnalysisClient, DemoBackend, Selection};
pub use error::GlamoError;
pub use models::{AnalysisResult, EditingStep, MoodEntry, ProcessedImage, SongRecord, StyleSuggestion, UploadableImage};
pub use preprocess::{process, PreprocessOptions, Preprocessed};
pub use render::{render, RenderedSections};
