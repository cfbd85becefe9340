//! Data model for notebooks, sources, artifacts, and chat results.
//!
//! All of these are transient projections of server state; nothing here is
//! persisted locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A notebook owned by the authenticated account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_count: Option<usize>,
}

/// Processing state of a source as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Processing,
    Ready,
    Error,
}

impl SourceStatus {
    /// Decode the numeric status code used in source list responses.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(SourceStatus::Processing),
            2 => Some(SourceStatus::Ready),
            3 => Some(SourceStatus::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Processing => "processing",
            SourceStatus::Ready => "ready",
            SourceStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Url,
    Youtube,
    File,
    Text,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Url => "url",
            SourceType::Youtube => "youtube",
            SourceType::File => "file",
            SourceType::Text => "text",
        }
    }
}

/// A source document inside a notebook. The ID is only meaningful in the
/// context of its parent notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub notebook_id: String,
    pub title: String,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub status: SourceStatus,
}

/// Artifact type tags as used by the studio API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Audio,
    Report,
    Video,
    Quiz,
    MindMap,
    Infographic,
    SlideDeck,
    DataTable,
    Other(i64),
}

impl ArtifactType {
    pub fn from_tag(tag: i64) -> Self {
        match tag {
            1 => ArtifactType::Audio,
            2 => ArtifactType::Report,
            3 => ArtifactType::Video,
            4 => ArtifactType::Quiz,
            5 => ArtifactType::MindMap,
            7 => ArtifactType::Infographic,
            8 => ArtifactType::SlideDeck,
            9 => ArtifactType::DataTable,
            other => ArtifactType::Other(other),
        }
    }

    pub fn tag(&self) -> i64 {
        match self {
            ArtifactType::Audio => 1,
            ArtifactType::Report => 2,
            ArtifactType::Video => 3,
            ArtifactType::Quiz => 4,
            ArtifactType::MindMap => 5,
            ArtifactType::Infographic => 7,
            ArtifactType::SlideDeck => 8,
            ArtifactType::DataTable => 9,
            ArtifactType::Other(tag) => *tag,
        }
    }
}

/// A generated media artifact attached to a notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub title: String,
    pub artifact_type: ArtifactType,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Transient handle for a submitted generation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStatus {
    pub task_id: String,
    /// One of `pending`, `in_progress`, `completed`, `failed`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationStatus {
    pub fn is_done(&self) -> bool {
        self.status == "completed" || self.status == "failed"
    }
}

/// The answer to a single chat question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResult {
    pub answer: String,
    pub conversation_id: String,
    pub turn_number: u32,
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:expr, $text:literal;)+ }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub fn code(&self) -> i64 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), " {:?} (expected one of: ", $($text, " ",)+ ")"),
                        other
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Audio overview flavor.
    AudioFormat {
        DeepDive = 1, "deep-dive";
        Brief = 2, "brief";
        Critique = 3, "critique";
        Debate = 4, "debate";
    }
}

wire_enum! {
    /// Audio overview length.
    AudioLength {
        Short = 1, "short";
        Default = 2, "default";
        Long = 3, "long";
    }
}

wire_enum! {
    /// Video overview flavor.
    VideoFormat {
        Briefing = 1, "briefing";
        Tutorial = 2, "tutorial";
    }
}

wire_enum! {
    /// Video overview visual style.
    VideoStyle {
        Classroom = 1, "classroom";
        Whiteboard = 2, "whiteboard";
        Conversation = 3, "conversation";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_type_round_trips_tags() {
        for tag in [1, 2, 3, 4, 5, 7, 8, 9] {
            assert_eq!(ArtifactType::from_tag(tag).tag(), tag);
        }
        assert_eq!(ArtifactType::from_tag(6), ArtifactType::Other(6));
    }

    #[test]
    fn source_status_codes() {
        assert_eq!(SourceStatus::from_code(1), Some(SourceStatus::Processing));
        assert_eq!(SourceStatus::from_code(2), Some(SourceStatus::Ready));
        assert_eq!(SourceStatus::from_code(3), Some(SourceStatus::Error));
        assert_eq!(SourceStatus::from_code(9), None);
    }

    #[test]
    fn wire_enums_parse_from_str() {
        assert_eq!("deep-dive".parse::<AudioFormat>(), Ok(AudioFormat::DeepDive));
        assert_eq!("long".parse::<AudioLength>(), Ok(AudioLength::Long));
        assert_eq!("tutorial".parse::<VideoFormat>(), Ok(VideoFormat::Tutorial));
        assert_eq!("whiteboard".parse::<VideoStyle>(), Ok(VideoStyle::Whiteboard));
        assert!("podcast".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn wire_enum_codes_match_protocol() {
        assert_eq!(AudioFormat::DeepDive.code(), 1);
        assert_eq!(AudioLength::Default.code(), 2);
        assert_eq!(VideoFormat::Briefing.code(), 1);
        assert_eq!(VideoStyle::Conversation.code(), 3);
    }
}
