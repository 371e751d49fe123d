use std::fmt::Display;

const TAG: &str = "release-ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emoji {
    Bulb,
    Cross,
    CheckMark,
}

impl Emoji {
    fn shortcode(self) -> &'static str {
        match self {
            Self::Bulb => ":bulb:",
            Self::Cross => ":x:",
            Self::CheckMark => ":heavy_check_mark:",
        }
    }
}

/// Status comment posted on the pull request, rendered as `<emoji> release-ready: <text>.`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    emoji: Emoji,
    text: String,
}

impl Comment {
    pub fn new(emoji: Emoji, text: impl Into<String>) -> Self {
        Self {
            emoji,
            text: text.into(),
        }
    }

    pub fn released() -> Self {
        Self::new(Emoji::CheckMark, "this PR can be released")
    }
}

impl Display for Comment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = self.text.trim_end_matches('.');
        write!(f, "{} {}: {}.", self.emoji.shortcode(), TAG, text)
    }
}
