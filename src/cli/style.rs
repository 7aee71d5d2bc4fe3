//! Terminal styling
//!
//! Output is colored by [`Tone`] rather than by raw color, so every command
//! uses the same palette:
//!
//! | Tone       | Look   | Stream | Used for                          |
//! |------------|--------|--------|-----------------------------------|
//! | `Accent`   | Cyan   | stdout | branch names, request numbers     |
//! | `Success`  | Green  | stdout | checkmarks, approvals, green CI   |
//! | `Error`    | Red    | stderr | failures                          |
//! | `Warn`     | Yellow | stderr | warnings, re-targets, rebases     |
//! | `Muted`    | Dim    | stdout | hints, status details             |
//! | `Emphasis` | Bold   | stdout | headers, the current phase        |
//!
//! Color support is decided per stream by `owo-colors` (`NO_COLOR`,
//! `CLICOLOR`, `CLICOLOR_FORCE`, TTY detection).

use indicatif::ProgressStyle;
pub use owo_colors::Stream;
use owo_colors::{OwoColorize, Style};
use revstack::types::{CheckStatus, ReviewStatus};
use std::fmt::{self, Display};
use std::sync::OnceLock;

/// Semantic tone of a piece of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Accent,
    Success,
    Error,
    Warn,
    Muted,
    Emphasis,
}

impl Tone {
    const fn style(self) -> Style {
        match self {
            Self::Accent => Style::new().cyan(),
            Self::Success => Style::new().green(),
            Self::Error => Style::new().red(),
            Self::Warn => Style::new().yellow(),
            Self::Muted => Style::new().dimmed(),
            Self::Emphasis => Style::new().bold(),
        }
    }

    /// Stream this tone is usually written to
    const fn stream(self) -> Stream {
        match self {
            Self::Error | Self::Warn => Stream::Stderr,
            _ => Stream::Stdout,
        }
    }
}

/// A value rendered in a [`Tone`]
#[derive(Debug, Clone)]
pub struct Painted<T> {
    value: T,
    tone: Tone,
    stream: Stream,
}

impl<T> Painted<T> {
    const fn new(value: T, tone: Tone) -> Self {
        Self {
            value,
            tone,
            stream: tone.stream(),
        }
    }

    /// Decide color support for `stream` instead of the tone's default
    #[must_use]
    pub const fn on(mut self, stream: Stream) -> Self {
        self.stream = stream;
        self
    }
}

impl<T: Display> Display for Painted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = self.tone.style();
        write!(
            f,
            "{}",
            self.value.if_supports_color(self.stream, |v| v.style(style))
        )
    }
}

/// Tone helpers for anything printable
pub trait Stylize: Display {
    fn paint(&self, tone: Tone) -> Painted<&Self> {
        Painted::new(self, tone)
    }

    fn accent(&self) -> Painted<&Self> {
        self.paint(Tone::Accent)
    }

    fn success(&self) -> Painted<&Self> {
        self.paint(Tone::Success)
    }

    /// Red, checked against stderr
    fn error(&self) -> Painted<&Self> {
        self.paint(Tone::Error)
    }

    /// Yellow, checked against stderr
    fn warn(&self) -> Painted<&Self> {
        self.paint(Tone::Warn)
    }

    fn muted(&self) -> Painted<&Self> {
        self.paint(Tone::Muted)
    }

    fn emphasis(&self) -> Painted<&Self> {
        self.paint(Tone::Emphasis)
    }
}

impl<T: Display + ?Sized> Stylize for T {}

// Symbols

pub const fn check() -> Painted<&'static str> {
    Painted::new("✓", Tone::Success)
}

/// Failure cross, for stderr
pub const fn cross() -> Painted<&'static str> {
    Painted::new("✗", Tone::Error)
}

pub const fn arrow() -> Painted<&'static str> {
    Painted::new("→", Tone::Accent)
}

pub const fn bullet() -> Painted<&'static str> {
    Painted::new("○", Tone::Muted)
}

/// Review status colored by how close the request is to merging
pub const fn review_status(status: ReviewStatus) -> Painted<ReviewStatus> {
    let tone = match status {
        ReviewStatus::Approved => Tone::Success,
        ReviewStatus::ChangesRequested => Tone::Error,
        ReviewStatus::Commented | ReviewStatus::Pending => Tone::Warn,
        ReviewStatus::ReviewRequired => Tone::Muted,
    };
    Painted::new(status, tone).on(Stream::Stdout)
}

/// CI status colored by outcome
pub const fn check_status(status: CheckStatus) -> Painted<CheckStatus> {
    let tone = match status {
        CheckStatus::Success => Tone::Success,
        CheckStatus::Failure => Tone::Error,
        CheckStatus::InProgress => Tone::Warn,
        CheckStatus::Neutral | CheckStatus::NoChecks => Tone::Muted,
    };
    Painted::new(status, tone).on(Stream::Stdout)
}

/// Clickable OSC 8 link showing the URL, or the bare URL where unsupported
pub fn hyperlink_url(stream: Stream, url: &str) -> String {
    let target = match stream {
        Stream::Stdout => supports_hyperlinks::Stream::Stdout,
        Stream::Stderr => supports_hyperlinks::Stream::Stderr,
    };
    if supports_hyperlinks::on(target) {
        terminal_link::Link::new(url, url).to_string()
    } else {
        url.to_string()
    }
}

/// Cyan braille spinner, built once
pub fn spinner_style() -> ProgressStyle {
    static STYLE: OnceLock<ProgressStyle> = OnceLock::new();
    STYLE
        .get_or_init(|| {
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        })
        .clone()
}
