//! Visible signature widget appearance.
//!
//! PDF Spec: ISO 32000-1:2008, Section 12.7.4.5 (Signature Fields) and
//! Section 12.5.5 (Appearance Streams).
//!
//! The writer calls an [`AppearanceHandler`] once, before serialization, to
//! fill the normal appearance (`/AP /N`) of a visible signature widget. The
//! drawing is in form space: `(0, 0)` is the lower-left corner of the widget.

use super::content_stream::ContentStreamBuilder;
use crate::geometry::Rect;
use crate::signatures::{format_pdf_date, SignatureMetadata};

/// Resource name of the font available to appearance handlers.
pub const APPEARANCE_FONT: &str = "Helv";

/// Renders the visible part of a signature field.
pub trait AppearanceHandler: Send + Sync {
    /// Draw into `content`; `rect` is the widget box in form space.
    fn draw(&self, content: &mut ContentStreamBuilder, rect: Rect);
}

impl<F> AppearanceHandler for F
where
    F: Fn(&mut ContentStreamBuilder, Rect) + Send + Sync,
{
    fn draw(&self, content: &mut ContentStreamBuilder, rect: Rect) {
        self(content, rect)
    }
}

/// Border plus "Digitally signed by" text block.
#[derive(Debug, Clone)]
pub struct DefaultAppearance {
    metadata: SignatureMetadata,
    font_size: f32,
    border: bool,
}

impl DefaultAppearance {
    /// Appearance showing the given metadata.
    pub fn new(metadata: SignatureMetadata) -> Self {
        Self {
            metadata,
            font_size: 9.0,
            border: true,
        }
    }

    /// Set the font size.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    /// Enable or disable the border.
    pub fn with_border(mut self, border: bool) -> Self {
        self.border = border;
        self
    }

    /// Text lines drawn from top to bottom.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Digitally signed by {}",
            self.metadata.name.as_deref().unwrap_or("Unknown")
        )];
        if let Some(reason) = &self.metadata.reason {
            lines.push(format!("Reason: {}", reason));
        }
        if let Some(location) = &self.metadata.location {
            lines.push(format!("Location: {}", location));
        }
        if let Some(time) = &self.metadata.signing_time {
            lines.push(format!("Date: {}", time.format("%Y-%m-%d %H:%M:%S UTC")));
        }
        lines
    }
}

impl AppearanceHandler for DefaultAppearance {
    fn draw(&self, content: &mut ContentStreamBuilder, rect: Rect) {
        if self.border {
            content
                .save_state()
                .set_line_width(1.0)
                .set_stroke_color(0.0, 0.0, 0.0)
                .rect(0.5, 0.5, rect.width - 1.0, rect.height - 1.0)
                .stroke()
                .restore_state();
        }

        let leading = self.font_size * 1.2;
        let mut y = rect.height - 4.0 - self.font_size;
        content.set_fill_gray(0.0);
        content.set_font(APPEARANCE_FONT, self.font_size);
        for line in self.lines() {
            if y < 2.0 {
                break;
            }
            content.text(&line, 4.0, y);
            y -= leading;
        }
        content.end_text();
    }
}

/// Signing time as it appears in `/M`, if known.
pub(crate) fn signing_date(metadata: &SignatureMetadata) -> Option<String> {
    metadata.signing_time.as_ref().map(format_pdf_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn render(handler: &dyn AppearanceHandler, rect: Rect) -> String {
        let mut content = ContentStreamBuilder::new();
        handler.draw(&mut content, rect);
        String::from_utf8(content.build().unwrap()).unwrap()
    }

    #[test]
    fn test_default_lines() {
        let meta = SignatureMetadata::default()
            .with_name("Jane Roe")
            .with_reason("Approval")
            .with_signing_time(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        let lines = DefaultAppearance::new(meta).lines();
        assert_eq!(
            lines,
            vec![
                "Digitally signed by Jane Roe".to_string(),
                "Reason: Approval".to_string(),
                "Date: 2024-01-02 03:04:05 UTC".to_string(),
            ]
        );
    }

    #[test]
    fn test_default_draws_border_and_text() {
        let meta = SignatureMetadata::default().with_name("Jane Roe");
        let content = render(&DefaultAppearance::new(meta), Rect::new(0.0, 0.0, 200.0, 50.0));
        assert!(content.contains("0.5 0.5 199 49 re"));
        assert!(content.contains("/Helv 9 Tf"));
        assert!(content.contains("(Digitally signed by Jane Roe) Tj"));
    }

    #[test]
    fn test_lines_clipped_to_height() {
        let meta = SignatureMetadata::default()
            .with_reason("r")
            .with_location("l");
        let content = render(
            &DefaultAppearance::new(meta).with_border(false),
            Rect::new(0.0, 0.0, 100.0, 16.0),
        );
        assert_eq!(content.matches(" Tj").count(), 1);
        assert!(!content.contains(" re"));
    }

    #[test]
    fn test_closure_handler() {
        let handler = |content: &mut ContentStreamBuilder, rect: Rect| {
            content.rect(0.0, 0.0, rect.width, rect.height).fill();
        };
        let content = render(&handler, Rect::new(10.0, 10.0, 30.0, 20.0));
        assert_eq!(content, "0 0 30 20 re\nf\n");
    }

    #[test]
    fn test_signing_date() {
        let meta = SignatureMetadata::default()
            .with_signing_time(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap());
        assert_eq!(signing_date(&meta).as_deref(), Some("D:20240309140507+00'00'"));
        assert!(signing_date(&SignatureMetadata::default()).is_none());
    }
}
