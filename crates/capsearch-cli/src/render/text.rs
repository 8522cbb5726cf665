//! Human-readable output, printed as each source answers

use std::collections::HashMap;
use std::io::Write;

use crossterm::style::{Color, Stylize};

use capsearch_core::{
    FeedRenderer, ItemKey, LinkEntry, ProtocolEvent, ResultRecord, SessionEnd, SessionEvent,
    Verdict,
};

use super::write_line;

const NOT_FOUND_MESSAGE: &str = "The video could not be found. This doesn't mean that the video is lost, only that this session couldn't find it.";

pub struct TextRenderer<W: Write> {
    out: W,
    color: bool,
    /// Display titles from the preparation record
    titles: HashMap<ItemKey, String>,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            titles: HashMap::new(),
        }
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dim().to_string()
        } else {
            text.to_string()
        }
    }

    fn title<'a>(&'a self, key: &'a ItemKey) -> &'a str {
        self.titles.get(key).map(String::as_str).unwrap_or(key.as_str())
    }

    fn status(&self, result: &ResultRecord) -> String {
        if result.error.is_some() {
            self.paint("Unknown (error)", Color::Magenta)
        } else if result.archived && result.metaonly {
            self.paint("Available (metadata only)", Color::Yellow)
        } else if result.archived {
            self.paint("Available", Color::Green)
        } else {
            self.paint("Not Available", Color::Red)
        }
    }

    fn result_lines(&self, key: &ItemKey, result: &ResultRecord) -> Vec<String> {
        let mut headline = format!("{}: {}", self.title(key), self.status(result));
        if result.archived && result.comments {
            headline.push_str(" (incl. comments)");
        }
        let mut lines = vec![headline];

        if let Some(available) = &result.available {
            lines.push(format!("    {}", available));
        }
        if !result.note.is_empty() {
            lines.push(format!("    {}", self.dim(&result.note)));
        }
        if let Some(error) = &result.error {
            lines.push(format!("    {}", self.paint(error, Color::Magenta)));
        }
        lines
    }

    fn link_line(&self, key: &ItemKey, link: &LinkEntry) -> String {
        let mut line = format!("    [{}] {} <{}>", self.title(key), link.title, link.url);
        let flags: Vec<&str> = link.contains.present().collect();
        if !flags.is_empty() {
            line.push_str(&format!(" ({})", flags.join(", ")));
        }
        if let Some(note) = &link.note {
            line.push_str(&format!(" {}", self.dim(note)));
        }
        line
    }

    fn verdict_line(&self, verdict: Verdict) -> String {
        match verdict {
            Verdict::Found { affirmative } => self.paint(
                &format!("Archived by {} source(s).", affirmative),
                Color::Green,
            ),
            Verdict::NotFound => self.paint(NOT_FOUND_MESSAGE, Color::Red),
        }
    }

    fn print(&mut self, line: &str) {
        write_line(&mut self.out, line);
    }
}

impl<W: Write> FeedRenderer for TextRenderer<W> {
    fn render(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Protocol(ProtocolEvent::AnnounceItems { items }) => {
                for item in items {
                    self.titles.insert(item.key.clone(), item.title.clone());
                }
                let line = self.dim(&format!("Checking {} sources...", items.len()));
                self.print(&line);
            }
            SessionEvent::Protocol(ProtocolEvent::ItemResult { key, result }) => {
                for line in self.result_lines(key, result) {
                    self.print(&line);
                }
            }
            SessionEvent::Protocol(ProtocolEvent::ItemLink { key, link }) => {
                let line = self.link_line(key, link);
                self.print(&line);
            }
            SessionEvent::Protocol(ProtocolEvent::DecodeError { reason, .. }) => {
                let line = self.dim(&format!("(skipped unreadable record: {})", reason));
                self.print(&line);
            }
            // The summary carries the same verdict
            SessionEvent::Protocol(ProtocolEvent::StreamEnd { .. }) => {}
            SessionEvent::Finished(summary) => {
                if summary.end == SessionEnd::Incomplete {
                    let line = self.paint(
                        "The server closed the connection before all sources answered.",
                        Color::Yellow,
                    );
                    self.print(&line);
                }
                let line = self.verdict_line(summary.verdict);
                self.print(&line);
            }
            SessionEvent::Failed(err) => {
                let line = self.paint(&err.user_message(), Color::Red);
                self.print(&line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsearch_core::{AnnouncedItem, ContentFlags, SessionSummary, TransportError};

    fn render_all(events: &[SessionEvent]) -> String {
        let mut renderer = TextRenderer::new(Vec::new(), false);
        for event in events {
            renderer.render(event);
        }
        String::from_utf8(renderer.out).unwrap()
    }

    fn announce() -> SessionEvent {
        SessionEvent::Protocol(ProtocolEvent::AnnounceItems {
            items: vec![
                AnnouncedItem {
                    key: ItemKey::from("wb"),
                    title: "Wayback Machine".to_string(),
                },
                AnnouncedItem {
                    key: ItemKey::from("gh"),
                    title: "GhostArchive".to_string(),
                },
            ],
        })
    }

    fn finished(verdict: Verdict, end: SessionEnd) -> SessionEvent {
        SessionEvent::Finished(SessionSummary {
            target: "dQw4w9WgXcQ".to_string(),
            items: Vec::new(),
            verdict,
            end,
            truncated_record: false,
            decode_errors: 0,
            elapsed_ms: 0,
        })
    }

    #[test]
    fn test_results_use_announced_titles() {
        let output = render_all(&[
            announce(),
            SessionEvent::Protocol(ProtocolEvent::ItemResult {
                key: ItemKey::from("wb"),
                result: ResultRecord {
                    archived: true,
                    comments: true,
                    available: Some("https://web.archive.org/x".to_string()),
                    ..Default::default()
                },
            }),
            SessionEvent::Protocol(ProtocolEvent::ItemResult {
                key: ItemKey::from("gh"),
                result: ResultRecord::synthetic_error("Did not receive a result from the server."),
            }),
            finished(Verdict::Found { affirmative: 1 }, SessionEnd::Complete),
        ]);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Checking 2 sources...");
        assert_eq!(lines[1], "Wayback Machine: Available (incl. comments)");
        assert_eq!(lines[2], "    https://web.archive.org/x");
        assert_eq!(lines[3], "GhostArchive: Unknown (error)");
        assert_eq!(lines[4], "    Did not receive a result from the server.");
        assert_eq!(lines[5], "Archived by 1 source(s).");
    }

    #[test]
    fn test_metadata_only_and_unknown_key() {
        let output = render_all(&[SessionEvent::Protocol(ProtocolEvent::ItemResult {
            key: ItemKey::from("filmot"),
            result: ResultRecord {
                archived: true,
                metaonly: true,
                note: "Title only".to_string(),
                ..Default::default()
            },
        })]);
        assert_eq!(output, "filmot: Available (metadata only)\n    Title only\n");
    }

    #[test]
    fn test_link_line_lists_flags() {
        let output = render_all(&[
            announce(),
            SessionEvent::Protocol(ProtocolEvent::ItemLink {
                key: ItemKey::from("wb"),
                link: LinkEntry {
                    url: "https://web.archive.org/y".to_string(),
                    title: "Capture".to_string(),
                    note: None,
                    contains: ContentFlags::new().with("video", true).with("comments", false),
                },
            }),
        ]);
        assert!(output.contains("    [Wayback Machine] Capture <https://web.archive.org/y> (video)\n"));
    }

    #[test]
    fn test_not_found_after_incomplete_feed() {
        let output = render_all(&[finished(Verdict::NotFound, SessionEnd::Incomplete)]);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].contains("closed the connection"));
        assert_eq!(lines[1], NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_failure_message() {
        let output = render_all(&[SessionEvent::Failed(TransportError::ServerDown)]);
        assert!(output.starts_with("The server is currently down"));
    }

    #[test]
    fn test_color_wraps_status() {
        let mut renderer = TextRenderer::new(Vec::new(), true);
        renderer.render(&SessionEvent::Protocol(ProtocolEvent::ItemResult {
            key: ItemKey::from("wb"),
            result: ResultRecord::default(),
        }));
        let output = String::from_utf8(renderer.out).unwrap();
        assert!(output.contains("\u{1b}["));
        assert!(output.contains("Not Available"));
    }
}
