use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::practice::{Practice, Screen};
use crate::score::ScoreSummary;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const LOW_TIME_SECS: i32 = 5;

impl Widget for &Practice {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Practice => {
                render_practice(self, area, buf);
                if self.state().show_popup {
                    render_popup(self, area, buf);
                } else if self.state().paused {
                    render_paused(area, buf);
                }
            }
            Screen::Results => render_results(self, area, buf),
        }
    }
}

/// Styled spans for the current phrase: judged words in green/red, the next
/// pending word underlined, the rest dimmed.
pub fn phrase_spans<'a>(words: &[&'a str], results: &[Option<bool>]) -> Vec<Span<'a>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = bold.add_modifier(Modifier::DIM);
    let pending = results.iter().position(Option::is_none);

    words
        .iter()
        .enumerate()
        .flat_map(|(idx, word)| {
            let style = match results.get(idx).copied().flatten() {
                Some(true) => bold.fg(Color::Green),
                Some(false) => bold.fg(Color::Red),
                None if pending == Some(idx) => dim.add_modifier(Modifier::UNDERLINED),
                None => dim,
            };
            let separator = (idx > 0).then(|| Span::raw(" "));
            separator
                .into_iter()
                .chain(std::iter::once(Span::styled(*word, style)))
        })
        .collect()
}

fn render_practice(practice: &Practice, area: Rect, buf: &mut Buffer) {
    let state = practice.state();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let Some(phrase) = state.current_phrase() else {
        Paragraph::new("Walang parirala sa set na ito.")
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    };

    let usable_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let phrase_lines = if phrase.text.width() <= usable_width as usize {
        1
    } else {
        ((phrase.text.width() as f64 / usable_width as f64).ceil() + 1.0) as u16
    };
    let padding = area.height.saturating_sub(phrase_lines + 6) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(1),            // header
            Constraint::Length(padding),      // spacer
            Constraint::Length(2),            // timer
            Constraint::Length(phrase_lines), // phrase
            Constraint::Length(2),            // input
            Constraint::Min(0),               // spacer
            Constraint::Length(1),            // legend
        ])
        .split(area);

    let summary = practice.store().summary();
    let header = format!(
        "{}   parirala {}/{}   {} puntos",
        practice.title,
        state.current_phrase_index + 1,
        state.phrases.len(),
        summary.total_points
    );
    Paragraph::new(Span::styled(header, bold_style.fg(Color::Cyan)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let timer_style = if state.timer <= LOW_TIME_SECS {
        bold_style.fg(Color::Red)
    } else {
        dim_style.add_modifier(Modifier::BOLD)
    };
    Paragraph::new(Span::styled(format!("{}", state.timer.max(0)), timer_style))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let words = phrase.words();
    Paragraph::new(Line::from(phrase_spans(&words, &state.word_results)))
        .alignment(if phrase_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    let input_line = if state.is_speaking {
        Span::styled("sinusuri...", italic_style.fg(Color::Yellow))
    } else if state.is_active {
        Span::styled(format!("> {}_", practice.input), bold_style)
    } else {
        Span::styled("pindutin ang enter para magsimula", italic_style)
    };
    Paragraph::new(input_line)
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    Paragraph::new(Span::styled(
        "(enter) bigkasin / (tab) hinto / (←/→) lipat / (esc) labas",
        italic_style,
    ))
    .render(chunks[6], buf);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_popup(practice: &Practice, area: Rect, buf: &mut Buffer) {
    let state = practice.state();
    let popup = centered(area, 44, 7);
    let correct = state.correct_word_count();
    let total = state.word_results.len();

    let (title, color) = if state.is_game_completed {
        ("Tapos na ang set!", Color::Magenta)
    } else if correct == total {
        ("Magaling!", Color::Green)
    } else {
        ("Subukan pa!", Color::Yellow)
    };

    let body = vec![
        Line::from(Span::styled(
            format!("+{} puntos", practice.last_points.unwrap_or(0)),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{correct}/{total} salitang tama")),
        Line::from(""),
        Line::from(Span::styled(
            "pindutin ang anumang key",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];

    Clear.render(popup, buf);
    Paragraph::new(body)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(color)),
        )
        .alignment(Alignment::Center)
        .render(popup, buf);
}

fn render_paused(area: Rect, buf: &mut Buffer) {
    let popup = centered(area, 30, 3);
    Clear.render(popup, buf);
    Paragraph::new(Span::styled(
        "NAKAHINTO - (tab) ituloy",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
    ))
    .block(Block::default().borders(Borders::ALL))
    .alignment(Alignment::Center)
    .render(popup, buf);
}

/// One-line score summary shown on the results screen.
pub fn summary_line(summary: &ScoreSummary) -> String {
    format!(
        "{}/{} puntos   {} salitang tama   {:.0}% tapos",
        summary.total_points,
        summary.max_points,
        summary.total_words,
        summary.completion_percentage
    )
}

fn render_results(practice: &Practice, area: Rect, buf: &mut Buffer) {
    let state = practice.state();
    let summary = practice.store().summary();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let history_height = if practice.recent_runs.is_empty() {
        0
    } else {
        practice.recent_runs.len() as u16 + 1
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),              // title
            Constraint::Length(1),              // summary
            Constraint::Length(1),              // best
            Constraint::Length(1),              // padding
            Constraint::Min(1),                 // phrases
            Constraint::Length(history_height), // recent runs
            Constraint::Length(1),              // legend
        ])
        .split(area);

    let title_color = if summary.is_perfect() {
        Color::Magenta
    } else {
        Color::Cyan
    };
    Paragraph::new(Span::styled(
        practice.title.clone(),
        bold_style.fg(title_color),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    Paragraph::new(Span::styled(summary_line(&summary), bold_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    if let Some(best) = practice.best_points {
        Paragraph::new(Span::styled(
            format!("pinakamataas: {best} puntos"),
            italic_style.fg(Color::Cyan),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    let rows: Vec<Line> = state
        .phrases
        .iter()
        .map(|p| {
            let (mark, color) = if p.is_continue {
                ("✓", Color::Green)
            } else {
                ("·", Color::DarkGray)
            };
            Line::from(vec![
                Span::styled(format!("{mark} "), Style::default().fg(color)),
                Span::raw(format!("{:<4}", p.user_points)),
                Span::raw(p.text.clone()),
            ])
        })
        .collect();
    Paragraph::new(rows)
        .wrap(Wrap { trim: true })
        .render(chunks[4], buf);

    if !practice.recent_runs.is_empty() {
        let mut history = vec![Line::from(Span::styled("mga huling takbo", bold_style))];
        history.extend(practice.recent_runs.iter().map(|run| {
            Line::from(Span::styled(
                format!(
                    "{}  {}/{} puntos",
                    run.completed_at.format("%Y-%m-%d %H:%M"),
                    run.total_points,
                    run.max_points
                ),
                italic_style,
            ))
        }));
        Paragraph::new(history).render(chunks[5], buf);
    }

    Paragraph::new(Span::styled("(r)ulitin / (q)/(esc) labas", italic_style))
        .render(chunks[6], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrase::Phrase;
    use crate::phrase_set::PhraseSet;
    use crate::progress::RunRecord;
    use crate::recognizer::ScriptedRecognizer;
    use crate::runtime::SessionEvent;
    use crate::session::SessionConfig;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::mpsc;
    use std::time::Instant;

    fn create_test_practice(
        texts: &[&str],
        script: Vec<Option<bool>>,
    ) -> (Practice, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel();
        let set = PhraseSet {
            name: "ui".into(),
            title: "Pagsubok".into(),
            phrases: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Phrase::new(i, *t))
                .collect(),
        };
        let practice = Practice::new(
            set,
            SessionConfig::default(),
            false,
            Box::new(ScriptedRecognizer::new(script)),
            None,
            tx,
        );
        (practice, rx)
    }

    fn press(practice: &mut Practice, code: KeyCode) {
        practice.handle_event(
            SessionEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)),
            Instant::now(),
        );
    }

    fn rendered(practice: &Practice, area: Rect) -> String {
        let mut buffer = Buffer::empty(area);
        practice.render(area, &mut buffer);
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_phrase_spans_styles() {
        let words = ["ang", "bata", "ay"];
        let spans = phrase_spans(&words, &[Some(true), Some(false), None]);

        assert_eq!(spans.len(), 5);
        assert_eq!(spans[0].content, "ang");
        assert_eq!(spans[0].style.fg, Some(Color::Green));
        assert_eq!(spans[1].content, " ");
        assert_eq!(spans[2].style.fg, Some(Color::Red));
        assert!(spans[4].style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_phrase_spans_without_results() {
        let words = ["isa", "dalawa"];
        let spans = phrase_spans(&words, &[]);

        assert_eq!(spans.len(), 3);
        assert!(spans[0].style.add_modifier.contains(Modifier::DIM));
    }

    #[test]
    fn test_render_practice_screen() {
        let (practice, _rx) = create_test_practice(&["ang bata ay masaya"], vec![]);
        let text = rendered(&practice, Rect::new(0, 0, 80, 24));

        assert!(text.contains("Pagsubok"));
        assert!(text.contains("masaya"));
        assert!(text.contains("20"));
        assert!(text.contains("enter"));
    }

    #[test]
    fn test_render_paused_overlay() {
        let (mut practice, _rx) = create_test_practice(&["isa"], vec![]);
        press(&mut practice, KeyCode::Enter);
        press(&mut practice, KeyCode::Tab);

        let text = rendered(&practice, Rect::new(0, 0, 80, 24));

        assert!(text.contains("NAKAHINTO"));
    }

    #[test]
    fn test_render_popup_after_scoring() {
        let (mut practice, rx) = create_test_practice(&["isa", "dalawa"], vec![Some(true)]);
        press(&mut practice, KeyCode::Char('i'));
        press(&mut practice, KeyCode::Enter);
        let reply = rx.try_recv().unwrap();
        practice.handle_event(reply, Instant::now());

        let text = rendered(&practice, Rect::new(0, 0, 80, 24));

        assert!(text.contains("Magaling!"));
        assert!(text.contains("+5 puntos"));
    }

    #[test]
    fn test_render_results_screen() {
        let (mut practice, rx) = create_test_practice(&["isa"], vec![Some(false)]);
        press(&mut practice, KeyCode::Char('x'));
        press(&mut practice, KeyCode::Enter);
        let reply = rx.try_recv().unwrap();
        practice.handle_event(reply, Instant::now());
        press(&mut practice, KeyCode::Enter);
        assert_eq!(practice.screen, Screen::Results);

        let text = rendered(&practice, Rect::new(0, 0, 80, 24));

        assert!(text.contains("0/5 puntos"));
        assert!(text.contains("100% tapos"));
        assert!(text.contains("(r)ulitin"));
    }

    #[test]
    fn test_render_results_lists_recent_runs() {
        let (mut practice, rx) = create_test_practice(&["isa"], vec![Some(true)]);
        press(&mut practice, KeyCode::Char('i'));
        press(&mut practice, KeyCode::Enter);
        let reply = rx.try_recv().unwrap();
        practice.handle_event(reply, Instant::now());
        press(&mut practice, KeyCode::Enter);
        let completed_at = chrono::Local::now();
        practice.recent_runs = vec![RunRecord {
            set_name: "ui".into(),
            total_points: 5,
            total_words: 1,
            max_points: 5,
            phrase_count: 1,
            completed_at,
        }];

        let text = rendered(&practice, Rect::new(0, 0, 80, 24));

        assert!(text.contains("mga huling takbo"));
        let row = format!("{}  5/5 puntos", completed_at.format("%Y-%m-%d %H:%M"));
        assert!(text.contains(&row));
    }

    #[test]
    fn test_render_small_area() {
        let (practice, _rx) =
            create_test_practice(&["ang hindi lumingon sa pinanggalingan"], vec![]);
        let area = Rect::new(0, 0, 12, 4);
        let mut buffer = Buffer::empty(area);

        (&practice).render(area, &mut buffer);

        assert!(*buffer.area() == area);
    }

    #[test]
    fn test_summary_line() {
        let phrases = vec![Phrase {
            is_continue: true,
            user_points: 10,
            user_words: 2,
            ..Phrase::new(0, "isa dalawa")
        }];
        let summary = ScoreSummary::from_phrases(&phrases, 5);

        assert_eq!(
            summary_line(&summary),
            "10/10 puntos   2 salitang tama   100% tapos"
        );
    }
}
