use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};

use crate::{
    error::{HelperError, Result},
    prompt::Prompter,
    types::{InputRequest, PickItem},
};

const PROMPT_EVENT_POLL_MILLIS: u64 = 200;
const UI_HEADER_HEIGHT: u16 = 3;
const UI_FOOTER_HEIGHT: u16 = 3;
const UI_INPUT_HEIGHT: u16 = 3;
const EMPTY_FILTER_PLACEHOLDER: &str = "<no matching entries>";
const PICK_FOOTER_HINT: &str = "type to filter | Up/Down: move | Enter: select | Esc: cancel";
const INPUT_FOOTER_HINT: &str = "Enter: submit | Esc: cancel";

type PromptTerminal = Terminal<CrosstermBackend<std::io::Stdout>>;

/// Full-screen pick and input prompts drawn with ratatui.
#[derive(Debug)]
pub(crate) struct TuiPrompter {
    _private: (),
}

impl TuiPrompter {
    pub(crate) fn new() -> Result<Self> {
        if !atty::is(atty::Stream::Stdin) || !atty::is(atty::Stream::Stdout) {
            return Err(HelperError::InvalidInput(
                "interactive prompts require a terminal; use `--answer` to script them".to_owned(),
            ));
        }
        Ok(Self { _private: () })
    }
}

impl Prompter for TuiPrompter {
    fn pick(&mut self, title: &str, items: &[PickItem]) -> Result<Option<usize>> {
        let mut state = PickState::new(title, items);
        with_terminal(|terminal| run_prompt(terminal, &mut state))
    }

    fn input(&mut self, request: &InputRequest) -> Result<Option<String>> {
        let mut state = InputState::new(request);
        with_terminal(|terminal| run_prompt(terminal, &mut state))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptStep<T> {
    Continue,
    Done(Option<T>),
}

trait PromptState {
    type Answer;

    fn on_key(&mut self, key: KeyEvent) -> PromptStep<Self::Answer>;

    fn render(&mut self, frame: &mut Frame);
}

fn with_terminal<T>(prompt: impl FnOnce(&mut PromptTerminal) -> Result<T>) -> Result<T> {
    let mut terminal = init_terminal()?;
    let prompt_result = prompt(&mut terminal);
    let restore_result = restore_terminal(&mut terminal);
    restore_result?;
    prompt_result
}

fn init_terminal() -> Result<PromptTerminal> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut PromptTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_prompt<S: PromptState>(
    terminal: &mut PromptTerminal,
    state: &mut S,
) -> Result<Option<S::Answer>> {
    loop {
        terminal.draw(|frame| state.render(frame))?;
        if !event::poll(Duration::from_millis(PROMPT_EVENT_POLL_MILLIS))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if let PromptStep::Done(answer) = state.on_key(key) {
            return Ok(answer);
        }
    }
}

fn is_cancel_key(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn prompt_layout(frame: &Frame, body_constraints: &[Constraint]) -> Vec<ratatui::layout::Rect> {
    let mut constraints = vec![Constraint::Length(UI_HEADER_HEIGHT)];
    constraints.extend_from_slice(body_constraints);
    constraints.push(Constraint::Length(UI_FOOTER_HEIGHT));
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area())
        .to_vec()
}

fn footer(hint: &str) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        hint.to_owned(),
        Style::default().add_modifier(Modifier::DIM),
    )))
    .block(Block::default().borders(Borders::ALL))
}

struct PickState<'a> {
    title: &'a str,
    items: &'a [PickItem],
    query: String,
    visible: Vec<usize>,
    list_state: ListState,
}

impl<'a> PickState<'a> {
    fn new(title: &'a str, items: &'a [PickItem]) -> Self {
        let mut state = Self {
            title,
            items,
            query: String::new(),
            visible: Vec::new(),
            list_state: ListState::default(),
        };
        state.refilter();
        state
    }

    fn refilter(&mut self) {
        let query = self.query.trim().to_lowercase();
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item_matches_query(item, &query))
            .map(|(index, _)| index)
            .collect();
        let selected = if self.visible.is_empty() { None } else { Some(0) };
        self.list_state.select(selected);
    }

    fn move_selection(&mut self, forward: bool) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() - 1;
        let current = self.list_state.selected().unwrap_or(0);
        let next = match (forward, current) {
            (true, current) if current >= last => 0,
            (true, current) => current + 1,
            (false, 0) => last,
            (false, current) => current - 1,
        };
        self.list_state.select(Some(next));
    }

    fn selected_item_index(&self) -> Option<usize> {
        self.list_state
            .selected()
            .and_then(|row| self.visible.get(row).copied())
    }
}

fn item_matches_query(item: &PickItem, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    [
        Some(item.label.as_str()),
        item.description.as_deref(),
        item.detail.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|text| text.to_lowercase().contains(query))
}

impl PromptState for PickState<'_> {
    type Answer = usize;

    fn on_key(&mut self, key: KeyEvent) -> PromptStep<usize> {
        if is_cancel_key(&key) {
            return PromptStep::Done(None);
        }
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => {
                if let Some(index) = self.selected_item_index() {
                    return PromptStep::Done(Some(index));
                }
            }
            KeyCode::Down => self.move_selection(true),
            KeyCode::Up => self.move_selection(false),
            KeyCode::Char('n') if control => self.move_selection(true),
            KeyCode::Char('p') if control => self.move_selection(false),
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.refilter();
                }
            }
            KeyCode::Char(character) if !control => {
                self.query.push(character);
                self.refilter();
            }
            _ => {}
        }
        PromptStep::Continue
    }

    fn render(&mut self, frame: &mut Frame) {
        let areas = prompt_layout(frame, &[Constraint::Min(1)]);

        let header = Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(self.query.clone()),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(self.title.to_owned()),
        );
        frame.render_widget(header, areas[0]);

        let rows: Vec<ListItem> = if self.visible.is_empty() {
            vec![ListItem::new(Line::from(Span::styled(
                EMPTY_FILTER_PLACEHOLDER,
                Style::default().add_modifier(Modifier::DIM),
            )))]
        } else {
            self.visible
                .iter()
                .map(|index| pick_row(&self.items[*index]))
                .collect()
        };
        let list = List::new(rows)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, areas[1], &mut self.list_state);

        frame.render_widget(footer(PICK_FOOTER_HINT), areas[2]);
    }
}

fn pick_row(item: &PickItem) -> ListItem<'static> {
    let mut first_line = vec![Span::styled(
        item.label.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(description) = item.description.as_deref().filter(|text| !text.is_empty()) {
        first_line.push(Span::raw("  "));
        first_line.push(Span::styled(
            description.to_owned(),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    let mut lines = vec![Line::from(first_line)];
    if let Some(detail) = item.detail.as_deref().filter(|text| !text.is_empty()) {
        lines.push(Line::from(format!("    {detail}")));
    }
    ListItem::new(lines)
}

struct InputState<'a> {
    request: &'a InputRequest,
    buffer: String,
}

impl<'a> InputState<'a> {
    fn new(request: &'a InputRequest) -> Self {
        Self {
            request,
            buffer: String::new(),
        }
    }
}

impl PromptState for InputState<'_> {
    type Answer = String;

    fn on_key(&mut self, key: KeyEvent) -> PromptStep<String> {
        if is_cancel_key(&key) {
            return PromptStep::Done(None);
        }
        match key.code {
            KeyCode::Enter => return PromptStep::Done(Some(std::mem::take(&mut self.buffer))),
            KeyCode::Backspace => {
                self.buffer.pop();
            }
            KeyCode::Char(character) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.buffer.push(character);
            }
            _ => {}
        }
        PromptStep::Continue
    }

    fn render(&mut self, frame: &mut Frame) {
        let areas = prompt_layout(
            frame,
            &[Constraint::Length(UI_INPUT_HEIGHT), Constraint::Min(0)],
        );

        let header = Paragraph::new(self.request.prompt.clone()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(self.request.title.clone()),
        );
        frame.render_widget(header, areas[0]);

        let value = if self.buffer.is_empty() {
            Line::from(Span::styled(
                self.request.placeholder.clone(),
                Style::default().add_modifier(Modifier::DIM),
            ))
        } else {
            Line::from(self.buffer.clone())
        };
        frame.render_widget(
            Paragraph::new(value).block(Block::default().borders(Borders::ALL)),
            areas[1],
        );

        frame.render_widget(footer(INPUT_FOOTER_HINT), areas[3]);
    }
}

#[cfg(test)]
mod unit_tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::{InputState, PickState, PromptState, PromptStep};
    use crate::types::{InputRequest, PickItem};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text<S: PromptState>(state: &mut S, text: &str) {
        for character in text.chars() {
            assert!(matches!(
                state.on_key(key(KeyCode::Char(character))),
                PromptStep::Continue
            ));
        }
    }

    fn items() -> Vec<PickItem> {
        vec![
            PickItem {
                label: "build".to_owned(),
                description: Some("npm run build".to_owned()),
                detail: Some(String::new()),
            },
            PickItem {
                label: "test".to_owned(),
                description: Some("cargo test".to_owned()),
                detail: Some("cargo test {filter}".to_owned()),
            },
            PickItem::label("lint"),
        ]
    }

    #[test]
    fn enter_selects_first_item_by_default() {
        let items = items();
        let mut state = PickState::new("Run command", &items);
        assert_eq!(state.on_key(key(KeyCode::Enter)), PromptStep::Done(Some(0)));
    }

    #[test]
    fn filter_matches_caption_and_maps_back_to_item_index() {
        let items = items();
        let mut state = PickState::new("Run command", &items);
        type_text(&mut state, "CARGO");
        assert_eq!(state.visible, [1]);
        assert_eq!(state.on_key(key(KeyCode::Enter)), PromptStep::Done(Some(1)));
    }

    #[test]
    fn selection_wraps_in_both_directions() {
        let items = items();
        let mut state = PickState::new("Run command", &items);
        state.on_key(key(KeyCode::Up));
        assert_eq!(state.selected_item_index(), Some(2));
        state.on_key(key(KeyCode::Down));
        assert_eq!(state.selected_item_index(), Some(0));
    }

    #[test]
    fn enter_without_matches_keeps_prompt_open() {
        let items = items();
        let mut state = PickState::new("Run command", &items);
        type_text(&mut state, "zzz");
        assert_eq!(state.on_key(key(KeyCode::Enter)), PromptStep::Continue);
        state.on_key(key(KeyCode::Backspace));
        state.on_key(key(KeyCode::Backspace));
        state.on_key(key(KeyCode::Backspace));
        assert_eq!(state.visible.len(), 3);
    }

    #[test]
    fn escape_and_ctrl_c_cancel() {
        let items = items();
        let mut state = PickState::new("Run command", &items);
        assert_eq!(state.on_key(key(KeyCode::Esc)), PromptStep::Done(None));

        let request = InputRequest::for_argument("name");
        let mut input = InputState::new(&request);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(input.on_key(ctrl_c), PromptStep::Done(None));
    }

    #[test]
    fn input_collects_and_edits_text() {
        let request = InputRequest::for_argument("name");
        let mut input = InputState::new(&request);
        type_text(&mut input, "prodd");
        input.on_key(key(KeyCode::Backspace));
        assert_eq!(
            input.on_key(key(KeyCode::Enter)),
            PromptStep::Done(Some("prod".to_owned()))
        );
    }
}
