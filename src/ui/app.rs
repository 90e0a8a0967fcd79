use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use ratatui_image::{picker::Picker, protocol::StatefulProtocol};
use tracing::debug;

use crate::config::{Config, UiColors, UiPane};
use crate::pipeline::Browser;

use super::draw;
use super::panes::Pane;

const DEFAULT_FONT_SIZE: (u16, u16) = (8, 16);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn create_image_picker() -> Picker {
    let mut picker = base_picker();
    picker.guess_protocol();
    picker
}

#[cfg(unix)]
fn base_picker() -> Picker {
    Picker::from_termios().unwrap_or_else(|_| Picker::new(DEFAULT_FONT_SIZE))
}

#[cfg(not(unix))]
fn base_picker() -> Picker {
    Picker::new(DEFAULT_FONT_SIZE)
}

pub struct HelpModal {
    /// Line index at the top of the viewport
    pub scroll: usize,
    pub total_lines: usize,
    /// Set during rendering
    pub viewport_height: usize,
}

impl HelpModal {
    pub fn new(total_lines: usize) -> Self {
        Self {
            scroll: 0,
            total_lines,
            viewport_height: 10,
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll = (self.scroll + lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn can_scroll_up(&self) -> bool {
        self.scroll > 0
    }

    pub fn can_scroll_down(&self) -> bool {
        self.scroll + self.viewport_height < self.total_lines
    }
}

/// A section in the help modal (e.g., "Global", "Pokedex list")
pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

pub struct App<'a> {
    config: &'a Config,
    pub browser: Browser,
    pub focused_pane: Pane,
    /// Cursor row in the group list; the selection may contain more rows
    pub group_cursor: usize,
    /// Visible member rows, updated during rendering and used for paging
    pub member_page: usize,
    image_picker: Picker,
    sprite_state: Option<Box<dyn StatefulProtocol>>,
    sprite_revision: u64,
    pub help_modal: Option<HelpModal>,
}

impl<'a> App<'a> {
    pub fn new(config: &'a Config, browser: Browser) -> Self {
        let group_cursor = browser.group_selection().first().copied().unwrap_or(0);
        Self {
            config,
            browser,
            focused_pane: Pane::Groups,
            group_cursor,
            member_page: 10,
            image_picker: create_image_picker(),
            sprite_state: None,
            sprite_revision: 0,
            help_modal: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            self.sync_sprite();
            draw::render(terminal, self)?;

            if event::poll(POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }

            self.browser.pump();
        }
        Ok(())
    }

    /// Rebuild the image protocol when the browser swapped the sprite
    fn sync_sprite(&mut self) {
        let detail = self.browser.detail();
        if detail.sprite_revision == self.sprite_revision {
            return;
        }
        self.sprite_revision = detail.sprite_revision;
        self.sprite_state = detail
            .sprite
            .as_ref()
            .map(|image| self.image_picker.new_resize_protocol(image.clone()));
    }

    /// Returns true when the app should quit
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        if self.help_modal.is_some() {
            self.handle_help_modal_key(key);
            return false;
        }

        let config = self.config;
        let global = &config.keys.global;
        if self.key_matches_any(&key, &global.quit) {
            return true;
        }
        if self.key_matches_any(&key, &global.help) {
            self.show_help();
            return false;
        }
        if self.key_matches_any(&key, &global.focus_next) {
            self.focus_pane(self.focused_pane.next());
            return false;
        }
        if self.key_matches_any(&key, &global.focus_prev) {
            self.focus_pane(self.focused_pane.prev());
            return false;
        }

        match self.focused_pane {
            Pane::Groups => self.handle_groups_key(key),
            Pane::Members => self.handle_members_key(key),
        }
        false
    }

    fn handle_groups_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.groups;
        if self.key_matches_any(&key, &keys.next) {
            self.move_group_cursor(1);
        } else if self.key_matches_any(&key, &keys.prev) {
            self.move_group_cursor(-1);
        } else if self.key_matches_any(&key, &keys.toggle) {
            if !self.browser.groups().is_empty() {
                self.browser.toggle_group(self.group_cursor);
            }
        } else if self.key_matches_any(&key, &keys.confirm) {
            self.focus_pane(Pane::Members);
        }
    }

    fn handle_members_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.members;
        let page = self.member_page.max(1) as isize;
        if self.key_matches_any(&key, &keys.next) {
            self.move_member_selection(1);
        } else if self.key_matches_any(&key, &keys.prev) {
            self.move_member_selection(-1);
        } else if self.key_matches_any(&key, &keys.page_down) {
            self.move_member_selection(page);
        } else if self.key_matches_any(&key, &keys.page_up) {
            self.move_member_selection(-page);
        } else if self.key_matches_any(&key, &keys.back) {
            self.focus_pane(Pane::Groups);
        }
    }

    /// Moving the cursor replaces the selection with the cursor row
    fn move_group_cursor(&mut self, delta: isize) {
        let len = self.browser.groups().len();
        if len == 0 {
            return;
        }
        let index = clamp_index(self.group_cursor as isize + delta, len);
        if index == self.group_cursor && self.browser.group_selection() == [index] {
            return;
        }
        self.group_cursor = index;
        self.browser.select_groups(&[index]);
    }

    fn move_member_selection(&mut self, delta: isize) {
        let len = self.browser.members().len();
        if len == 0 {
            return;
        }
        let index = match self.browser.member_selection() {
            // First move lands on the top row
            None => 0,
            Some(current) => clamp_index(current as isize + delta, len),
        };
        if self.browser.member_selection() == Some(index) {
            return;
        }
        self.browser.select_member(Some(index));
    }

    fn focus_pane(&mut self, pane: Pane) {
        debug!(pane = pane.title(), "focus");
        self.focused_pane = pane;
    }

    /// Check if the key event matches any of the bindings in the list
    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| key_matches_single(event, b))
    }

    // =========================================================================
    // Help Modal
    // =========================================================================

    /// Help content generated from the configured bindings
    pub fn help_entries(&self) -> Vec<HelpSection> {
        let keys = &self.config.keys;

        vec![
            HelpSection {
                title: "Global",
                entries: vec![
                    HelpEntry {
                        action: "Quit",
                        keys: keys.global.quit.join(", "),
                    },
                    HelpEntry {
                        action: "Help",
                        keys: keys.global.help.join(", "),
                    },
                    HelpEntry {
                        action: "Next pane",
                        keys: keys.global.focus_next.join(", "),
                    },
                    HelpEntry {
                        action: "Previous pane",
                        keys: keys.global.focus_prev.join(", "),
                    },
                ],
            },
            HelpSection {
                title: "Pokedex list",
                entries: vec![
                    HelpEntry {
                        action: "Next",
                        keys: keys.groups.next.join(", "),
                    },
                    HelpEntry {
                        action: "Previous",
                        keys: keys.groups.prev.join(", "),
                    },
                    HelpEntry {
                        action: "Toggle",
                        keys: keys.groups.toggle.join(", "),
                    },
                    HelpEntry {
                        action: "Open",
                        keys: keys.groups.confirm.join(", "),
                    },
                ],
            },
            HelpSection {
                title: "Pokemon list",
                entries: vec![
                    HelpEntry {
                        action: "Next",
                        keys: keys.members.next.join(", "),
                    },
                    HelpEntry {
                        action: "Previous",
                        keys: keys.members.prev.join(", "),
                    },
                    HelpEntry {
                        action: "Page Down",
                        keys: keys.members.page_down.join(", "),
                    },
                    HelpEntry {
                        action: "Page Up",
                        keys: keys.members.page_up.join(", "),
                    },
                    HelpEntry {
                        action: "Back",
                        keys: keys.members.back.join(", "),
                    },
                ],
            },
        ]
    }

    fn show_help(&mut self) {
        let total_lines = self
            .help_entries()
            .iter()
            .map(|section| section.entries.len() + 2)
            .sum();
        self.help_modal = Some(HelpModal::new(total_lines));
    }

    fn handle_help_modal_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
            self.help_modal = None;
            return;
        }

        let Some(modal) = self.help_modal.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => modal.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => modal.scroll_up(1),
            KeyCode::PageDown => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_down(page);
            }
            KeyCode::PageUp => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_up(page);
            }
            _ => {}
        }
    }

    // =========================================================================
    // Accessors for drawing
    // =========================================================================

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn ui_pane(&self) -> &UiPane {
        &self.config.ui.pane
    }

    pub fn sprite_state(&mut self) -> Option<&mut Box<dyn StatefulProtocol>> {
        self.sprite_state.as_mut()
    }

    pub fn image_font_size(&self) -> (u16, u16) {
        self.image_picker.font_size
    }
}

fn clamp_index(index: isize, len: usize) -> usize {
    index.clamp(0, len as isize - 1) as usize
}

/// Check if the key event matches a single binding string
fn key_matches_single(event: &KeyEvent, binding: &str) -> bool {
    let trimmed = binding.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Ctrl/Alt/Super combinations are not bindable
    let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
    if event.modifiers.intersects(disallowed) {
        return false;
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "enter" => matches!(event.code, KeyCode::Enter),
        "tab" => matches!(event.code, KeyCode::Tab),
        "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
        "backspace" => matches!(event.code, KeyCode::Backspace),
        "esc" | "escape" => matches!(event.code, KeyCode::Esc),
        "space" => matches!(event.code, KeyCode::Char(' ')),
        "up" => matches!(event.code, KeyCode::Up),
        "down" => matches!(event.code, KeyCode::Down),
        "left" => matches!(event.code, KeyCode::Left),
        "right" => matches!(event.code, KeyCode::Right),
        "pageup" | "page_up" => matches!(event.code, KeyCode::PageUp),
        "pagedown" | "page_down" => matches!(event.code, KeyCode::PageDown),
        "home" => matches!(event.code, KeyCode::Home),
        "end" => matches!(event.code, KeyCode::End),
        name if name.len() > 1 && name.starts_with('f') => match name[1..].parse::<u8>() {
            Ok(n @ 1..=12) => event.code == KeyCode::F(n),
            _ => false,
        },
        // Single character - case-sensitive (m != M, since M requires Shift)
        _ => {
            let mut chars = trimmed.chars();
            if let (Some(first), None) = (chars.next(), chars.next()) {
                matches!(event.code, KeyCode::Char(c) if c == first)
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_named_bindings() {
        assert!(key_matches_single(&key(KeyCode::Enter), "Enter"));
        assert!(key_matches_single(&key(KeyCode::Char(' ')), "space"));
        assert!(key_matches_single(&key(KeyCode::BackTab), "Backtab"));
        assert!(key_matches_single(&key(KeyCode::PageDown), "PageDown"));
        assert!(key_matches_single(&key(KeyCode::F(1)), "F1"));
        assert!(key_matches_single(&key(KeyCode::F(12)), "f12"));
        assert!(!key_matches_single(&key(KeyCode::F(1)), "F13"));
        assert!(key_matches_single(&key(KeyCode::Esc), "Escape"));
    }

    #[test]
    fn test_single_char_is_case_sensitive() {
        assert!(key_matches_single(&key(KeyCode::Char('j')), "j"));
        assert!(!key_matches_single(&key(KeyCode::Char('J')), "j"));
        let shifted = KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT);
        assert!(key_matches_single(&shifted, "?"));
    }

    #[test]
    fn test_control_combinations_never_match() {
        let ctrl_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(!key_matches_single(&ctrl_q, "q"));
    }

    #[test]
    fn test_help_modal_scroll_is_bounded() {
        let mut modal = HelpModal::new(12);
        modal.viewport_height = 5;
        modal.scroll_down(100);
        assert_eq!(modal.scroll, 7);
        assert!(!modal.can_scroll_down());
        modal.scroll_up(100);
        assert_eq!(modal.scroll, 0);
        assert!(!modal.can_scroll_up());
    }

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(-3, 5), 0);
        assert_eq!(clamp_index(9, 5), 4);
        assert_eq!(clamp_index(2, 5), 2);
    }
}
