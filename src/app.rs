use crate::models::*;
use crate::scanner::ProjectScanner;
use crate::transcript;
use crate::ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    ProjectList,
    ConversationList,
    ConversationView,
}

/// What the bottom input line is collecting, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Live fuzzy filter over the current list.
    Filter,
    RenameProject,
    RenameConversation,
    /// Collecting a corrected working directory; optionally launch once set.
    CorrectPath { launch_after: bool },
    ConfirmDelete,
}

/// A resume request handed back out of the event loop; the CLI is spawned
/// only after the terminal has been restored.
#[derive(Debug, Clone)]
pub struct PendingLaunch {
    pub session_id: String,
    pub working_path: String,
}

pub struct App {
    pub scanner: ProjectScanner,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub projects: Vec<ProjectInfo>,
    pub displayed_projects: Vec<ProjectInfo>,
    /// Project whose conversations are currently shown.
    pub current_project: Option<ProjectInfo>,
    pub conversations: Vec<ConversationInfo>,
    pub displayed_conversations: Vec<ConversationInfo>,
    pub messages: Vec<Message>,
    pub filter_query: String,
    pub selected_project: usize,
    pub selected_conversation: usize,
    pub scroll_offset: usize,
    pub project_scroll_offset: usize,
    pub conversation_scroll_offset: usize,
    /// Transient feedback line (mutation results, launch hints).
    pub status: Option<String>,
    pub should_quit: bool,
    pub pending_launch: Option<PendingLaunch>,
    pub terminal_height: usize,
}

fn ensure_visible(selected: usize, scroll_offset: &mut usize, visible_height: usize) {
    if visible_height == 0 {
        return;
    }
    if selected < *scroll_offset {
        *scroll_offset = selected;
    } else if selected >= *scroll_offset + visible_height {
        *scroll_offset = selected - visible_height + 1;
    }
}

impl App {
    pub fn new() -> App {
        let mut app = App::with_scanner(ProjectScanner::new());
        // When launched inside a known project directory, jump straight to
        // that project's conversations.
        if let Some(project) = app.scanner.current_dir_project() {
            app.open_project(project);
        }
        app
    }

    pub fn with_scanner(mut scanner: ProjectScanner) -> App {
        let projects = scanner.scan_projects();
        let displayed_projects = projects.clone();
        App {
            scanner,
            screen: Screen::ProjectList,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            projects,
            displayed_projects,
            current_project: None,
            conversations: Vec::new(),
            displayed_conversations: Vec::new(),
            messages: Vec::new(),
            filter_query: String::new(),
            selected_project: 0,
            selected_conversation: 0,
            scroll_offset: 0,
            project_scroll_offset: 0,
            conversation_scroll_offset: 0,
            status: None,
            should_quit: false,
            pending_launch: None,
            terminal_height: 24,
        }
    }

    // ----------------------------------------------------------------
    // Navigation
    // ----------------------------------------------------------------

    pub fn open_selected_project(&mut self) {
        if let Some(project) = self.displayed_projects.get(self.selected_project).cloned() {
            self.open_project(project);
        }
    }

    pub fn open_project(&mut self, project: ProjectInfo) {
        self.conversations = project.conversations.clone();
        self.displayed_conversations = self.conversations.clone();
        self.current_project = Some(project);
        self.filter_query.clear();
        self.selected_conversation = 0;
        self.conversation_scroll_offset = 0;
        self.scroll_offset = 0;
        self.screen = Screen::ConversationList;
    }

    pub fn open_selected_conversation(&mut self) {
        if let Some(conversation) = self.displayed_conversations.get(self.selected_conversation) {
            self.messages = transcript::load_messages(&conversation.transcript_path);
            self.scroll_offset = 0;
            self.screen = Screen::ConversationView;
        }
    }

    pub fn go_back(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        match self.screen {
            Screen::ProjectList => self.should_quit = true,
            Screen::ConversationList => {
                self.screen = Screen::ProjectList;
                self.current_project = None;
                self.filter_query.clear();
                self.displayed_projects = self.projects.clone();
                self.selected_conversation = 0;
                self.conversation_scroll_offset = 0;
            }
            Screen::ConversationView => {
                self.screen = Screen::ConversationList;
                self.scroll_offset = 0;
            }
        }
    }

    fn ensure_table_scroll(&mut self) {
        let th = self.terminal_height;
        match self.screen {
            Screen::ProjectList => {
                let vh = th.saturating_sub(5);
                ensure_visible(self.selected_project, &mut self.project_scroll_offset, vh);
            }
            Screen::ConversationList => {
                let vh = th.saturating_sub(6);
                ensure_visible(
                    self.selected_conversation,
                    &mut self.conversation_scroll_offset,
                    vh,
                );
            }
            Screen::ConversationView => {}
        }
    }

    pub fn navigate_up(&mut self) {
        match self.screen {
            Screen::ProjectList => {
                self.selected_project = self.selected_project.saturating_sub(1);
            }
            Screen::ConversationList => {
                self.selected_conversation = self.selected_conversation.saturating_sub(1);
            }
            Screen::ConversationView => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
        }
        self.ensure_table_scroll();
    }

    pub fn navigate_down(&mut self) {
        match self.screen {
            Screen::ProjectList => {
                if !self.displayed_projects.is_empty()
                    && self.selected_project < self.displayed_projects.len() - 1
                {
                    self.selected_project += 1;
                }
            }
            Screen::ConversationList => {
                if !self.displayed_conversations.is_empty()
                    && self.selected_conversation < self.displayed_conversations.len() - 1
                {
                    self.selected_conversation += 1;
                }
            }
            Screen::ConversationView => {
                self.scroll_offset += 1;
            }
        }
        self.ensure_table_scroll();
    }

    pub fn half_page_down(&mut self) {
        let half = self.terminal_height / 2;
        match self.screen {
            Screen::ProjectList => {
                if !self.displayed_projects.is_empty() {
                    self.selected_project =
                        (self.selected_project + half).min(self.displayed_projects.len() - 1);
                }
            }
            Screen::ConversationList => {
                if !self.displayed_conversations.is_empty() {
                    self.selected_conversation = (self.selected_conversation + half)
                        .min(self.displayed_conversations.len() - 1);
                }
            }
            Screen::ConversationView => {
                self.scroll_offset += half;
            }
        }
        self.ensure_table_scroll();
    }

    pub fn half_page_up(&mut self) {
        let half = self.terminal_height / 2;
        match self.screen {
            Screen::ProjectList => {
                self.selected_project = self.selected_project.saturating_sub(half);
            }
            Screen::ConversationList => {
                self.selected_conversation = self.selected_conversation.saturating_sub(half);
            }
            Screen::ConversationView => {
                self.scroll_offset = self.scroll_offset.saturating_sub(half);
            }
        }
        self.ensure_table_scroll();
    }

    pub fn go_to_top(&mut self) {
        match self.screen {
            Screen::ProjectList => {
                self.selected_project = 0;
                self.project_scroll_offset = 0;
            }
            Screen::ConversationList => {
                self.selected_conversation = 0;
                self.conversation_scroll_offset = 0;
            }
            Screen::ConversationView => self.scroll_offset = 0,
        }
    }

    pub fn go_to_bottom(&mut self) {
        match self.screen {
            Screen::ProjectList => {
                if !self.displayed_projects.is_empty() {
                    self.selected_project = self.displayed_projects.len() - 1;
                }
            }
            Screen::ConversationList => {
                if !self.displayed_conversations.is_empty() {
                    self.selected_conversation = self.displayed_conversations.len() - 1;
                }
            }
            Screen::ConversationView => {
                // Scroll to a large value; the UI clamps it.
                self.scroll_offset = usize::MAX / 2;
            }
        }
        self.ensure_table_scroll();
    }

    // ----------------------------------------------------------------
    // Filtering
    // ----------------------------------------------------------------

    pub fn start_filter(&mut self) {
        if self.screen == Screen::ConversationView {
            return;
        }
        self.input_mode = InputMode::Filter;
        self.filter_query.clear();
        self.apply_filter();
    }

    pub fn cancel_filter(&mut self) {
        self.input_mode = InputMode::Normal;
        self.filter_query.clear();
        self.apply_filter();
    }

    pub fn confirm_filter(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn filter_push(&mut self, ch: char) {
        self.filter_query.push(ch);
        self.apply_filter();
    }

    pub fn filter_pop(&mut self) {
        self.filter_query.pop();
        self.apply_filter();
    }

    pub fn apply_filter(&mut self) {
        let matcher = SkimMatcherV2::default();
        match self.screen {
            Screen::ProjectList => {
                if self.filter_query.is_empty() {
                    self.displayed_projects = self.projects.clone();
                } else {
                    self.displayed_projects = self
                        .projects
                        .iter()
                        .filter(|p| {
                            matcher
                                .fuzzy_match(&p.display_path, &self.filter_query)
                                .is_some()
                        })
                        .cloned()
                        .collect();
                }
                self.selected_project = 0;
                self.project_scroll_offset = 0;
            }
            Screen::ConversationList => {
                if self.filter_query.is_empty() {
                    self.displayed_conversations = self.conversations.clone();
                } else {
                    self.displayed_conversations = self
                        .conversations
                        .iter()
                        .filter(|c| matcher.fuzzy_match(&c.name, &self.filter_query).is_some())
                        .cloned()
                        .collect();
                }
                self.selected_conversation = 0;
                self.conversation_scroll_offset = 0;
            }
            Screen::ConversationView => {}
        }
    }

    // ----------------------------------------------------------------
    // Mutations
    // ----------------------------------------------------------------

    pub fn start_rename_project(&mut self) {
        if let Some(project) = self.displayed_projects.get(self.selected_project) {
            self.input_buffer = project.display_path.clone();
            self.input_mode = InputMode::RenameProject;
        }
    }

    pub fn start_rename_conversation(&mut self) {
        if let Some(conversation) = self.displayed_conversations.get(self.selected_conversation) {
            self.input_buffer = conversation.name.clone();
            self.input_mode = InputMode::RenameConversation;
        }
    }

    pub fn start_correct_path(&mut self, launch_after: bool) {
        let project = match self.screen {
            Screen::ProjectList => self.displayed_projects.get(self.selected_project),
            _ => self.current_project.as_ref(),
        };
        if let Some(project) = project {
            self.input_buffer = project.working_path.clone();
            self.input_mode = InputMode::CorrectPath { launch_after };
        }
    }

    pub fn start_delete(&mut self) {
        if self
            .displayed_conversations
            .get(self.selected_conversation)
            .is_some()
        {
            self.input_mode = InputMode::ConfirmDelete;
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Apply the pending text input (rename / path correction).
    pub fn submit_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        let mode = self.input_mode.clone();
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();

        match mode {
            InputMode::RenameProject => {
                if input.is_empty() {
                    return;
                }
                let Some(project) = self.displayed_projects.get(self.selected_project).cloned()
                else {
                    return;
                };
                match self.scanner.rename_project(&project, &input) {
                    Ok(()) => {
                        self.refresh_after_mutation(&project);
                        self.status = Some(format!("Renamed project to \"{}\"", input));
                    }
                    Err(err) => self.status = Some(format!("Rename failed: {}", err)),
                }
            }
            InputMode::RenameConversation => {
                if input.is_empty() {
                    return;
                }
                let Some(conversation) = self
                    .displayed_conversations
                    .get(self.selected_conversation)
                    .cloned()
                else {
                    return;
                };
                let mut meta = conversation.metadata.clone();
                match meta.set_custom_name(&input) {
                    Ok(()) => {
                        if let Some(project) = self.current_project.clone() {
                            self.refresh_after_mutation(&project);
                        }
                        self.status = Some(format!("Renamed conversation to \"{}\"", input));
                    }
                    Err(err) => self.status = Some(format!("Rename failed: {}", err)),
                }
            }
            InputMode::CorrectPath { launch_after } => {
                if input.is_empty() {
                    return;
                }
                let project = match self.screen {
                    Screen::ProjectList => {
                        self.displayed_projects.get(self.selected_project).cloned()
                    }
                    _ => self.current_project.clone(),
                };
                let Some(project) = project else { return };
                match self.scanner.set_project_path(&project, &input) {
                    Ok(()) => {
                        self.refresh_after_mutation(&project);
                        self.status = Some(format!("Working directory set to {}", input));
                        if launch_after {
                            self.request_launch();
                        }
                    }
                    Err(err) => self.status = Some(format!("Path update failed: {}", err)),
                }
            }
            InputMode::Normal | InputMode::Filter | InputMode::ConfirmDelete => {}
        }
    }

    pub fn confirm_delete(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(conversation) = self
            .displayed_conversations
            .get(self.selected_conversation)
            .cloned()
        else {
            return;
        };
        match self.scanner.delete_conversation(&conversation) {
            Ok(()) => {
                if let Some(project) = self.current_project.clone() {
                    self.refresh_after_mutation(&project);
                }
                if self.screen == Screen::ConversationView {
                    self.screen = Screen::ConversationList;
                }
                self.status = Some("Conversation deleted".to_string());
            }
            Err(err) => self.status = Some(format!("Delete failed: {}", err)),
        }
    }

    /// Re-read the one project a mutation touched and patch the visible
    /// lists, mirroring the scanner's single-record refresh contract.
    fn refresh_after_mutation(&mut self, project: &ProjectInfo) {
        match self.scanner.refresh_project(project) {
            Some(fresh) => {
                if let Some(slot) = self
                    .projects
                    .iter_mut()
                    .find(|p| p.encoded_path == project.encoded_path)
                {
                    *slot = fresh.clone();
                }
                if self.current_project.is_some() {
                    self.conversations = fresh.conversations.clone();
                    self.current_project = Some(fresh);
                }
            }
            None => {
                // The project vanished (last conversation deleted).
                self.projects
                    .retain(|p| p.encoded_path != project.encoded_path);
                self.current_project = None;
                self.conversations.clear();
                self.filter_query.clear();
                if self.screen != Screen::ProjectList {
                    self.screen = Screen::ProjectList;
                }
            }
        }

        self.apply_filter();
        self.selected_project = self
            .selected_project
            .min(self.displayed_projects.len().saturating_sub(1));
        self.selected_conversation = self
            .selected_conversation
            .min(self.displayed_conversations.len().saturating_sub(1));
    }

    // ----------------------------------------------------------------
    // Launch / clipboard
    // ----------------------------------------------------------------

    /// Queue a `claude --resume` launch for the selected conversation. When
    /// the project's working directory does not exist, prompt for a corrected
    /// path first and launch after it is set.
    pub fn request_launch(&mut self) {
        let Some(project) = self.current_project.clone() else {
            return;
        };
        let Some(conversation) = self
            .displayed_conversations
            .get(self.selected_conversation)
            .cloned()
        else {
            return;
        };

        if !Path::new(&project.working_path).is_dir() {
            self.status = Some(format!(
                "Directory {} does not exist; enter the correct path",
                project.working_path
            ));
            self.start_correct_path(true);
            return;
        }

        self.pending_launch = Some(PendingLaunch {
            session_id: conversation.session_id,
            working_path: project.working_path,
        });
        self.should_quit = true;
    }

    pub fn resume_command(&self) -> Option<String> {
        self.displayed_conversations
            .get(self.selected_conversation)
            .map(|c| format!("claude --resume {}", c.session_id))
    }

    pub fn copy_resume_command(&mut self) {
        if let Some(cmd) = self.resume_command() {
            match cli_clipboard::set_contents(cmd.clone()) {
                Ok(()) => self.status = Some(format!("Copied: {}", cmd)),
                Err(_) => self.status = Some("Clipboard unavailable".to_string()),
            }
        }
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) {
    let _ = disable_raw_mode();
    let _ = execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    );
    let _ = terminal.show_cursor();
}

pub fn run() -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Restore terminal on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        default_panic(info);
    }));

    let mut app = App::new();

    let result = run_loop(&mut terminal, &mut app);

    restore_terminal(&mut terminal);
    result?;

    // The resume launch happens outside the alternate screen so the CLI owns
    // the terminal.
    if let Some(launch) = app.pending_launch.take() {
        let status = Command::new("claude")
            .arg("--resume")
            .arg(&launch.session_id)
            .current_dir(&launch.working_path)
            .status()
            .with_context(|| format!("launching claude in {}", launch.working_path))?;
        if !status.success() {
            anyhow::bail!("claude exited with {}", status);
        }
    }

    Ok(())
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| {
            app.terminal_height = frame.area().height as usize;
            ui::draw(frame, app);
        })?;

        if let Event::Key(key) = event::read()? {
            app.status = None;

            match app.input_mode.clone() {
                InputMode::ConfirmDelete => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete(),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_input(),
                    _ => {}
                },
                InputMode::Filter => match key.code {
                    KeyCode::Esc => app.cancel_filter(),
                    KeyCode::Enter => app.confirm_filter(),
                    KeyCode::Backspace => app.filter_pop(),
                    KeyCode::Down => app.navigate_down(),
                    KeyCode::Up => app.navigate_up(),
                    KeyCode::Char(c) => app.filter_push(c),
                    _ => {}
                },
                InputMode::RenameProject
                | InputMode::RenameConversation
                | InputMode::CorrectPath { .. } => match key.code {
                    KeyCode::Esc => app.cancel_input(),
                    KeyCode::Enter => app.submit_input(),
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                    }
                    KeyCode::Char(c) => app.input_buffer.push(c),
                    _ => {}
                },
                InputMode::Normal => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.go_back(),
                    KeyCode::Char('/') => app.start_filter(),
                    KeyCode::Enter => match app.screen {
                        Screen::ProjectList => app.open_selected_project(),
                        Screen::ConversationList => app.open_selected_conversation(),
                        Screen::ConversationView => {}
                    },
                    KeyCode::Char('j') | KeyCode::Down => app.navigate_down(),
                    KeyCode::Char('k') | KeyCode::Up => app.navigate_up(),
                    KeyCode::Char('d') => app.half_page_down(),
                    KeyCode::Char('u') => app.half_page_up(),
                    KeyCode::Char('g') => app.go_to_top(),
                    KeyCode::Char('G') => app.go_to_bottom(),
                    KeyCode::Char('r') => match app.screen {
                        Screen::ProjectList => app.start_rename_project(),
                        Screen::ConversationList | Screen::ConversationView => {
                            app.start_rename_conversation()
                        }
                    },
                    KeyCode::Char('p') => {
                        if app.screen == Screen::ProjectList {
                            app.start_correct_path(false);
                        }
                    }
                    KeyCode::Char('x') => {
                        if app.screen != Screen::ProjectList {
                            app.start_delete();
                        }
                    }
                    KeyCode::Char('l') => {
                        if app.screen != Screen::ProjectList {
                            app.request_launch();
                        }
                    }
                    KeyCode::Char('y') => {
                        if app.screen != Screen::ProjectList {
                            app.copy_resume_command();
                        }
                    }
                    _ => {}
                },
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_session(project_dir: &Path, id: &str, timestamp: &str, first_message: &str) {
        fs::create_dir_all(project_dir).unwrap();
        let line = format!(
            r#"{{"type":"user","timestamp":"{}","message":{{"content":"{}"}}}}"#,
            timestamp, first_message
        );
        fs::write(project_dir.join(format!("{}.jsonl", id)), line).unwrap();
    }

    fn app_with_fixture(tmp: &TempDir) -> App {
        let alpha = tmp.path().join("-home-alice-alpha");
        write_session(&alpha, "sess-a1", "2026-02-01T10:00:00Z", "Fix the login page");
        write_session(&alpha, "sess-a2", "2026-01-01T10:00:00Z", "Write some tests");
        let beta = tmp.path().join("-home-alice-beta");
        write_session(&beta, "sess-b1", "2026-03-01T10:00:00Z", "Deploy to staging");

        App::with_scanner(ProjectScanner::with_dir(tmp.path().to_path_buf()))
    }

    #[test]
    fn starts_on_project_list_sorted_newest_first() {
        let tmp = TempDir::new().unwrap();
        let app = app_with_fixture(&tmp);
        assert_eq!(app.screen, Screen::ProjectList);
        assert_eq!(app.displayed_projects.len(), 2);
        assert_eq!(app.displayed_projects[0].encoded_path, "-home-alice-beta");
    }

    #[test]
    fn open_project_shows_its_conversations() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.selected_project = 1; // alpha
        app.open_selected_project();
        assert_eq!(app.screen, Screen::ConversationList);
        assert_eq!(app.displayed_conversations.len(), 2);
        assert_eq!(app.displayed_conversations[0].session_id, "sess-a1");
        assert_eq!(app.displayed_conversations[0].name, "Fix the login page");
    }

    #[test]
    fn filter_narrows_conversations() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.selected_project = 1;
        app.open_selected_project();

        app.start_filter();
        for ch in "tests".chars() {
            app.filter_push(ch);
        }
        assert_eq!(app.displayed_conversations.len(), 1);
        assert_eq!(app.displayed_conversations[0].session_id, "sess-a2");

        app.cancel_filter();
        assert_eq!(app.displayed_conversations.len(), 2);
    }

    #[test]
    fn go_back_walks_screens_and_quits_at_root() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.open_selected_project();
        app.open_selected_conversation();
        assert_eq!(app.screen, Screen::ConversationView);
        app.go_back();
        assert_eq!(app.screen, Screen::ConversationList);
        app.go_back();
        assert_eq!(app.screen, Screen::ProjectList);
        app.go_back();
        assert!(app.should_quit);
    }

    #[test]
    fn rename_conversation_persists_and_updates_list() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.selected_project = 1;
        app.open_selected_project();

        app.start_rename_conversation();
        assert_eq!(app.input_buffer, "Fix the login page");
        app.input_buffer = "Login work".to_string();
        app.submit_input();

        assert_eq!(app.displayed_conversations[0].name, "Login work");

        // Survives a fresh scan from disk.
        let mut scanner = ProjectScanner::with_dir(tmp.path().to_path_buf());
        let projects = scanner.scan_projects();
        let alpha = projects
            .iter()
            .find(|p| p.encoded_path == "-home-alice-alpha")
            .unwrap();
        assert!(alpha.conversations.iter().any(|c| c.name == "Login work"));
    }

    #[test]
    fn rename_project_updates_display_path() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.start_rename_project();
        app.input_buffer = "Beta Service".to_string();
        app.submit_input();

        assert_eq!(app.displayed_projects[0].display_path, "Beta Service");
        assert!(app.status.as_deref().unwrap().contains("Beta Service"));
    }

    #[test]
    fn delete_flow_requires_confirmation() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.selected_project = 1;
        app.open_selected_project();

        let transcript_path = app.displayed_conversations[0].transcript_path.clone();
        app.start_delete();
        assert_eq!(app.input_mode, InputMode::ConfirmDelete);
        app.cancel_input();
        assert!(transcript_path.exists());

        app.start_delete();
        app.confirm_delete();
        assert!(!transcript_path.exists());
        assert_eq!(app.displayed_conversations.len(), 1);
    }

    #[test]
    fn deleting_last_conversation_returns_to_project_list() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        // beta has a single conversation
        app.selected_project = 0;
        app.open_selected_project();
        app.start_delete();
        app.confirm_delete();
        assert_eq!(app.screen, Screen::ProjectList);
        assert_eq!(app.displayed_projects.len(), 1);
    }

    #[test]
    fn launch_with_existing_directory_queues_and_quits() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.open_selected_project();

        // Point the working path at a directory that actually exists.
        let project = app.current_project.clone().unwrap();
        app.scanner
            .set_project_path(&project, &tmp.path().to_string_lossy())
            .unwrap();
        app.refresh_after_mutation(&project);

        app.request_launch();
        assert!(app.should_quit);
        let launch = app.pending_launch.clone().unwrap();
        assert_eq!(launch.session_id, "sess-b1");
        assert_eq!(launch.working_path, tmp.path().to_string_lossy());
    }

    #[test]
    fn launch_with_missing_directory_prompts_for_path() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.open_selected_project();

        // Decoded working path does not exist on this machine.
        app.request_launch();
        assert!(app.pending_launch.is_none());
        assert!(!app.should_quit);
        assert_eq!(
            app.input_mode,
            InputMode::CorrectPath { launch_after: true }
        );
    }

    #[test]
    fn resume_command_for_selected_conversation() {
        let tmp = TempDir::new().unwrap();
        let mut app = app_with_fixture(&tmp);
        app.open_selected_project();
        assert_eq!(
            app.resume_command().unwrap(),
            "claude --resume sess-b1".to_string()
        );
    }
}
