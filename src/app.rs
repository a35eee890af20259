use eframe::egui;
use std::time::Duration;

use crate::navigation::NavigationState;
use crate::retriever::{Clipboard, Notifier, RetrievalOutcome, SecretCommand, SecretRetriever};
use crate::store::Entry;
use crate::ui_model::{entry_kind, entry_label, header_text, match_positions, status_text};

struct ContextClipboard<'a>(&'a egui::Context);

impl Clipboard for ContextClipboard<'_> {
    fn place_on_clipboard(&mut self, secret: &str) {
        self.0.output_mut(|o| o.copied_text = secret.to_string());
    }
}

#[derive(Debug, Default)]
struct NoticeBoard {
    latest: Option<String>,
}

impl Notifier for NoticeBoard {
    fn notify_user(&mut self, _title: &str, message: &str) {
        self.latest = Some(message.to_string());
    }
}

pub struct PassTrayApp {
    navigation: NavigationState,
    retriever: SecretRetriever,
    query: String,
    entries: Vec<Entry>,
    current_row: Option<usize>,
    notices: NoticeBoard,
    notice: String,
    status_line: String,
    scroll_to_current: bool,
    focus_query_requested: bool,
}

impl PassTrayApp {
    pub fn new(navigation: NavigationState, command: SecretCommand, query: String) -> Self {
        let retriever = SecretRetriever::new(command, navigation.store().root());
        let mut app = Self {
            navigation,
            retriever,
            query,
            entries: Vec::new(),
            current_row: None,
            notices: NoticeBoard::default(),
            notice: String::new(),
            status_line: String::new(),
            scroll_to_current: true,
            focus_query_requested: true,
        };
        app.refresh_entries();
        app
    }

    fn refresh_entries(&mut self) {
        self.entries = self.navigation.current_entries(&self.query);
        self.current_row = if self.entries.is_empty() {
            None
        } else {
            let max_index = self.entries.len() - 1;
            Some(self.current_row.unwrap_or(0).min(max_index))
        };
        self.scroll_to_current = true;
        self.refresh_status_line();
    }

    fn refresh_status_line(&mut self) {
        self.status_line = status_text(self.entries.len(), self.retriever.in_flight(), &self.notice);
    }

    fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = notice.into();
        self.refresh_status_line();
    }

    fn move_row(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let row = self.current_row.unwrap_or(0) as isize;
        let next = (row + delta).clamp(0, self.entries.len() as isize - 1) as usize;
        self.current_row = Some(next);
        self.scroll_to_current = true;
    }

    fn enter_new_location(&mut self) {
        self.query.clear();
        self.current_row = None;
        self.focus_query_requested = true;
        self.refresh_entries();
    }

    fn navigate_up(&mut self) {
        self.navigation.navigate_up();
        self.enter_new_location();
    }

    fn activate_row(&mut self, row: usize) {
        let Some(entry) = self.entries.get(row).cloned() else {
            return;
        };
        self.current_row = Some(row);

        if entry.is_dir {
            match self.navigation.navigate_into(&entry.name) {
                Ok(()) => {
                    self.notice.clear();
                    self.enter_new_location();
                }
                Err(err) => {
                    // The listing is stale; show what is on disk now.
                    self.refresh_entries();
                    self.set_notice(format!("Not a valid directory: {err}"));
                }
            }
            return;
        }

        match self.retriever.retrieve(self.navigation.current(), &entry) {
            Ok(_) => self.set_notice(format!("Retrieving {}...", entry_label(&entry))),
            Err(err) => self.set_notice(format!("Retrieval failed: {err}")),
        }
        self.focus_query_requested = true;
    }

    fn activate_current(&mut self) {
        if let Some(row) = self.current_row {
            self.activate_row(row);
        }
    }

    fn clear_query(&mut self) {
        self.query.clear();
        self.focus_query_requested = true;
        self.refresh_entries();
    }

    fn poll_retrievals(&mut self, clipboard: &mut dyn Clipboard) -> Vec<RetrievalOutcome> {
        let outcomes = self.retriever.poll(clipboard, &mut self.notices);
        if outcomes.is_empty() {
            return outcomes;
        }
        match self.notices.latest.take() {
            Some(message) => self.set_notice(message),
            None => self.refresh_status_line(),
        }
        outcomes
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowDown))
            || ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::N))
        {
            self.move_row(1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::ArrowUp))
            || ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::P))
        {
            self.move_row(-1);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
            self.activate_current();
        }
        // Runs before the query field sees this frame's input, so a
        // Backspace that empties the query does not also go up.
        if self.query.is_empty() && ctx.input(|i| i.key_pressed(egui::Key::Backspace)) {
            self.navigate_up();
        }
        if ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Escape)) {
            self.clear_query();
        }
        let ctrl_mod = egui::Modifiers {
            ctrl: true,
            ..Default::default()
        };
        if ctx.input_mut(|i| i.consume_key(ctrl_mod, egui::Key::R)) {
            self.refresh_entries();
        }
    }

    fn entry_job(&self, entry: &Entry, is_current: bool) -> egui::text::LayoutJob {
        let label = entry_label(entry);
        let positions = match_positions(&label, &self.query);

        let mut job = egui::text::LayoutJob::default();
        job.append(
            if is_current { "▶ " } else { "· " },
            0.0,
            egui::TextFormat {
                color: if is_current {
                    egui::Color32::LIGHT_BLUE
                } else {
                    egui::Color32::GRAY
                },
                ..Default::default()
            },
        );
        job.append(
            entry_kind(entry),
            0.0,
            egui::TextFormat {
                color: if entry.is_dir {
                    egui::Color32::from_rgb(52, 211, 153)
                } else {
                    egui::Color32::from_rgb(96, 165, 250)
                },
                ..Default::default()
            },
        );
        job.append(" ", 0.0, egui::TextFormat::default());
        for (idx, ch) in label.chars().enumerate() {
            let color = if positions.contains(&idx) {
                egui::Color32::from_rgb(245, 158, 11)
            } else {
                egui::Color32::from_rgb(229, 231, 235)
            };
            job.append(
                &ch.to_string(),
                0.0,
                egui::TextFormat {
                    color,
                    ..Default::default()
                },
            );
        }
        job
    }
}

impl eframe::App for PassTrayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut clipboard = ContextClipboard(ctx);
        self.poll_retrievals(&mut clipboard);
        self.handle_shortcuts(ctx);
        if self.retriever.in_flight() > 0 {
            ctx.request_repaint_after(Duration::from_millis(16));
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let can_go_up = !self.navigation.current().is_root();
                if ui
                    .add_enabled(can_go_up, egui::Button::new("Up"))
                    .clicked()
                {
                    self.navigate_up();
                }
                ui.label(header_text(self.navigation.current()));
            });
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            let query_id = ui.make_persistent_id("query-input");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.query)
                    .id(query_id)
                    .desired_width(f32::INFINITY)
                    .hint_text("Search passwords..."),
            );
            if self.focus_query_requested {
                response.request_focus();
                self.focus_query_requested = false;
            }
            if response.changed() {
                self.current_row = None;
                self.refresh_entries();
            }
            ui.add(egui::Label::new(&self.status_line).truncate());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let mut did_scroll_to_current = false;
            let mut clicked_row: Option<usize> = None;
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for (i, entry) in self.entries.iter().enumerate() {
                        let is_current = self.current_row == Some(i);
                        let job = self.entry_job(entry, is_current);
                        let response = ui.add(
                            egui::Label::new(job)
                                .selectable(false)
                                .sense(egui::Sense::click()),
                        );
                        if self.scroll_to_current && is_current && !did_scroll_to_current {
                            response.scroll_to_me(Some(egui::Align::Center));
                            did_scroll_to_current = true;
                        }
                        if response.clicked() {
                            clicked_row = Some(i);
                        }
                    }
                    if self.entries.is_empty() {
                        ui.label("No matching entries");
                    }
                });
            if did_scroll_to_current {
                self.scroll_to_current = false;
            }
            if let Some(row) = clicked_row {
                self.activate_row(row);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PasswordStore;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Instant, SystemTime, UNIX_EPOCH};

    fn test_root(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("passtray-app-{name}-{nonce}"))
    }

    #[derive(Default)]
    struct RecordingClipboard(Vec<String>);

    impl Clipboard for RecordingClipboard {
        fn place_on_clipboard(&mut self, secret: &str) {
            self.0.push(secret.to_string());
        }
    }

    fn sample_app(name: &str, command: SecretCommand) -> (PathBuf, PassTrayApp) {
        let root = test_root(name);
        fs::create_dir_all(root.join("Email")).expect("create Email");
        fs::write(root.join("Email/github.gpg"), "x").expect("write github");
        fs::write(root.join("bank.gpg"), "x").expect("write bank");
        let store = PasswordStore::open(&root).expect("open store");
        let app = PassTrayApp::new(NavigationState::new(store), command, String::new());
        (root, app)
    }

    #[test]
    fn opens_at_root_with_first_row_selected() {
        let (root, app) = sample_app("initial", SecretCommand::default());
        assert_eq!(app.entries, vec![Entry::dir("Email"), Entry::file("bank.gpg")]);
        assert_eq!(app.current_row, Some(0));
        assert!(app.status_line.starts_with("Entries: 2"));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn activating_directory_enters_it_and_clears_query() {
        let (root, mut app) = sample_app("enter", SecretCommand::default());
        app.query = "email".to_string();
        app.refresh_entries();
        assert_eq!(app.entries, vec![Entry::dir("Email")]);

        app.activate_row(0);
        assert_eq!(app.navigation.current().as_str(), "/Email/");
        assert!(app.query.is_empty());
        assert_eq!(app.entries, vec![Entry::file("github.gpg")]);

        app.navigate_up();
        assert!(app.navigation.current().is_root());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn activating_removed_directory_keeps_location() {
        let (root, mut app) = sample_app("stale", SecretCommand::default());
        fs::remove_dir_all(root.join("Email")).expect("remove Email");

        app.activate_row(0);
        assert!(app.navigation.current().is_root());
        assert!(app.notice.contains("Not a valid directory"));
        assert_eq!(app.entries, vec![Entry::file("bank.gpg")]);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn move_row_is_clamped() {
        let (root, mut app) = sample_app("move", SecretCommand::default());
        app.move_row(5);
        assert_eq!(app.current_row, Some(1));
        app.move_row(-5);
        assert_eq!(app.current_row, Some(0));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn failed_retrieval_reports_route_in_status() {
        let missing = test_root("no-such-pass");
        let (root, mut app) = sample_app("retrieve", SecretCommand::new(missing));
        let mut clipboard = RecordingClipboard::default();

        app.activate_row(1);
        assert!(app.notice.contains("Retrieving bank"));

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut outcomes = Vec::new();
        while outcomes.is_empty() && Instant::now() < deadline {
            outcomes = app.poll_retrievals(&mut clipboard);
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(matches!(
            outcomes.as_slice(),
            [RetrievalOutcome::Failed { .. }]
        ));
        assert!(clipboard.0.is_empty());
        assert_eq!(app.notice, "Failed to copy password for \"bank\".");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn clear_query_restores_full_listing() {
        let (root, mut app) = sample_app("clear", SecretCommand::default());
        app.query = "bank".to_string();
        app.refresh_entries();
        assert_eq!(app.entries, vec![Entry::file("bank.gpg")]);

        app.clear_query();
        assert_eq!(app.entries.len(), 2);
        assert!(app.focus_query_requested);
        let _ = fs::remove_dir_all(&root);
    }
}
