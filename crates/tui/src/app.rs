use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};

use orca_core::logger;
use orca_core::progress::{Progress, ProgressSnapshot};
use orca_core::settings::Settings;
use orca_core::types::{Command, Session};

use crate::confirm::ConfirmDialog;

pub struct App {
    pub session: Arc<Mutex<Session>>,
    pub progress: Arc<Progress>,
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub cmd_tx: mpsc::Sender<Command>,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        session: Arc<Mutex<Session>>,
        progress: Arc<Progress>,
        settings: Settings,
        settings_path: PathBuf,
        log_rx: mpsc::Receiver<String>,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            session,
            progress,
            settings,
            settings_path,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            cmd_tx,
            confirm: None,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().unwrap().is_running()
    }

    /// Progress of the current run against the compiled hit plan.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let session = self.session.lock().unwrap();
        match &session.script {
            Some(script) => self.progress.snapshot(script.hit_plan()),
            None => self.progress.snapshot(&[]),
        }
    }

    /// Re-read the macro file from disk.
    pub fn recompile(&mut self) {
        let path = self
            .session
            .lock()
            .unwrap()
            .macro_path
            .clone()
            .or_else(|| self.settings.macro_path.clone());
        let Some(path) = path else {
            logger::warn("no macro file configured");
            return;
        };
        self.settings.macro_path = Some(path.clone());
        self.cmd_tx.send(Command::Compile(path)).ok();
    }

    pub fn run_once(&mut self) {
        self.cmd_tx.send(Command::RunOnce).ok();
    }

    pub fn run_loop(&mut self) {
        self.cmd_tx.send(Command::RunLoop(self.settings.loop_times)).ok();
    }

    pub fn cancel(&mut self) {
        self.cmd_tx.send(Command::Cancel).ok();
    }

    /// Quit right away when idle, ask first while a run is active.
    pub fn request_quit(&mut self) {
        if self.is_running() {
            self.confirm = Some(ConfirmDialog::new("A macro is running. Quit?"));
        } else {
            self.quit();
        }
    }

    /// Close the dialog, quitting when `yes`.
    pub fn answer_confirm(&mut self, yes: bool) {
        if self.confirm.take().is_some() && yes {
            self.quit();
        }
    }

    pub fn quit(&mut self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            logger::error(&format!("{:#}", e));
        }
        self.cmd_tx.send(Command::Quit).ok();
        self.should_quit = true;
    }
}
