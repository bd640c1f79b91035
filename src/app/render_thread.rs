//! Background render thread for non-blocking UI rendering.
//!
//! The render thread owns the Terminal and draws view snapshots sent from
//! the input loop, the refresh loop and the resize task. Pending snapshots
//! are coalesced so only the newest one is drawn.

use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use super::state::ViewSnapshot;

/// Command sent to the render thread.
pub enum RenderCommand {
    /// Render this state snapshot
    Render(Box<ViewSnapshot>),
    /// Shutdown the render thread
    Shutdown,
}

/// Cloneable handle for requesting redraws.
#[derive(Clone)]
pub struct Redrawer {
    tx: Sender<RenderCommand>,
}

impl Redrawer {
    pub fn new(tx: Sender<RenderCommand>) -> Self {
        Self { tx }
    }

    /// Queue a snapshot for drawing (non-blocking).
    pub fn request(&self, snapshot: ViewSnapshot) {
        if self
            .tx
            .send(RenderCommand::Render(Box::new(snapshot)))
            .is_err()
        {
            tracing::trace!("Render thread gone, dropping frame");
        }
    }
}

/// Handle to the background render thread.
pub struct RenderThread {
    cmd_tx: Sender<RenderCommand>,
    handle: Option<JoinHandle<()>>,
}

type Term = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        disable_raw_mode().ok();
        return Err(e);
    }

    match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(t) => Ok(t),
        Err(e) => {
            disable_raw_mode().ok();
            execute!(io::stdout(), LeaveAlternateScreen).ok();
            Err(e)
        }
    }
}

/// Block for the next command and skip over any older queued frames.
/// A queued shutdown always wins.
fn next_command(rx: &Receiver<RenderCommand>) -> Option<RenderCommand> {
    let mut latest = rx.recv().ok()?;
    while let Ok(cmd) = rx.try_recv() {
        if matches!(latest, RenderCommand::Shutdown) {
            break;
        }
        latest = cmd;
    }
    Some(latest)
}

impl RenderThread {
    /// Set up the terminal and spawn the render thread.
    ///
    /// Terminal setup happens on the calling thread so failures surface as
    /// a startup error. `hints` is shown on the status line.
    pub fn spawn(hints: String) -> io::Result<(Self, Redrawer)> {
        let mut terminal = setup_terminal()?;
        let (cmd_tx, cmd_rx) = mpsc::channel::<RenderCommand>();

        let handle = thread::spawn(move || {
            while let Some(cmd) = next_command(&cmd_rx) {
                match cmd {
                    RenderCommand::Render(snapshot) => {
                        let now = chrono::Local::now();
                        if let Err(e) =
                            terminal.draw(|f| crate::ui::render(f, &snapshot, &hints, now))
                        {
                            tracing::error!("Render error: {}", e);
                        }
                    }
                    RenderCommand::Shutdown => break,
                }
            }

            // Cleanup terminal
            disable_raw_mode().ok();
            execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
            terminal.show_cursor().ok();
        });

        let redrawer = Redrawer::new(cmd_tx.clone());
        Ok((
            Self {
                cmd_tx,
                handle: Some(handle),
            },
            redrawer,
        ))
    }

    /// Shutdown the render thread and wait for it to restore the terminal.
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(RenderCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}
