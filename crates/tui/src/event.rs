use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::App;
use crate::ui;

const LOG_SCROLL_STEP: usize = 3;

/// Draw and dispatch input until the app asks to quit.
pub fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> anyhow::Result<()> {
    while !app.should_quit {
        app.drain_logs();
        terminal.draw(|f| ui::draw(f, app))?;

        // Short poll so results and logs from the orchestrator show up promptly.
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key.code),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => app.log.scroll_up(LOG_SCROLL_STEP),
                MouseEventKind::ScrollDown => app.log.scroll_down(LOG_SCROLL_STEP),
                _ => {}
            },
            _ => {}
        }
    }
    Ok(())
}

pub fn handle_key(app: &mut App, code: KeyCode) {
    if app.confirm.is_some() {
        handle_confirm_key(app, code);
        return;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.request_quit(),
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J') => app.select_next(),
        KeyCode::Char(' ') | KeyCode::Enter => app.run_selected(),
        KeyCode::Char('l') | KeyCode::Char('L') => app.log.visible = !app.log.visible,
        _ => {}
    }
}

fn handle_confirm_key(app: &mut App, code: KeyCode) {
    let quit = match code {
        KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
            if let Some(dialog) = app.confirm.as_mut() {
                dialog.toggle();
            }
            return;
        }
        KeyCode::Enter => app.confirm.as_ref().is_some_and(|d| d.selected),
        KeyCode::Char('y') | KeyCode::Char('Y') => true,
        KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => false,
        _ => return,
    };
    app.confirm = None;
    if quit {
        app.quit();
    }
}
