use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use stopwatch_core::format_elapsed;

use crate::stopwatch::{Affordances, StopwatchState};

const EMPTY_LAPS: &str = "No laps yet.";
// Title, blank, time, blank, table header.
const HEADER_LINES: u16 = 5;
// Blank, controls, status.
const FOOTER_LINES: u16 = 3;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LapRow {
    pub index: u32,
    pub lap: String,
    pub total: String,
}

/// Everything a sink needs to draw one frame.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct View {
    pub time: String,
    pub laps: Vec<LapRow>,
    pub controls: Affordances,
    pub status: Option<String>,
}

impl View {
    pub fn new(state: &StopwatchState, now_ms: u64, status: Option<&str>) -> Self {
        Self {
            time: format_elapsed(state.elapsed_ms(now_ms)),
            laps: state
                .laps
                .iter()
                .map(|lap| LapRow {
                    index: lap.index,
                    lap: format_elapsed(lap.lap_ms),
                    total: format_elapsed(lap.total_ms),
                })
                .collect(),
            controls: state.affordances(now_ms),
            status: status.map(str::to_string),
        }
    }
}

pub trait RenderSink {
    fn render(&mut self, view: &View) -> io::Result<()>;
}

/// One-line control bar. Disabled actions are shown in brackets.
pub fn controls_line(controls: &Affordances) -> String {
    let item = |enabled: bool, label: &str| {
        if enabled { label.to_string() } else { format!("[{}]", label) }
    };
    [
        format!("space {}", controls.start_stop_label()),
        item(controls.lap, "l Lap"),
        item(controls.reset, "r Reset"),
        item(controls.clear_laps, "c Clear laps"),
        item(controls.export, "e Export CSV"),
        "q Quit".to_string(),
    ]
    .join("  ")
}

/// Draws onto a raw-mode terminal.
pub struct TerminalSink<W: Write> {
    out: W,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, row: u16, text: &str) -> io::Result<()> {
        queue!(self.out, MoveTo(0, row), Print(text), Clear(ClearType::UntilNewLine))
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn render(&mut self, view: &View) -> io::Result<()> {
        let (_, height) = terminal::size().unwrap_or((80, 24));
        let max_visible = height.saturating_sub(HEADER_LINES + FOOTER_LINES).max(1) as usize;

        queue!(self.out, MoveTo(0, 0), SetAttribute(Attribute::Bold))?;
        self.line(0, "STOPWATCH")?;
        queue!(self.out, SetAttribute(Attribute::Reset))?;
        self.line(1, "")?;
        queue!(self.out, SetAttribute(Attribute::Bold))?;
        self.line(2, &format!("  {}", view.time))?;
        queue!(self.out, SetAttribute(Attribute::Reset))?;
        self.line(3, "")?;
        self.line(4, &format!("{:>6}  {:<12}  {:<12}", "Lap #", "Lap Time", "Total Time"))?;

        let mut row = HEADER_LINES;
        if view.laps.is_empty() {
            self.line(row, &format!("  {}", EMPTY_LAPS))?;
            row += 1;
        } else {
            for lap in view.laps.iter().take(max_visible) {
                self.line(row, &format!("{:>6}  {:<12}  {:<12}", lap.index, lap.lap, lap.total))?;
                row += 1;
            }
        }

        self.line(row, "")?;
        self.line(row + 1, &controls_line(&view.controls))?;
        self.line(row + 2, view.status.as_deref().unwrap_or(""))?;
        queue!(self.out, MoveTo(0, row + 3), Clear(ClearType::FromCursorDown))?;
        self.out.flush()
    }
}

/// Raw mode plus alternate screen, restored on drop.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        queue!(out, EnterAlternateScreen, Hide)?;
        out.flush()?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        queue!(out, Show, LeaveAlternateScreen).ok();
        out.flush().ok();
        if let Err(e) = terminal::disable_raw_mode() {
            log::error!("can't restore terminal: {}", e);
        }
    }
}
