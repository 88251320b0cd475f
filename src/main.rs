mod export;
mod logging;
mod pump;
mod stopwatch;
mod ui;

use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use num_traits::{FromPrimitive, ToPrimitive};
use stopwatch_core::{Clock, MonotonicClock};

use crate::export::{export_laps, DEFAULT_EXPORT_FILE};
use crate::logging::{init_logging, LoggingConfig};
use crate::pump::{FrameScheduler, PumpScheduler, DEFAULT_FRAME_MS};
use crate::stopwatch::StopwatchState;
use crate::ui::{RenderSink, TerminalGuard, TerminalSink, View};

const KEY_ENTER: char = '\r';
const KEY_ESC: char = '\u{001b}';

#[derive(Debug, PartialEq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum AppOp {
    Redraw = 0,
    Rawkeys,
    Pump,
    Quit,
}

/// Scalar message passed between threads: an opcode and one argument.
#[derive(Clone, Copy, Debug)]
pub struct Envelope {
    pub id: usize,
    pub arg: usize,
}

impl Envelope {
    fn op(op: AppOp, arg: usize) -> Self {
        Self { id: op.to_usize().unwrap_or_default(), arg }
    }
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Where exported laps are written.
    #[arg(long, short, default_value = DEFAULT_EXPORT_FILE)]
    output: PathBuf,

    /// Frame interval of the display refresh while running.
    #[arg(long, default_value_t = DEFAULT_FRAME_MS)]
    frame_ms: u64,

    /// Log filter in env_logger syntax. Falls back to RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,

    /// Send log records to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Control {
    Continue,
    Quit,
}

struct StopwatchApp<C: Clock, S: FrameScheduler, R: RenderSink> {
    clock: C,
    scheduler: S,
    sink: R,
    stopwatch: StopwatchState,
    frame_ms: u64,
    export_path: PathBuf,
    status: Option<String>,
}

impl<C: Clock, S: FrameScheduler, R: RenderSink> StopwatchApp<C, S, R> {
    fn new(clock: C, scheduler: S, sink: R, frame_ms: u64, export_path: PathBuf) -> Self {
        Self {
            clock,
            scheduler,
            sink,
            stopwatch: StopwatchState::new(),
            frame_ms: if frame_ms == 0 { DEFAULT_FRAME_MS } else { frame_ms },
            export_path,
            status: None,
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn redraw(&mut self) {
        let view = View::new(&self.stopwatch, self.now_ms(), self.status.as_deref());
        if let Err(e) = self.sink.render(&view) {
            log::error!("render failed: {}", e);
        }
    }

    fn start(&mut self) {
        let now = self.now_ms();
        if self.stopwatch.start(now) {
            log::debug!("started");
            self.scheduler.schedule(self.frame_ms);
        }
        self.redraw();
    }

    fn stop(&mut self) {
        let now = self.now_ms();
        if self.stopwatch.stop(now) {
            self.scheduler.cancel();
            log::debug!("stopped at {} ms", self.stopwatch.elapsed_ms(now));
        }
        self.redraw();
    }

    fn toggle(&mut self) {
        if self.stopwatch.is_running() {
            self.stop();
        } else {
            self.start();
        }
    }

    fn lap(&mut self) {
        let now = self.now_ms();
        if let Some(lap) = self.stopwatch.record_lap(now) {
            log::debug!("lap {}: {} ms ({} ms total)", lap.index, lap.lap_ms, lap.total_ms);
            self.redraw();
        }
    }

    fn reset(&mut self) {
        self.scheduler.cancel();
        self.stopwatch.reset();
        self.status = None;
        log::debug!("reset");
        self.redraw();
    }

    fn clear_laps(&mut self) {
        if !self.stopwatch.laps.is_empty() {
            self.stopwatch.clear_laps();
            self.redraw();
        }
    }

    fn export(&mut self) {
        match export_laps(&self.export_path, &self.stopwatch.laps) {
            Ok(Some(count)) => {
                self.status = Some(format!("Exported {} laps to {}", count, self.export_path.display()));
            }
            Ok(None) => return,
            Err(e) => {
                log::error!("export to {} failed: {}", self.export_path.display(), e);
                self.status = Some(format!("Export failed: {}", e));
            }
        }
        self.redraw();
    }

    fn handle_pump(&mut self) {
        // Ticks already in flight when the loop was cancelled are dropped.
        if self.scheduler.is_scheduled() && self.stopwatch.is_running() {
            self.redraw();
        }
    }

    fn handle_key(&mut self, key: char) -> Control {
        match key.to_ascii_lowercase() {
            ' ' | KEY_ENTER | '\n' => self.toggle(),
            'l' => self.lap(),
            'r' => self.reset(),
            'c' => self.clear_laps(),
            'e' => self.export(),
            'q' | KEY_ESC => return Control::Quit,
            _ => {}
        }
        Control::Continue
    }
}

fn key_to_envelope(code: KeyCode, modifiers: KeyModifiers) -> Option<Envelope> {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Some(Envelope::op(AppOp::Quit, 0));
    }
    let key = match code {
        KeyCode::Char(c) => c,
        KeyCode::Enter => KEY_ENTER,
        KeyCode::Esc => KEY_ESC,
        _ => return None,
    };
    Some(Envelope::op(AppOp::Rawkeys, key as usize))
}

fn input_thread(main_conn: Sender<Envelope>) {
    loop {
        let envelope = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                key_to_envelope(key.code, key.modifiers)
            }
            Ok(Event::Resize(_, _)) => Some(Envelope::op(AppOp::Redraw, 0)),
            Ok(_) => None,
            Err(e) => {
                log::error!("can't read terminal events: {}", e);
                Some(Envelope::op(AppOp::Quit, 0))
            }
        };
        if let Some(envelope) = envelope {
            let quit = AppOp::from_usize(envelope.id) == Some(AppOp::Quit);
            if main_conn.send(envelope).is_err() || quit {
                break;
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(LoggingConfig {
        env_filter: args.log_filter.clone(),
        log_file: args.log_file.clone(),
        ..LoggingConfig::default()
    })
    .context("can't open log file")?;
    log::info!("Stopwatch PID is {}", std::process::id());

    let _terminal = TerminalGuard::enter().context("can't set up terminal")?;

    let (main_conn, inbox) = mpsc::channel();
    let input_conn = main_conn.clone();
    std::thread::Builder::new()
        .name("input".into())
        .spawn(move || input_thread(input_conn))
        .context("can't spawn input thread")?;
    let mut app = StopwatchApp::new(
        MonotonicClock::new(),
        PumpScheduler::spawn(main_conn),
        TerminalSink::new(std::io::stdout()),
        args.frame_ms,
        args.output,
    );
    app.redraw();

    while let Ok(msg) = inbox.recv() {
        match FromPrimitive::from_usize(msg.id) {
            Some(AppOp::Redraw) => app.redraw(),
            Some(AppOp::Rawkeys) => {
                let key = char::from_u32(msg.arg as u32).unwrap_or('\u{0000}');
                if key != '\u{0000}' && app.handle_key(key) == Control::Quit {
                    break;
                }
            }
            Some(AppOp::Pump) => app.handle_pump(),
            Some(AppOp::Quit) => break,
            None => log::error!("unknown opcode: {:?}", msg),
        }
    }

    app.scheduler.cancel();
    log::info!("Stopwatch exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use stopwatch_core::ManualClock;

    use super::*;

    #[derive(Default)]
    struct FakeScheduler {
        scheduled: bool,
        schedules: usize,
        cancels: usize,
    }

    impl FrameScheduler for FakeScheduler {
        fn schedule(&mut self, _interval_ms: u64) {
            if !self.scheduled {
                self.scheduled = true;
                self.schedules += 1;
            }
        }

        fn cancel(&mut self) {
            if self.scheduled {
                self.scheduled = false;
                self.cancels += 1;
            }
        }

        fn is_scheduled(&self) -> bool {
            self.scheduled
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<View>,
    }

    impl RenderSink for RecordingSink {
        fn render(&mut self, view: &View) -> std::io::Result<()> {
            self.frames.push(view.clone());
            Ok(())
        }
    }

    type TestApp = StopwatchApp<Rc<ManualClock>, FakeScheduler, RecordingSink>;

    fn fixture() -> (Rc<ManualClock>, TestApp) {
        let clock = Rc::new(ManualClock::new(0));
        let app = StopwatchApp::new(
            Rc::clone(&clock),
            FakeScheduler::default(),
            RecordingSink::default(),
            16,
            PathBuf::from(DEFAULT_EXPORT_FILE),
        );
        (clock, app)
    }

    fn last_time(app: &TestApp) -> &str {
        &app.sink.frames.last().expect("nothing rendered").time
    }

    #[test]
    fn test_running_iff_scheduled() {
        let (clock, mut app) = fixture();
        app.handle_key(' ');
        assert!(app.stopwatch.is_running());
        assert!(app.scheduler.is_scheduled());

        clock.advance(500);
        app.handle_key(' ');
        assert!(!app.stopwatch.is_running());
        assert!(!app.scheduler.is_scheduled());

        app.handle_key(KEY_ENTER);
        assert!(app.scheduler.is_scheduled());
        app.handle_key('r');
        assert!(!app.stopwatch.is_running());
        assert!(!app.scheduler.is_scheduled());
        assert_eq!(app.scheduler.schedules, 2);
        assert_eq!(app.scheduler.cancels, 2);
    }

    #[test]
    fn test_pump_renders_current_time() {
        let (clock, mut app) = fixture();
        app.handle_key(' ');
        clock.advance(1234);
        app.handle_pump();
        assert_eq!(last_time(&app), "00:00:01.23");
        clock.advance(100);
        app.handle_pump();
        assert_eq!(last_time(&app), "00:00:01.33");
    }

    #[test]
    fn test_stop_renders_final_frame_and_drops_late_ticks() {
        let (clock, mut app) = fixture();
        app.handle_key(' ');
        clock.advance(4000);
        app.handle_key(' ');
        let frames = app.sink.frames.len();
        assert_eq!(last_time(&app), "00:00:04.00");

        clock.advance(500);
        app.handle_pump();
        assert_eq!(app.sink.frames.len(), frames);
    }

    #[test]
    fn test_start_while_running_does_not_jump() {
        let (clock, mut app) = fixture();
        app.start();
        clock.advance(700);
        app.start();
        clock.advance(300);
        assert_eq!(app.stopwatch.elapsed_ms(clock.now_ms()), 1000);
        assert_eq!(app.scheduler.schedules, 1);
    }

    #[test]
    fn test_lap_scenario_and_export_order() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, mut app) = fixture();
        app.export_path = dir.path().join(DEFAULT_EXPORT_FILE);

        app.handle_key(' ');
        clock.set(1500);
        app.handle_key('l');
        clock.set(4000);
        app.handle_key('L');
        app.handle_key(' ');
        assert_eq!(app.stopwatch.elapsed_ms(clock.now_ms()), 4000);

        app.handle_key('e');
        let csv = std::fs::read_to_string(&app.export_path).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(
            rows,
            vec![
                "Lap #,Lap Time,Total Time",
                "2,00:00:02.50,00:00:04.00",
                "1,00:00:01.50,00:00:01.50",
            ]
        );
        assert!(app.status.as_deref().unwrap_or_default().starts_with("Exported 2 laps"));
    }

    #[test]
    fn test_inapplicable_actions_are_silent() {
        let (_clock, mut app) = fixture();
        app.handle_key('l');
        app.handle_key('c');
        app.handle_key('e');
        assert!(app.sink.frames.is_empty());
        assert!(app.status.is_none());
        assert!(app.stopwatch.laps.is_empty());
    }

    #[test]
    fn test_reset_while_running_clears_laps() {
        let (clock, mut app) = fixture();
        app.handle_key(' ');
        clock.advance(800);
        app.handle_key('l');
        app.handle_key('r');

        let frame = app.sink.frames.last().unwrap();
        assert_eq!(frame.time, "00:00:00.00");
        assert!(frame.laps.is_empty());
        assert!(!frame.controls.reset);
    }

    #[test]
    fn test_quit_keys() {
        let (_clock, mut app) = fixture();
        assert_eq!(app.handle_key('x'), Control::Continue);
        assert_eq!(app.handle_key('q'), Control::Quit);
        assert_eq!(app.handle_key(KEY_ESC), Control::Quit);
    }

    #[test]
    fn test_key_mapping() {
        let quit = key_to_envelope(KeyCode::Char('c'), KeyModifiers::CONTROL).unwrap();
        assert_eq!(AppOp::from_usize(quit.id), Some(AppOp::Quit));

        let enter = key_to_envelope(KeyCode::Enter, KeyModifiers::NONE).unwrap();
        assert_eq!(AppOp::from_usize(enter.id), Some(AppOp::Rawkeys));
        assert_eq!(enter.arg, KEY_ENTER as usize);

        assert!(key_to_envelope(KeyCode::F(1), KeyModifiers::NONE).is_none());
    }

    #[test]
    fn test_zero_frame_interval_uses_default() {
        let app = StopwatchApp::new(
            ManualClock::new(0),
            FakeScheduler::default(),
            RecordingSink::default(),
            0,
            PathBuf::from(DEFAULT_EXPORT_FILE),
        );
        assert_eq!(app.frame_ms, DEFAULT_FRAME_MS);
    }
}
