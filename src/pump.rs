use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use num_traits::{FromPrimitive, ToPrimitive};

use crate::{AppOp, Envelope};

pub const DEFAULT_FRAME_MS: u64 = 16;

/// Something that calls back into the main loop once per frame.
///
/// At most one chain is active: scheduling while scheduled does nothing.
pub trait FrameScheduler {
    fn schedule(&mut self, interval_ms: u64);
    fn cancel(&mut self);
    fn is_scheduled(&self) -> bool;
}

#[derive(Debug, num_derive::FromPrimitive, num_derive::ToPrimitive)]
enum PumpOp {
    Start = 0,
    Stop,
    Quit,
}

/// Frame scheduler backed by a pump thread that posts [`AppOp::Pump`]
/// envelopes to the main loop.
pub struct PumpScheduler {
    ctrl: Sender<Envelope>,
    running: bool,
    thread: Option<JoinHandle<()>>,
}

impl PumpScheduler {
    pub fn spawn(main_conn: Sender<Envelope>) -> Self {
        let (ctrl, ctrl_rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("pump".into())
            .spawn(move || pump_thread(ctrl_rx, main_conn))
            .map_err(|e| log::error!("can't spawn pump thread: {}", e))
            .ok();
        Self { ctrl, running: false, thread }
    }

    fn send(&self, op: PumpOp, arg: usize) {
        let id = op.to_usize().unwrap_or_default();
        if self.ctrl.send(Envelope { id, arg }).is_err() {
            log::warn!("pump thread is gone, dropped {:?}", op);
        }
    }
}

impl FrameScheduler for PumpScheduler {
    fn schedule(&mut self, interval_ms: u64) {
        if !self.running {
            self.running = true;
            self.send(PumpOp::Start, interval_ms as usize);
        }
    }

    fn cancel(&mut self) {
        if self.running {
            self.running = false;
            self.send(PumpOp::Stop, 0);
        }
    }

    fn is_scheduled(&self) -> bool {
        self.running
    }
}

impl Drop for PumpScheduler {
    fn drop(&mut self) {
        self.send(PumpOp::Quit, 0);
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}

fn pump_thread(ctrl: Receiver<Envelope>, main_conn: Sender<Envelope>) {
    let pump = Envelope { id: AppOp::Pump.to_usize().unwrap_or_default(), arg: 0 };
    let mut interval = Duration::from_millis(DEFAULT_FRAME_MS);
    let mut running = false;

    loop {
        // Block while stopped, tick on timeout while running.
        let envelope = if running {
            match ctrl.recv_timeout(interval) {
                Ok(env) => env,
                Err(RecvTimeoutError::Timeout) => {
                    if main_conn.send(pump).is_err() {
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match ctrl.recv() {
                Ok(env) => env,
                Err(_) => break,
            }
        };

        match FromPrimitive::from_usize(envelope.id) {
            Some(PumpOp::Start) => {
                let ms = if envelope.arg == 0 { DEFAULT_FRAME_MS } else { envelope.arg as u64 };
                interval = Duration::from_millis(ms);
                running = true;
            }
            Some(PumpOp::Stop) => running = false,
            Some(PumpOp::Quit) => break,
            None => log::error!("unknown pump opcode: {:?}", envelope),
        }
    }
    log::debug!("pump thread exiting");
}
