//! Animation playback state machine.
//!
//! One background thread plays a pattern frame by frame. The foreground
//! drives it with pause/resume/stop signals, each a single-slot handshake
//! on the shared control block: the caller posts the signal and waits on
//! the condvar until the playback thread has consumed it at its frame
//! boundary.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::animation::{AnimationConfig, Frame};
use crate::countdown::Countdown;
use crate::error::{Error, Result};
use crate::render::RenderState;
use crate::transport::Transport;

/// Playback status. The foreground may only touch the strip when `Stopped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Stop,
    Pause,
    Resume,
}

/// Outcome of waiting out a frame delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Advance,
    Stopped,
}

struct Control {
    status: Status,
    signal: Option<Signal>,
    last_error: Option<Error>,
}

struct Shared {
    control: Mutex<Control>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Control>) -> MutexGuard<'a, Control> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, Control>,
        timeout: Duration,
    ) -> MutexGuard<'a, Control> {
        match self.changed.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    /// Post a signal and block until the playback thread has taken it.
    ///
    /// Waits for any signal still in the slot first and gives up if that
    /// signal is a stop, or if the status no longer matches `expected`.
    /// A posted stop is never replaced.
    fn signal(&self, mut control: MutexGuard<'_, Control>, expected: Status, signal: Signal) {
        loop {
            match control.signal {
                Some(Signal::Stop) => return,
                Some(_) => control = self.wait(control),
                None => break,
            }
        }
        if control.status != expected {
            return;
        }
        control.signal = Some(signal);
        self.changed.notify_all();
        while control.signal == Some(signal) {
            control = self.wait(control);
        }
    }

    fn finish(&self, error: Option<Error>) {
        let mut control = self.lock();
        control.status = Status::Stopped;
        control.signal = None;
        if error.is_some() {
            control.last_error = error;
        }
        self.changed.notify_all();
    }
}

/// Marks the playback as finished when dropped, even if the thread panics.
struct Finish<'a> {
    shared: &'a Shared,
    error: Option<Error>,
}

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        self.shared.finish(self.error.take());
    }
}

pub(crate) fn lock_render<T: Transport>(
    render: &Mutex<RenderState<T>>,
) -> MutexGuard<'_, RenderState<T>> {
    render.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the playback thread and the status it shares with the foreground.
pub struct PlaybackController {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        PlaybackController {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    status: Status::Stopped,
                    signal: None,
                    last_error: None,
                }),
                changed: Condvar::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn status(&self) -> Status {
        self.shared.lock().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == Status::Running
    }

    /// Run `f` while holding the status lock, or fail with [`Error::Busy`]
    /// if a playback is active. Keeps foreground writes and playback apart.
    pub fn when_stopped<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let control = self.shared.lock();
        if control.status != Status::Stopped {
            return Err(Error::Busy);
        }
        let result = f();
        drop(control);
        result
    }

    /// Start playing `pattern` on a background thread, replacing any active
    /// playback. Returns without waiting for the playback to finish.
    ///
    /// A repeat count of zero (or an empty pattern) plays nothing and leaves
    /// the current playback alone.
    pub fn play<T>(
        &self,
        render: &Arc<Mutex<RenderState<T>>>,
        pattern: Vec<Frame>,
        config: AnimationConfig,
    ) where
        T: Transport + 'static,
    {
        if config.repeat == 0 || pattern.is_empty() {
            debug!("nothing to play (repeat {}, {} frames)", config.repeat, pattern.len());
            return;
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);

        self.stop();
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                warn!("previous playback thread panicked");
            }
        }

        {
            let mut control = self.shared.lock();
            control.status = Status::Running;
            control.signal = None;
            control.last_error = None;
        }

        let shared = Arc::clone(&self.shared);
        let render = Arc::clone(render);
        *worker = Some(thread::spawn(move || {
            run(&shared, &render, &pattern, config);
        }));
    }

    /// Pause at the current frame boundary. No-op unless running.
    pub fn pause(&self) {
        let control = self.shared.lock();
        if control.status == Status::Running {
            self.shared.signal(control, Status::Running, Signal::Pause);
        }
    }

    /// Resume a paused playback with what was left of the frame delay.
    /// No-op unless paused.
    pub fn resume(&self) {
        let control = self.shared.lock();
        if control.status == Status::Paused {
            self.shared.signal(control, Status::Paused, Signal::Resume);
        }
    }

    /// Stop the active playback and wait until it has wound down.
    ///
    /// The playback thread only sees the signal between frames, so a commit
    /// blocked on the transport delays this call.
    pub fn stop(&self) {
        let mut control = self.shared.lock();
        if control.status == Status::Stopped {
            return;
        }
        control.signal = Some(Signal::Stop);
        self.shared.changed.notify_all();
        while control.status != Status::Stopped {
            control = self.shared.wait(control);
        }
    }

    /// Block until no playback is active.
    pub fn wait(&self) {
        let mut control = self.shared.lock();
        while control.status != Status::Stopped {
            control = self.shared.wait(control);
        }
    }

    /// Error that aborted the most recent playback, if any.
    pub fn take_last_error(&self) -> Option<Error> {
        self.shared.lock().last_error.take()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
        let worker = self.worker.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                warn!("playback thread panicked");
            }
        }
    }
}

fn run<T: Transport>(
    shared: &Shared,
    render: &Mutex<RenderState<T>>,
    pattern: &[Frame],
    config: AnimationConfig,
) {
    info!(
        "playing {} frames, repeat {}, delay {:?}",
        pattern.len(),
        config.repeat,
        config.delay
    );

    let mut finish = Finish {
        shared,
        error: None,
    };
    let mut played: i64 = 0;
    let error = loop {
        if config.repeat >= 0 {
            if played == config.repeat {
                break None;
            }
            played += 1;
        }
        match play_pattern(shared, render, pattern, config.delay) {
            Ok(Boundary::Advance) => continue,
            Ok(Boundary::Stopped) => {
                debug!("playback stopped");
                break None;
            }
            Err(e) => {
                error!("playback aborted: {}", e);
                break Some(e);
            }
        }
    };

    if error.is_none() {
        info!("playback finished");
    }
    finish.error = error;
}

fn play_pattern<T: Transport>(
    shared: &Shared,
    render: &Mutex<RenderState<T>>,
    pattern: &[Frame],
    delay: Duration,
) -> Result<Boundary> {
    for frame in pattern {
        {
            let mut state = lock_render(render);
            if let Err(e) = state.render_frame(frame) {
                state.discard();
                return Err(e);
            }
        }

        if wait_frame(shared, delay) == Boundary::Stopped {
            return Ok(Boundary::Stopped);
        }
    }
    Ok(Boundary::Advance)
}

/// Wait out one frame delay, honouring pause/resume/stop signals.
/// Time spent paused does not count toward the delay.
fn wait_frame(shared: &Shared, delay: Duration) -> Boundary {
    let mut countdown = Countdown::new(delay);
    let mut control = shared.lock();
    countdown.start(Instant::now());

    loop {
        match control.signal.take() {
            Some(Signal::Stop) => return Boundary::Stopped,
            Some(Signal::Pause) if countdown.is_running() => {
                let left = countdown.pause(Instant::now());
                control.status = Status::Paused;
                debug!("paused with {:?} left in frame", left);
                shared.changed.notify_all();
            }
            Some(Signal::Resume) if !countdown.is_running() => {
                countdown.start(Instant::now());
                control.status = Status::Running;
                debug!("resumed");
                shared.changed.notify_all();
            }
            Some(stale) => {
                debug!("ignoring {:?} signal", stale);
                shared.changed.notify_all();
            }
            None => {}
        }

        if countdown.is_running() {
            let now = Instant::now();
            if countdown.is_expired(now) {
                return Boundary::Advance;
            }
            control = shared.wait_timeout(control, countdown.remaining(now));
        } else {
            control = shared.wait(control);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::DEFAULT_DELAY;
    use crate::pixel::{Color, Pixel};
    use crate::transport::testing::MockTransport;

    const RED: Pixel = Pixel::new(Color::new(255, 0, 0));
    const GREEN: Pixel = Pixel::new(Color::new(0, 255, 0));
    const BLUE: Pixel = Pixel::new(Color::new(0, 0, 255));

    fn setup(count: usize) -> (PlaybackController, Arc<Mutex<RenderState<MockTransport>>>, MockTransport) {
        let mock = MockTransport::new();
        let render = Arc::new(Mutex::new(RenderState::new(mock.clone(), count).unwrap()));
        (PlaybackController::new(), render, mock)
    }

    fn config(repeat: i64, delay_ms: u64) -> AnimationConfig {
        AnimationConfig {
            repeat,
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Spin until the playback thread has `signal` sitting in its slot.
    fn wait_for_signal(pc: &PlaybackController, signal: Signal) {
        while pc.shared.lock().signal != Some(signal) {
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Run `f` on its own thread and report on `done` when it returns.
    fn spawn_call(
        pc: &Arc<PlaybackController>,
        f: fn(&PlaybackController),
    ) -> (JoinHandle<()>, std::sync::mpsc::Receiver<()>) {
        let (done, rx) = std::sync::mpsc::channel();
        let pc = Arc::clone(pc);
        let handle = thread::spawn(move || {
            f(&pc);
            let _ = done.send(());
        });
        (handle, rx)
    }

    const RETURN_TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn test_zero_repeat_plays_nothing() {
        let (pc, render, mock) = setup(3);
        pc.play(&render, vec![vec![RED]], config(0, 10));
        assert_eq!(pc.status(), Status::Stopped);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(mock.write_count(), 0);
    }

    #[test]
    fn test_single_frame_default_delay() {
        let (pc, render, mock) = setup(3);
        let start = Instant::now();
        pc.play(
            &render,
            vec![vec![RED, GREEN, BLUE]],
            AnimationConfig {
                repeat: 1,
                delay: DEFAULT_DELAY,
            },
        );
        assert_ne!(pc.status(), Status::Stopped);

        pc.wait();
        assert!(start.elapsed() >= DEFAULT_DELAY);
        assert_eq!(pc.status(), Status::Stopped);
        assert_eq!(lock_render(&render).committed(), &[RED, GREEN, BLUE]);
        assert_eq!(mock.write_count(), 1);
        assert!(pc.take_last_error().is_none());
    }

    #[test]
    fn test_exact_repeat_count() {
        let (pc, render, mock) = setup(1);
        pc.play(&render, vec![vec![RED], vec![GREEN]], config(3, 5));
        pc.wait();
        assert_eq!(mock.write_count(), 6);
        assert_eq!(lock_render(&render).committed(), &[GREEN]);
    }

    #[test]
    fn test_infinite_until_stop() {
        let (pc, render, mock) = setup(1);
        pc.play(&render, vec![vec![RED], vec![GREEN]], config(-1, 10));
        thread::sleep(Duration::from_millis(100));
        assert!(pc.is_running());

        let start = Instant::now();
        pc.stop();
        let took = start.elapsed();
        assert!(took < Duration::from_millis(10 + 100), "stop took {:?}", took);
        assert_eq!(pc.status(), Status::Stopped);
        let writes = mock.write_count();
        assert!(writes >= 3, "only {} frames played", writes);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(mock.write_count(), writes);
    }

    #[test]
    fn test_pause_resume_preserves_frame_delay() {
        let delay = Duration::from_millis(300);
        let (pc, render, mock) = setup(1);
        pc.play(
            &render,
            vec![vec![RED], vec![GREEN]],
            AnimationConfig { repeat: 1, delay },
        );

        let mut paused = Duration::ZERO;
        for _ in 0..2 {
            thread::sleep(Duration::from_millis(60));
            pc.pause();
            let at = Instant::now();
            assert_eq!(pc.status(), Status::Paused);
            thread::sleep(Duration::from_millis(150));
            pc.resume();
            paused += at.elapsed();
            assert_eq!(pc.status(), Status::Running);
        }
        pc.wait();

        let times = mock.write_times();
        assert_eq!(times.len(), 2);
        let frame = times[1] - times[0];
        let active = frame.saturating_sub(paused);
        assert!(
            active >= delay - Duration::from_millis(20) && active < delay + Duration::from_millis(150),
            "frame took {:?} with {:?} paused",
            frame,
            paused
        );
    }

    #[test]
    fn test_pause_and_resume_are_noops_when_ineligible() {
        let (pc, render, _) = setup(1);
        pc.pause();
        pc.resume();
        pc.stop();
        assert_eq!(pc.status(), Status::Stopped);

        pc.play(&render, vec![vec![RED]], config(-1, 20));
        pc.resume();
        assert_eq!(pc.status(), Status::Running);
        pc.pause();
        pc.pause();
        assert_eq!(pc.status(), Status::Paused);
        pc.stop();
    }

    #[test]
    fn test_stop_while_paused() {
        let (pc, render, mock) = setup(1);
        pc.play(&render, vec![vec![RED], vec![GREEN]], config(-1, 20));
        pc.pause();
        let writes = mock.write_count();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(mock.write_count(), writes);

        pc.stop();
        assert_eq!(pc.status(), Status::Stopped);
    }

    #[test]
    fn test_transport_failure_stops_playback() {
        let (pc, render, mock) = setup(1);
        pc.play(&render, vec![vec![RED], vec![GREEN]], config(-1, 30));
        thread::sleep(Duration::from_millis(15));
        mock.set_failing(true);

        pc.wait();
        assert_eq!(pc.status(), Status::Stopped);
        assert!(matches!(pc.take_last_error(), Some(Error::Transport(_))));
        assert!(pc.take_last_error().is_none());
        // the strip keeps the last frame that made it out
        let state = lock_render(&render);
        assert_eq!(state.committed(), &[RED]);
        assert_eq!(state.pending(), &[RED]);
        assert!(state.buffered().is_empty());
    }

    #[test]
    fn test_play_replaces_active_playback() {
        let (pc, render, _) = setup(1);
        pc.play(&render, vec![vec![RED]], config(-1, 10));
        thread::sleep(Duration::from_millis(30));
        pc.play(&render, vec![vec![BLUE]], config(1, 10));
        pc.wait();
        assert_eq!(lock_render(&render).committed(), &[BLUE]);
    }

    #[test]
    fn test_pause_does_not_cancel_pending_stop() {
        let (pc, render, mock) = setup(1);
        let pc = Arc::new(pc);
        pc.play(&render, vec![vec![RED], vec![GREEN]], config(-1, 20));
        mock.hold();
        mock.wait_blocked();

        let (stopper, stopped) = spawn_call(&pc, PlaybackController::stop);
        wait_for_signal(&pc, Signal::Stop);
        let (pauser, paused) = spawn_call(&pc, PlaybackController::pause);
        assert!(paused.recv_timeout(RETURN_TIMEOUT).is_ok());
        assert_eq!(pc.shared.lock().signal, Some(Signal::Stop));

        mock.release();
        assert!(stopped.recv_timeout(RETURN_TIMEOUT).is_ok(), "stop never returned");
        assert_eq!(pc.status(), Status::Stopped);
        stopper.join().unwrap();
        pauser.join().unwrap();
    }

    #[test]
    fn test_stop_wins_over_pending_pause() {
        let (pc, render, mock) = setup(1);
        let pc = Arc::new(pc);
        pc.play(&render, vec![vec![RED], vec![GREEN]], config(-1, 20));
        mock.hold();
        mock.wait_blocked();

        let (pauser, paused) = spawn_call(&pc, PlaybackController::pause);
        wait_for_signal(&pc, Signal::Pause);
        let (stopper, stopped) = spawn_call(&pc, PlaybackController::stop);
        wait_for_signal(&pc, Signal::Stop);

        mock.release();
        assert!(stopped.recv_timeout(RETURN_TIMEOUT).is_ok(), "stop never returned");
        assert!(paused.recv_timeout(RETURN_TIMEOUT).is_ok(), "pause never returned");
        assert_eq!(pc.status(), Status::Stopped);
        stopper.join().unwrap();
        pauser.join().unwrap();
    }

    #[test]
    fn test_stop_races_resume_while_paused() {
        for _ in 0..20 {
            let (pc, render, _) = setup(1);
            let pc = Arc::new(pc);
            pc.play(&render, vec![vec![RED], vec![GREEN]], config(-1, 5));
            pc.pause();
            assert_eq!(pc.status(), Status::Paused);

            let (resumer, resumed) = spawn_call(&pc, PlaybackController::resume);
            let (stopper, stopped) = spawn_call(&pc, PlaybackController::stop);
            assert!(stopped.recv_timeout(RETURN_TIMEOUT).is_ok(), "stop never returned");
            assert!(resumed.recv_timeout(RETURN_TIMEOUT).is_ok(), "resume never returned");
            assert_eq!(pc.status(), Status::Stopped);
            resumer.join().unwrap();
            stopper.join().unwrap();
        }
    }

    #[test]
    fn test_concurrent_pauses_both_return() {
        let (pc, render, mock) = setup(1);
        let pc = Arc::new(pc);
        pc.play(&render, vec![vec![RED], vec![GREEN]], config(-1, 20));
        mock.hold();
        mock.wait_blocked();

        let (first, first_done) = spawn_call(&pc, PlaybackController::pause);
        wait_for_signal(&pc, Signal::Pause);
        let (second, second_done) = spawn_call(&pc, PlaybackController::pause);

        mock.release();
        assert!(first_done.recv_timeout(RETURN_TIMEOUT).is_ok());
        assert!(second_done.recv_timeout(RETURN_TIMEOUT).is_ok());
        assert_eq!(pc.status(), Status::Paused);
        first.join().unwrap();
        second.join().unwrap();

        pc.stop();
        assert_eq!(pc.status(), Status::Stopped);
    }

    #[test]
    fn test_panicking_transport_ends_playback() {
        let (pc, render, mock) = setup(1);
        pc.play(&render, vec![vec![RED], vec![GREEN]], config(-1, 10));
        mock.set_panicking(true);

        pc.wait();
        assert_eq!(pc.status(), Status::Stopped);
        assert!(pc.take_last_error().is_none());
        // join reports the panic instead of propagating it
        drop(pc);
    }

    #[test]
    fn test_when_stopped_rejects_while_active() {
        let (pc, render, _) = setup(1);
        assert_eq!(pc.when_stopped(|| Ok(7)).unwrap(), 7);

        pc.play(&render, vec![vec![RED]], config(-1, 20));
        assert!(matches!(pc.when_stopped(|| Ok(())), Err(Error::Busy)));
        pc.pause();
        assert!(matches!(pc.when_stopped(|| Ok(())), Err(Error::Busy)));
        pc.stop();
        assert!(pc.when_stopped(|| Ok(())).is_ok());
    }
}
