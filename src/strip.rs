use std::sync::{Arc, Mutex};

use log::info;

use crate::animation::{Animation, AnimationConfig};
use crate::error::{Error, Result};
use crate::pixel::{Color, Pixel};
use crate::playback::{lock_render, PlaybackController, Status};
use crate::render::RenderState;
use crate::transport::{SerialTransport, Transport};

/// A BlinkyTape LED strip.
///
/// Every write is buffered until [`render`](Self::render). While an
/// animation is playing or paused the strip belongs to the playback thread
/// and all mutating calls fail with [`Error::Busy`](crate::Error::Busy).
pub struct BlinkyTape<T: Transport + 'static = SerialTransport> {
    render: Arc<Mutex<RenderState<T>>>,
    playback: PlaybackController,
    pixel_count: usize,
}

impl BlinkyTape<SerialTransport> {
    /// Open the strip on a serial port.
    pub fn open(port: &str, pixel_count: usize) -> Result<Self> {
        let transport = SerialTransport::open(port)?;
        info!("strip on {}", transport.name());
        Self::with_transport(transport, pixel_count)
    }
}

impl<T: Transport + 'static> BlinkyTape<T> {
    /// Build a strip over an already opened transport. All pixels start black.
    ///
    /// A control byte is sent right away to stop any pattern the strip is
    /// playing on its own.
    pub fn with_transport(transport: T, pixel_count: usize) -> Result<Self> {
        let mut render = RenderState::new(transport, pixel_count)?;
        render.halt()?;

        info!("strip ready with {} pixels", pixel_count);

        Ok(BlinkyTape {
            render: Arc::new(Mutex::new(render)),
            playback: PlaybackController::new(),
            pixel_count,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Pixels last sent to the strip.
    pub fn committed(&self) -> Vec<Pixel> {
        lock_render(&self.render).committed().to_vec()
    }

    /// Pixels waiting for the next render.
    pub fn pending(&self) -> Vec<Pixel> {
        lock_render(&self.render).pending().to_vec()
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut RenderState<T>) -> Result<R>) -> Result<R> {
        self.playback.when_stopped(|| {
            let mut state = lock_render(&self.render);
            f(&mut *state)
        })
    }

    /// Set every pixel to the same color.
    pub fn set_color(&self, color: Color) -> Result<()> {
        self.mutate(|state| {
            state.clear();
            let pixel = Pixel::new(color);
            for _ in 0..state.pixel_count() {
                state.write_next(pixel)?;
            }
            Ok(())
        })
    }

    /// Write pixels sequentially from the current position. Pixels beyond
    /// the strip length are ignored.
    pub fn set_pixels(&self, pixels: &[Pixel]) -> Result<()> {
        self.mutate(|state| state.write_all(pixels))
    }

    /// Write one pixel at the current position. O(1).
    pub fn set_next_pixel(&self, pixel: Pixel) -> Result<()> {
        self.mutate(|state| state.write_next(pixel))
    }

    /// Write one pixel at `position`. Rewrites the whole buffer, O(pixel count).
    pub fn set_pixel_at(&self, pixel: Pixel, position: usize) -> Result<()> {
        self.mutate(|state| state.write_at(pixel, position))
    }

    /// Send the accumulated pixels to the strip.
    pub fn render(&self) -> Result<()> {
        self.mutate(|state| state.commit())
    }

    /// Discard every change made since the last render.
    pub fn reset(&self) -> Result<()> {
        self.mutate(|state| {
            state.discard();
            Ok(())
        })
    }

    /// Set all pixels to black and render.
    pub fn switch_off(&self) -> Result<()> {
        self.set_color(Color::BLACK)?;
        self.render()
    }

    /// Play an animation on a background thread, replacing any active one.
    ///
    /// `config` overrides the animation's repeat count and speed. A playback
    /// error stops the animation and is kept for [`take_last_error`](Self::take_last_error).
    pub fn play(&self, animation: &Animation, config: Option<AnimationConfig>) {
        let config = animation.resolve(config);
        info!("play \"{}\"", animation.name);
        self.playback
            .play(&self.render, animation.pattern.clone(), config);
    }

    pub fn pause(&self) {
        self.playback.pause();
    }

    pub fn resume(&self) {
        self.playback.resume();
    }

    pub fn stop(&self) {
        self.playback.stop();
    }

    /// Block until the current animation, if any, is over.
    pub fn wait(&self) {
        self.playback.wait();
    }

    pub fn status(&self) -> Status {
        self.playback.status()
    }

    pub fn is_running(&self) -> bool {
        self.playback.is_running()
    }

    pub fn take_last_error(&self) -> Option<Error> {
        self.playback.take_last_error()
    }

    /// Stop any playback and release the transport.
    pub fn close(self) {
        info!("closing strip");
        drop(self);
    }
}
