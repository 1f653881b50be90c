use crate::{lidar::LidarSimulator, publisher::Publisher, scene::RayCaster};
use nalgebra::Point3;
use std::{
    sync::atomic::{AtomicBool, Ordering::*},
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};

pub struct Looper<'a, C: ?Sized, P> {
    pub lidar: LidarSimulator,
    pub position: Point3<f32>,
    pub caster: &'a C,
    pub publisher: P,
    pub topic: &'a str,
    pub period: Duration,
    pub max_frames: Option<usize>,
}

impl<'a, C, P> Looper<'a, C, P>
where
    C: RayCaster + ?Sized,
    P: Publisher,
{
    /// Run one measurement cycle and hand the message to the publisher.
    pub fn tick(&mut self) -> usize {
        let cloud = self.lidar.measure(&self.position, self.caster);
        let n_points = cloud.width as usize;

        match cloud.to_bytes() {
            Ok(payload) => self.publisher.publish(self.topic, payload),
            Err(err) => warn!("Dropped frame: {err:#}"),
        }
        n_points
    }

    /// Tick at a fixed period until the termination signal is set or the frame
    /// limit is reached. Returns the number of completed cycles.
    ///
    /// A cycle that overruns its period delays the next one instead of
    /// overlapping it.
    pub fn run(&mut self, is_terminated: &AtomicBool) -> usize {
        let mut since = Instant::now();
        let mut deadline = Instant::now();
        let mut n_frames = 0;

        loop {
            // Check termination signal
            if is_terminated.load(SeqCst) {
                warn!("User interrupted");
                break;
            }

            if self.max_frames.is_some_and(|max| n_frames >= max) {
                info!("Reached the limit of {n_frames} frames");
                break;
            }

            // Wait for the next tick
            let now = Instant::now();
            if now < deadline {
                thread::sleep(deadline - now);
            }
            deadline = deadline.max(now) + self.period;

            let n_points = self.tick();
            n_frames += 1;
            debug!("Published frame {n_frames} with {n_points} points");

            // Print # of published frames every 10 secs
            if since.elapsed() >= Duration::from_secs(10) {
                info!("Published {n_frames} frames");
                since = Instant::now();
            }
        }

        n_frames
    }
}
