use crate::error::RetrofbResult;

/// Per-frame scheduling primitive, supplied by the environment.
///
/// `run` invokes `tick` repeatedly at the display's native refresh cadence:
/// no guaranteed fixed interval and no back-pressure. Scheduling stops when
/// `tick` returns `Ok(false)` (a pause took effect before the next
/// invocation, not mid-frame) or when it returns an error, which `run`
/// propagates unchanged.
pub trait FrameDriver {
    fn run(&mut self, tick: &mut dyn FnMut() -> RetrofbResult<bool>) -> RetrofbResult<()>;
}

/// Driver that ticks a fixed number of times with no pacing. Intended for
/// offscreen rendering and tests; windowed drivers live with the windowing
/// layer that owns the event loop.
#[derive(Clone, Copy, Debug)]
pub struct ManualDriver {
    pub frames: u64,
}

impl ManualDriver {
    pub fn new(frames: u64) -> Self {
        Self { frames }
    }
}

impl FrameDriver for ManualDriver {
    fn run(&mut self, tick: &mut dyn FnMut() -> RetrofbResult<bool>) -> RetrofbResult<()> {
        for _ in 0..self.frames {
            if !tick()? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrofbError;

    #[test]
    fn manual_driver_ticks_exactly_n_times() {
        let mut driver = ManualDriver::new(5);
        let mut count = 0u64;
        driver
            .run(&mut || {
                count += 1;
                Ok(true)
            })
            .unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn manual_driver_stops_when_tick_declines() {
        let mut driver = ManualDriver::new(100);
        let mut count = 0u64;
        driver
            .run(&mut || {
                count += 1;
                Ok(count < 3)
            })
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn manual_driver_propagates_tick_errors() {
        let mut driver = ManualDriver::new(100);
        let mut count = 0u64;
        let err = driver
            .run(&mut || {
                count += 1;
                Err(RetrofbError::validation("draw failed"))
            })
            .unwrap_err();
        assert_eq!(count, 1);
        assert!(err.to_string().contains("draw failed"));
    }
}
