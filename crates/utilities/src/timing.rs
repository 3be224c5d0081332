use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use log::debug;

/// Keeps track of the wall-clock time of several named phases.
#[derive(Default)]
pub struct Timing {
    results: Rc<RefCell<Vec<(String, f32)>>>,
}

/// A running timer for a single phase, registered in its [Timing] once finished.
pub struct Timer {
    name: String,
    start: Instant,
    results: Rc<RefCell<Vec<(String, f32)>>>,
    registered: bool,
}

impl Timing {
    /// Creates a new timing object to track timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new timer with the given name.
    pub fn start(&mut self, name: &str) -> Timer {
        Timer {
            name: name.to_string(),
            start: Instant::now(),
            results: self.results.clone(),
            registered: false,
        }
    }

    /// Returns the measured phases in the order in which they were finished.
    pub fn results(&self) -> Vec<(String, f32)> {
        self.results.borrow().clone()
    }

    /// Prints all the finished timers to standard error.
    pub fn print(&self) {
        for (name, time) in self.results.borrow().iter() {
            eprintln!("Time {}: {:.3}s", name, time);
        }
    }
}

impl Timer {
    /// Stops the timer and registers the elapsed time.
    pub fn finish(&mut self) {
        let time = self.start.elapsed().as_secs_f64();
        debug!("Time {}: {:.3}s", self.name, time);

        self.results.borrow_mut().push((self.name.clone(), time as f32));
        self.registered = true;
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.registered {
            self.finish();
        }
    }
}
