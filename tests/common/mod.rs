#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use http::Method;
use strip::logging::Logger;
use strip::server::{Request, Response};
use strip::Service;
use tracing::Level;

/// Ordered record of what handlers did during a request.
#[derive(Default)]
pub struct Trail(Mutex<Vec<String>>);

impl Trail {
    pub fn push(&self, step: impl Into<String>) {
        self.0.lock().unwrap().push(step.into());
    }

    pub fn steps(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Logger that keeps every line for assertions.
#[derive(Default)]
pub struct CaptureLogger(Mutex<Vec<(Level, String)>>);

impl CaptureLogger {
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.0.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(level, _)| *level == Level::ERROR)
            .map(|(_, line)| line)
            .collect()
    }
}

impl Logger for CaptureLogger {
    fn log(&self, level: Level, message: &str) {
        self.0.lock().unwrap().push((level, message.to_owned()));
    }
}

pub fn send(service: &Service, method: Method, uri: &str) -> Response {
    service.handle(Request::new(method, uri))
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
