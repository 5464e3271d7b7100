use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{Error, Result};

use super::{Request, Upstream};

enum Canned {
    Body(String),
    Fail(Error),
    Hang,
}

/**
    In-memory upstream serving canned bodies.

    Requests without a canned response fail as unavailable, the same way an
    unreachable endpoint would.
*/
#[derive(Default)]
pub struct FixtureUpstream {
    responses: HashMap<Request, Canned>,
    calls: Mutex<Vec<Request>>,
}

impl FixtureUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, request: Request, body: impl Into<String>) -> Self {
        self.responses.insert(request, Canned::Body(body.into()));
        self
    }

    pub fn fail(mut self, request: Request, error: Error) -> Self {
        self.responses.insert(request, Canned::Fail(error));
        self
    }

    /// Never answers, for exercising request timeouts.
    pub fn hang(mut self, request: Request) -> Self {
        self.responses.insert(request, Canned::Hang);
        self
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }
}

impl Upstream for FixtureUpstream {
    async fn fetch(&self, request: &Request) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());

        match self.responses.get(request) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Fail(error)) => Err(error.clone()),
            Some(Canned::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::UpstreamUnavailable("fixture hang elapsed".to_string()))
            }
            None => Err(Error::UpstreamUnavailable(format!(
                "no fixture for {}",
                request
            ))),
        }
    }
}
