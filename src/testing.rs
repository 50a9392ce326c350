//! Test doubles for the token lifecycle

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::auth::tokens::{Clock, CredentialExchange, TokenGrant};
use crate::auth::Credentials;
use crate::error::ApiError;

pub fn grant(token: &str, expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: Some(token.to_string()),
        expires_in: Some(expires_in),
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at_millis(millis: i64) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Self::instant(millis)),
        })
    }

    pub fn set_millis(&self, millis: i64) {
        *self.now.lock().unwrap() = Self::instant(millis);
    }

    fn instant(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

enum Script {
    /// Hand out tok1, tok2, ... with a fixed lifetime.
    Issue(i64),
    /// Replay canned responses in order.
    Queue(Mutex<VecDeque<Result<TokenGrant, ApiError>>>),
}

pub struct ScriptedExchange {
    script: Script,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedExchange {
    pub fn issuing(expires_in: i64) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Issue(expires_in),
            calls: AtomicUsize::new(0),
            delay: None,
        })
    }

    /// Like `issuing`, but each exchange sleeps first so callers can pile up.
    pub fn slow(expires_in: i64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Issue(expires_in),
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        })
    }

    pub fn scripted(responses: Vec<Result<TokenGrant, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Queue(Mutex::new(responses.into())),
            calls: AtomicUsize::new(0),
            delay: None,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialExchange for ScriptedExchange {
    async fn exchange(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        assert_eq!(credentials.client_id(), "abc");
        assert_eq!(credentials.client_secret(), "xyz");

        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Issue(expires_in) => Ok(grant(&format!("tok{}", n), *expires_in)),
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted token response left"),
        }
    }
}
