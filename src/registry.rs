//! # Session Registry
//!
//! Maps opaque poll tokens to the JotForm credentials they stand in for, so the app key never
//! has to reach the browser.
//!
//! ## Layout
//! - `token -> composite`: used by every proxied request to recover the credentials
//! - `composite -> token`: used by registration to hand back the existing token
//!
//! The composite is `appKey-pollId` with `\` and `-` escaped inside each field. Values without
//! either character are byte-identical to the plain `appKey-pollId` join older deployments wrote.
//!
//! ## Races
//! The forward entry is written first and the reverse entry goes through a conditional write.
//! When two first registrations of the same pair race, the loser adopts the winner's token. Its
//! own forward entry stays behind, resolvable but never handed out.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{error::AppError, store::KeyValueStore};

const SEPARATOR: char = '-';
const ESCAPE: char = '\\';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "appKey")]
    pub app_key: String,
    #[serde(rename = "pollID")]
    pub poll_id: String,
}

impl Credentials {
    pub fn new(app_key: impl Into<String>, poll_id: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            poll_id: poll_id.into(),
        }
    }

    pub fn composite_key(&self) -> String {
        let mut key = String::with_capacity(self.app_key.len() + self.poll_id.len() + 1);

        escape_into(&mut key, &self.app_key);
        key.push(SEPARATOR);
        escape_into(&mut key, &self.poll_id);

        key
    }

    pub fn from_composite_key(key: &str) -> Option<Self> {
        let mut fields = vec![String::new()];
        let mut chars = key.chars();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some(escaped @ (ESCAPE | SEPARATOR)) => fields.last_mut()?.push(escaped),
                    _ => return None,
                },
                SEPARATOR => fields.push(String::new()),
                other => fields.last_mut()?.push(other),
            }
        }

        let [app_key, poll_id]: [String; 2] = fields.try_into().ok()?;
        Some(Self { app_key, poll_id })
    }
}

fn escape_into(out: &mut String, field: &str) {
    for c in field.chars() {
        if c == ESCAPE || c == SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn KeyValueStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<String, AppError> {
        let composite = credentials.composite_key();

        if let Some(token) = self.store.get(&composite).await? {
            debug!("Poll {} already registered", credentials.poll_id);
            return Ok(token);
        }

        let token = new_token();
        self.store.set(&token, &composite).await?;

        if self.store.set_if_absent(&composite, &token).await? {
            info!("Registered poll {}", credentials.poll_id);
            return Ok(token);
        }

        // Lost a concurrent first registration.
        match self.store.get(&composite).await? {
            Some(winner) => {
                debug!("Poll {} registered concurrently, reusing token", credentials.poll_id);
                Ok(winner)
            }
            None => Err(AppError::Store(
                "reverse registry entry vanished after conditional write".into(),
            )),
        }
    }

    pub async fn resolve(&self, token: &str) -> Result<Credentials, AppError> {
        let composite = self.store.get(token).await?.ok_or_else(|| {
            debug!("Unknown token presented");
            AppError::UnknownToken
        })?;

        Credentials::from_composite_key(&composite).ok_or(AppError::CorruptRecord)
    }
}
