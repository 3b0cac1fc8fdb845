// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tg_proxy_relay::config::Settings;
use tg_proxy_relay::notify::{
    Channel, DispatchMessage, MessageId, MessageKind, SendError, SendErrorKind,
};

/// In-memory channel with scripted failures.
#[derive(Default)]
pub struct ScriptedChannel {
    pub attempts: Mutex<Vec<MessageKind>>,
    pub delivered: Mutex<Vec<DispatchMessage>>,
    pub pins: Mutex<Vec<MessageId>>,
    /// Remaining failures per message kind before sends succeed; `u32::MAX` = never.
    pub failures: Mutex<HashMap<String, u32>>,
    pub fail_pin: bool,
    /// Set the flag once this many messages have been delivered.
    pub stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, kind: MessageKind, times: u32) -> Self {
        self.failures.lock().insert(kind.to_string(), times);
        self
    }

    pub fn attempts_for(&self, kind: MessageKind) -> usize {
        self.attempts.lock().iter().filter(|k| **k == kind).count()
    }

    pub fn delivered_kinds(&self) -> Vec<MessageKind> {
        self.delivered.lock().iter().map(|m| m.kind).collect()
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send(&self, msg: &DispatchMessage) -> Result<MessageId, SendError> {
        self.attempts.lock().push(msg.kind);

        if let Some(left) = self.failures.lock().get_mut(&msg.kind.to_string()) {
            if *left > 0 {
                if *left != u32::MAX {
                    *left -= 1;
                }
                return Err(SendError::new(SendErrorKind::Network, "scripted failure"));
            }
        }

        let mut delivered = self.delivered.lock();
        delivered.push(msg.clone());
        let count = delivered.len();
        if let Some((n, flag)) = &self.stop_after {
            if count >= *n {
                flag.store(true, Ordering::Relaxed);
            }
        }
        Ok(100 + count as MessageId)
    }

    async fn pin(&self, id: MessageId) -> Result<(), SendError> {
        if self.fail_pin {
            return Err(SendError::new(
                SendErrorKind::Api { code: 400 },
                "not enough rights to pin",
            ));
        }
        self.pins.lock().push(id);
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Dry-run settings plus `pairs`, independent of the process environment.
pub fn settings_with(pairs: &[(&str, &str)]) -> Settings {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .chain(std::iter::once(("DRY_RUN".to_string(), "1".to_string())))
        .collect();
    Settings::from_lookup(move |k| map.get(k).cloned()).expect("test settings")
}
