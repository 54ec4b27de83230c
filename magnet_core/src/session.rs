//! Cached session state and copy-out snapshots for read-only consumers.
//!
//! The controller owns `SessionState` and mutates it only after a reply has
//! parsed. Monitors never see the live state: they get `Snapshot` values,
//! either on demand or through a `SnapshotFeed` subscription.

use std::sync::{Arc, Weak};

use crossbeam_channel as xch;
use serde::Serialize;

use crate::types::{HeaterStatus, Output, Polarity, RampStatus, Reading, Sample};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub(crate) output: Option<Reading<Output>>,
    pub(crate) mid: Option<Reading<f64>>,
    pub(crate) max: Option<Reading<f64>>,
    pub(crate) ramp_rate: Option<Reading<f64>>,
    pub(crate) heater_voltage: Option<Reading<f64>>,
    pub(crate) polarity: Option<Reading<Polarity>>,
    pub(crate) heater: HeaterStatus,
    pub(crate) ramp: RampStatus,
}

impl SessionState {
    pub fn output(&self) -> Option<Reading<Output>> {
        self.output
    }
    pub fn mid(&self) -> Option<Reading<f64>> {
        self.mid
    }
    pub fn max(&self) -> Option<Reading<f64>> {
        self.max
    }
    pub fn ramp_rate(&self) -> Option<Reading<f64>> {
        self.ramp_rate
    }
    pub fn heater_voltage(&self) -> Option<Reading<f64>> {
        self.heater_voltage
    }
    pub fn polarity(&self) -> Option<Reading<Polarity>> {
        self.polarity
    }
    pub fn heater(&self) -> HeaterStatus {
        self.heater
    }
    pub fn ramp(&self) -> &RampStatus {
        &self.ramp
    }
}

/// Copy of the session state plus the record at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: SessionState,
    pub record: Vec<Sample>,
}

/// Receiving end handed to a monitor. Dropping it ends the subscription.
pub struct SnapshotFeed {
    rx: xch::Receiver<Snapshot>,
    _alive: Arc<()>,
}

impl SnapshotFeed {
    /// Newest snapshot published since the last call, if any.
    pub fn latest(&self) -> Option<Snapshot> {
        self.rx.try_iter().last()
    }
}

struct Subscriber {
    tx: xch::Sender<Snapshot>,
    // Publisher-side handle on the one-slot channel, used to evict a stale value.
    evict: xch::Receiver<Snapshot>,
    alive: Weak<()>,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Sending side kept by the controller. Each subscriber has a one-slot
/// channel; a newer snapshot evicts one the monitor has not read yet.
#[derive(Default)]
pub(crate) struct Publisher {
    subscribers: Vec<Subscriber>,
}

impl Publisher {
    pub(crate) fn subscribe(&mut self) -> SnapshotFeed {
        self.prune();
        let (tx, rx) = xch::bounded(1);
        let alive = Arc::new(());
        self.subscribers.push(Subscriber {
            tx,
            evict: rx.clone(),
            alive: Arc::downgrade(&alive),
        });
        SnapshotFeed { rx, _alive: alive }
    }

    pub(crate) fn has_subscribers(&self) -> bool {
        self.subscribers.iter().any(Subscriber::is_live)
    }

    /// Forget subscribers whose feed was dropped.
    pub(crate) fn prune(&mut self) {
        self.subscribers.retain(Subscriber::is_live);
    }

    pub(crate) fn publish(&mut self, snapshot: &Snapshot) {
        self.prune();
        for sub in &self.subscribers {
            if sub.tx.is_full() {
                let _ = sub.evict.try_recv();
            }
            if sub.tx.try_send(snapshot.clone()).is_err() {
                tracing::trace!("snapshot dropped; subscriber slot busy");
            }
        }
    }
}
