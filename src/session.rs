//! Per-session context: navigation, map view and cached tables.
//!
//! Each browser session owns one `SessionContext`. Nothing is shared between
//! sessions, so two users loading the same file each hold their own copy.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use log::debug;

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::monitoring::MonitoringTable;
use crate::ranges::{ParameterRange, all_ranges};
use crate::toxicity::ToxicityTable;
use crate::view::{MapStyle, MapViewState, Page};

/// Tables loaded once per session and reused until invalidated
///
/// Failed loads are not remembered: the next access reads the file again.
#[derive(Debug, Default)]
pub struct TableCache {
    concentration: Option<Arc<MonitoringTable>>,
    ranges: Option<Arc<BTreeMap<String, ParameterRange>>>,
    toxicity: Option<Arc<ToxicityTable>>,
}

impl TableCache {
    pub fn concentration(&mut self, config: &DashboardConfig) -> Result<Arc<MonitoringTable>> {
        if let Some(table) = &self.concentration {
            debug!("concentration table served from session cache");
            return Ok(table.clone());
        }
        let table = Arc::new(MonitoringTable::load(
            config.concentration_path(),
            &config.concentration,
        )?);
        self.concentration = Some(table.clone());
        self.ranges = None;
        Ok(table)
    }

    /// Ranges of every parameter of the cached concentration table.
    pub fn ranges(
        &mut self,
        config: &DashboardConfig,
    ) -> Result<Arc<BTreeMap<String, ParameterRange>>> {
        let table = self.concentration(config)?;
        if let Some(ranges) = &self.ranges {
            return Ok(ranges.clone());
        }
        let ranges = Arc::new(all_ranges(&table));
        self.ranges = Some(ranges.clone());
        Ok(ranges)
    }

    pub fn toxicity(&mut self, config: &DashboardConfig) -> Result<Arc<ToxicityTable>> {
        if let Some(table) = &self.toxicity {
            debug!("toxicity table served from session cache");
            return Ok(table.clone());
        }
        let table = Arc::new(ToxicityTable::load(config.toxicity_path(), &config.toxicity)?);
        self.toxicity = Some(table.clone());
        Ok(table)
    }

    pub fn invalidate(&mut self) {
        self.concentration = None;
        self.ranges = None;
        self.toxicity = None;
    }

    pub fn is_empty(&self) -> bool {
        self.concentration.is_none() && self.toxicity.is_none()
    }
}

/// Explicit state handed to every pipeline call.
#[derive(Debug)]
pub struct SessionContext {
    pub page: Page,
    pub view: MapViewState,
    pub style: MapStyle,
    pub selected_parameter: Option<String>,
    pub min_value: Option<f64>,
    pub tables: TableCache,
    last_seen: Instant,
}

impl SessionContext {
    pub fn new(config: &DashboardConfig) -> Self {
        SessionContext {
            page: Page::default(),
            view: MapViewState::from_settings(&config.map),
            style: MapStyle::default(),
            selected_parameter: None,
            min_value: config.map.min_value,
            tables: TableCache::default(),
            last_seen: Instant::now(),
        }
    }

    pub fn navigate(&mut self, page: Page) {
        debug!("navigate {:?} -> {:?}", self.page, page);
        self.page = page;
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }
}

pub type SharedSession = Arc<Mutex<SessionContext>>;

/// All live sessions, keyed by an opaque id
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SharedSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Existing session for `id`, or a fresh one created with `new_id`.
    ///
    /// Returns the id actually in use and whether it was just created.
    pub fn open(
        &self,
        id: Option<&str>,
        new_id: impl FnOnce() -> String,
        config: &DashboardConfig,
    ) -> (String, SharedSession, bool) {
        if let Some(id) = id {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            if let Some(session) = sessions.get(id) {
                session.lock().unwrap_or_else(|e| e.into_inner()).touch();
                return (id.to_string(), session.clone(), false);
            }
        }

        self.purge_expired();
        let id = new_id();
        let session = Arc::new(Mutex::new(SessionContext::new(config)));
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), session.clone());
        debug!("session {} started", id);
        (id, session, true)
    }

    /// Tear a session down. Returns whether it existed.
    pub fn end(&self, id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .is_some();
        if removed {
            debug!("session {} ended", id);
        }
        removed
    }

    /// Drop sessions idle for longer than the TTL.
    pub fn purge_expired(&self) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let ttl = self.ttl;
        sessions.retain(|id, session| {
            let keep = session
                .lock()
                .map(|s| s.idle_for() <= ttl)
                .unwrap_or(false);
            if !keep {
                debug!("session {} expired", id);
            }
            keep
        });
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
