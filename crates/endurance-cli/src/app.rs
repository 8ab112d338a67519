//! Wiring shared by the commands: storage, settings, catalog, session log
//! and the timer restored from its last saved state.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use endurance_core::{
    Database, KvStore, PresetCatalog, SessionLog, SessionTracker, Settings, SystemClock,
    TimerCore, TimerState,
};

use crate::alerts::TerminalAlerts;

const TIMER_STATE_KEY: &str = "timer.state";

pub struct App {
    pub db: Rc<Database>,
    pub settings: Settings,
    pub catalog: PresetCatalog,
    pub log: Rc<RefCell<SessionLog>>,
}

impl App {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let db = Rc::new(Database::open()?);
        let settings = Settings::load(db.as_ref());
        let catalog = PresetCatalog::load(db.clone());
        let log = Rc::new(RefCell::new(SessionLog::new(
            db.clone(),
            settings.daily_goal_minutes,
        )));
        Ok(Self {
            db,
            settings,
            catalog,
            log,
        })
    }

    /// The timer as the previous invocation left it, with the session
    /// tracker, persistence and terminal alerts attached.
    pub fn timer(&self) -> TimerCore {
        let mut core = match self.load_state() {
            Some(state) => TimerCore::restore(state, self.settings.clone(), SystemClock),
            None => {
                let mut settings = self.settings.clone();
                if settings.last_configuration.is_none() {
                    settings.last_configuration = Some(self.catalog.default_preset());
                }
                TimerCore::new(settings, SystemClock)
            }
        }
        .with_store(self.db.clone())
        .with_alerts(TerminalAlerts);
        core.subscribe(SessionTracker::new(self.log.clone()));
        core
    }

    fn load_state(&self) -> Option<TimerState> {
        let raw = match self.db.kv_get(TIMER_STATE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read saved timer state");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable timer state");
                None
            }
        }
    }

    pub fn save_timer(&self, core: &TimerCore) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string(core.state())?;
        self.db.kv_set(TIMER_STATE_KEY, &json)?;
        Ok(())
    }
}
