use super::loader::{DepositLoader, read_properties};
use super::model::{Deposit, State};
use super::properties::{
    BAG_STORE_BAG_ID, IDENTIFIER_URN, Properties, STATE_DESCRIPTION, STATE_LABEL,
};
use super::{PROPERTIES_FILE, Result, io_error};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Loads deposits and writes their state back to `deposit.properties`
#[derive(Clone)]
pub struct DepositManager {
    loader: Arc<dyn DepositLoader>,
}

impl DepositManager {
    pub fn new(loader: Arc<dyn DepositLoader>) -> Self {
        Self { loader }
    }

    pub fn load_deposit(&self, path: &Path) -> Result<Deposit> {
        self.loader.load(path)
    }

    /// Rewrite the properties file from the deposit, keeping keys it does not own
    pub fn save_deposit_properties(&self, deposit: &Deposit) -> Result<()> {
        let mut properties = read_or_empty(&deposit.path)?;

        properties.set(STATE_LABEL, deposit.state.label());
        properties.set(STATE_DESCRIPTION, deposit.state_description.as_str());
        if let Some(nbn) = &deposit.nbn {
            properties.set(IDENTIFIER_URN, nbn.as_str());
        }
        properties.set(BAG_STORE_BAG_ID, deposit.bag_id());

        write_properties(&deposit.path, &properties)?;
        debug!(deposit_id = %deposit.id, state = %deposit.state, "Saved deposit properties");
        Ok(())
    }

    /// Record a state on a deposit that may not have loaded; only the
    /// properties file is touched, and it is created when missing
    pub fn update_deposit_state(&self, path: &Path, state: State, message: &str) -> Result<()> {
        let mut properties = read_or_empty(path)?;
        properties.set(STATE_LABEL, state.label());
        properties.set(STATE_DESCRIPTION, message);

        write_properties(path, &properties)?;
        debug!(path = %path.display(), %state, "Updated deposit state");
        Ok(())
    }
}

fn read_or_empty(deposit_dir: &Path) -> Result<Properties> {
    if deposit_dir.join(PROPERTIES_FILE).is_file() {
        read_properties(deposit_dir)
    } else {
        Ok(Properties::new())
    }
}

fn write_properties(deposit_dir: &Path, properties: &Properties) -> Result<()> {
    let path = deposit_dir.join(PROPERTIES_FILE);
    fs::write(&path, properties.to_text()).map_err(io_error(&path))
}
