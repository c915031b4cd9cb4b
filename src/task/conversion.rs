use super::error::ConversionError;
use crate::bag::{AssemblyError, PackageAssembler, PackageFile};
use crate::clients::{BagValidator, IdMinter, VaultCatalog};
use crate::deposit::{Deposit, DepositManager, Outbox, State, find_bag_dir};
use bon::Builder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const ACCEPTED_MESSAGE: &str = "Deposit accepted";

/// What happened to one deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Deposit directory as found in the inbox
    pub path: PathBuf,
    pub state: State,
    pub message: String,
    /// Archive written for an accepted deposit
    pub archive: Option<PathBuf>,
    /// Where the deposit directory ended up; `None` if it could not be moved
    pub moved_to: Option<PathBuf>,
}

impl TaskReport {
    /// The deposit is still in the inbox and needs an operator
    pub fn is_unrecoverable(&self) -> bool {
        self.moved_to.is_none()
    }
}

/// Converts one deposit directory into an RDA bag and routes it to the outbox.
///
/// Every run ends in exactly one of ACCEPTED, REJECTED or FAILED and moves the
/// deposit directory once. Catalog registration is not undone when a later
/// step fails.
#[derive(Builder)]
pub struct ConversionTask {
    manager: DepositManager,
    outbox: Arc<dyn Outbox>,
    validator: Arc<dyn BagValidator>,
    catalog: Arc<dyn VaultCatalog>,
    minter: Arc<dyn IdMinter>,
    assembler: PackageAssembler,
    /// Directory the finished archives are written to
    #[builder(into)]
    output_dir: PathBuf,
}

struct Converted {
    deposit: Deposit,
    archive: PathBuf,
    moved_to: PathBuf,
}

impl ConversionTask {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn run(&self, path: &Path) -> TaskReport {
        info!("Processing deposit");

        match self.convert(path).await {
            Ok(converted) => {
                info!(
                    deposit_id = %converted.deposit.id,
                    archive = %converted.archive.display(),
                    "Deposit accepted"
                );
                TaskReport {
                    path: path.to_path_buf(),
                    state: converted.deposit.state,
                    message: converted.deposit.state_description,
                    archive: Some(converted.archive),
                    moved_to: Some(converted.moved_to),
                }
            }
            Err(e) => self.handle_failed(path, e),
        }
    }

    async fn convert(&self, path: &Path) -> Result<Converted, ConversionError> {
        let bag_dir = find_bag_dir(path)?;

        debug!(bag = %bag_dir.display(), "Validating deposit");
        self.validator.validate(&bag_dir).await?;

        debug!("Loading deposit");
        let manager = self.manager.clone();
        let deposit_path = path.to_path_buf();
        let mut deposit =
            tokio::task::spawn_blocking(move || manager.load_deposit(&deposit_path)).await??;

        self.assign_identifier(&mut deposit).await?;

        let registered = self.catalog.register(&deposit).await?;
        deposit.object_version = Some(registered.object_version);

        let target = self.archive_target(&deposit, registered.object_version)?;
        let (mut deposit, archive) = self.write_archive(deposit, target).await?;
        deposit.set_state(State::Accepted, ACCEPTED_MESSAGE);
        self.manager
            .save_deposit_properties(&deposit)
            .map_err(|e| ConversionError::SystemFailure(format!("Error saving deposit properties: {}", e)))?;

        debug!("Moving deposit to outbox");
        let moved_to = self.outbox.move_accepted(path)?;

        Ok(Converted {
            deposit,
            archive,
            moved_to,
        })
    }

    /// Reuse the predecessor's NBN for updates, mint a new one otherwise
    async fn assign_identifier(&self, deposit: &mut Deposit) -> Result<(), ConversionError> {
        if !deposit.is_update {
            let nbn = self.minter.mint();
            debug!(deposit_id = %deposit.id, nbn, "Minted NBN for new deposit");
            deposit.nbn = Some(nbn);
            return Ok(());
        }

        let token = deposit.is_version_of.clone().ok_or_else(|| {
            ConversionError::ContentInvalid("Update deposit does not name its predecessor".to_string())
        })?;

        let predecessor = self.catalog.find_predecessor(&token).await?.ok_or_else(|| {
            ConversionError::ContentInvalid(format!(
                "Deposit with reference {} not found in vault catalog",
                token
            ))
        })?;

        if predecessor.data_supplier != deposit.supplier() {
            return Err(ConversionError::ContentInvalid(format!(
                "Data supplier in deposit {} does not match the data supplier {} in the vault catalog",
                deposit.supplier(),
                predecessor.data_supplier
            )));
        }

        debug!(deposit_id = %deposit.id, nbn = %predecessor.nbn, "Update of existing dataset");
        deposit.nbn = Some(predecessor.nbn);
        Ok(())
    }

    /// Path of the archive, which must be directly inside the output directory
    fn archive_target(&self, deposit: &Deposit, version: u64) -> Result<PathBuf, ConversionError> {
        let target = deposit
            .archive_file_name(version)
            .map(|name| self.output_dir.join(name))
            .filter(|target| target.parent() == Some(self.output_dir.as_path()))
            .ok_or_else(|| {
                ConversionError::SystemFailure(format!(
                    "Error writing bag: bag id {} does not name a file in {}",
                    deposit.bag_id(),
                    self.output_dir.display()
                ))
            })?;
        Ok(target)
    }

    async fn write_archive(
        &self,
        deposit: Deposit,
        target: PathBuf,
    ) -> Result<(Deposit, PathBuf), ConversionError> {
        let assembler = self.assembler.clone();

        let (deposit, written) = tokio::task::spawn_blocking(move || {
            let written = write_package(&assembler, &deposit, target);
            (deposit, written)
        })
        .await?;

        Ok((deposit, written?))
    }

    /// Record the outcome and move the deposit; fall back to a plain move to
    /// FAILED, and leave the deposit in place if even that fails
    fn handle_failed(&self, path: &Path, failure: ConversionError) -> TaskReport {
        let state = failure.state();
        let message = failure.to_string();
        error!(%state, error = %message, "Deposit failed");

        let recorded = self
            .manager
            .update_deposit_state(path, state, &message)
            .map_err(|e| e.to_string())
            .and_then(|_| {
                match state {
                    State::Rejected => self.outbox.move_rejected(path, &message),
                    _ => self.outbox.move_failed(path, &message),
                }
                .map_err(|e| e.to_string())
            });

        let (state, moved_to) = match recorded {
            Ok(moved) => (state, Some(moved)),
            Err(e) => {
                error!(error = %e, "Failed to update deposit state and move deposit to outbox");
                warn!("Moving deposit to the failed outbox without updating its state");

                match self.outbox.move_failed(path, &message) {
                    Ok(moved) => (State::Failed, Some(moved)),
                    Err(e) => {
                        error!(error = %e, "Failed to move deposit to outbox, nothing left to do");
                        (state, None)
                    }
                }
            }
        };

        TaskReport {
            path: path.to_path_buf(),
            state,
            message,
            archive: None,
            moved_to,
        }
    }
}

/// Write the bag to a temporary file next to `target` and move it into place
fn write_package(
    assembler: &PackageAssembler,
    deposit: &Deposit,
    target: PathBuf,
) -> Result<PathBuf, AssemblyError> {
    let mut package = PackageFile::create(target)?;
    assembler.assemble(deposit, &mut package)?;
    Ok(package.commit()?)
}
