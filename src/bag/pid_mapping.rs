//! `metadata/pid-mapping.txt`: payload file identifiers to bag paths

use crate::deposit::Deposit;

pub const PID_MAPPING_PATH: &str = "metadata/pid-mapping.txt";

pub fn render(deposit: &Deposit) -> String {
    deposit
        .payload_files
        .iter()
        .map(|file| format!("{}  {}\n", file.id, file.bag_path()))
        .collect()
}
