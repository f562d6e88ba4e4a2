use std::{
    fs,
    path::{Path, PathBuf},
};

use batchcall_core::outcome::{Outcome, ResultSet, RunMetadata, RunSummary};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

/// On-disk layout of a results file.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultsFile {
    pub metadata: RunMetadata,
    pub summary: RunSummary,
    pub results: Vec<Outcome>,
}

impl From<&ResultSet> for ResultsFile {
    fn from(results: &ResultSet) -> Self {
        Self {
            metadata: results.metadata.to_owned(),
            summary: results.summary(),
            results: results.outcomes.to_owned(),
        }
    }
}

/// `results-<unix-millis>.json`, timestamped by the end of the run.
pub fn results_file_name(results: &ResultSet) -> String {
    format!(
        "results-{}.json",
        results.metadata.finished_at.timestamp_millis()
    )
}

/// Writes `results` as pretty JSON into `dir` and returns the file path.
pub fn write_results(dir: impl AsRef<Path>, results: &ResultSet) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| Error::CreateDir(dir.to_path_buf(), e))?;
    }
    let path = dir.join(results_file_name(results));
    let json = serde_json::to_string_pretty(&ResultsFile::from(results))?;
    fs::write(&path, json).map_err(|source| Error::Write {
        path: path.to_owned(),
        source,
    })?;
    info!("results saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, TxHash, U256};
    use batchcall_core::outcome::Attempt;
    use chrono::{TimeZone, Utc};

    fn result_set() -> ResultSet {
        let finished_at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let attempt = |repetition| Attempt {
            wallet_index: 0,
            repetition,
            total_repetitions: 2,
        };
        let mut ok = Outcome::confirmed(attempt(1), Address::repeat_byte(7));
        ok.tx_hash = Some(TxHash::repeat_byte(1));
        ok.block_number = Some(12);
        ok.gas_used = Some(45_000);
        let failed = Outcome::failed(attempt(2), Address::repeat_byte(7), "gas estimation failed");
        ResultSet {
            metadata: RunMetadata {
                network: "Base Mainnet".to_owned(),
                chain_id: 8453,
                contract_address: Address::repeat_byte(0x42),
                payload: "mint(address)".to_owned(),
                wallet_count: 1,
                concurrency: 1,
                repetitions: 2,
                value: U256::ZERO,
                started_at: finished_at,
                finished_at,
            },
            outcomes: vec![ok, failed],
        }
    }

    #[test]
    fn writes_timestamped_results_file() {
        let dir = tempfile::tempdir().unwrap();
        let results = result_set();
        let path = write_results(dir.path().join("out"), &results).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "results-1700000000123.json"
        );

        let file: ResultsFile =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(file.summary.total, 2);
        assert_eq!(file.summary.succeeded, 1);
        assert_eq!(file.summary.failed, 1);
        assert_eq!(file.summary.total_gas_used, 45_000);
        assert_eq!(file.results, results.outcomes);
        assert_eq!(file.metadata, results.metadata);
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_results(dir.path(), &result_set()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["metadata"]["chainId"], 8453);
        assert_eq!(json["summary"]["totalGasUsed"], 45_000);
        assert_eq!(json["results"][1]["error"], "gas estimation failed");
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        assert!(matches!(
            write_results(blocker.join("sub"), &result_set()),
            Err(Error::CreateDir(..))
        ));
    }
}
