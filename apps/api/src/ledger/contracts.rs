//! Bindings for the deployed job factory and per-job commitment contracts.

use ethers::contract::abigen;

abigen!(
    JobFactory,
    r#"[
        function createJob(bytes32 jobConfigHash, bytes jobOwnerPubEncKey) external returns (address)
        function getJobByConfigHash(bytes32 configHash) external view returns (address)
    ]"#
);

abigen!(
    JobContract,
    r#"[
        function commitEvaluation(bytes32 submissionId, bytes32 resumeHash, bytes32 modelHash, bytes32 scoreHash, bytes32 encEmailHash) external
        function getEvaluation(bytes32 submissionId) external view returns (bytes32, bytes32, bytes32, bytes32, uint256, bool)
    ]"#
);

/// Gas ceiling for `createJob`.
pub const JOB_CREATION_GAS: u64 = 2_000_000;
/// Gas ceiling for `commitEvaluation`.
pub const EVALUATION_GAS: u64 = 200_000;
