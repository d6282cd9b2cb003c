use serde::{Deserialize, Serialize};

/// What a stage does with a slice it cannot decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Log the failure and carry on with the remaining slices.
    #[default]
    Skip,
    /// Abort the stage on the first undecodable slice.
    Fail,
}
