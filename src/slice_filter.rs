use crate::{
    enums::DecodePolicy,
    slice_set::{SliceDecodeError, SliceFile, SliceSet, decode_slice},
};

use log::{info, warn};
use std::{fs, io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SliceFilterError {
    #[error(transparent)]
    Decode(#[from] SliceDecodeError),

    #[error("cannot remove black slice {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub inspected: usize,
    pub removed: usize,
    /// Slices that could not be decoded and were left in place.
    pub undecodable: usize,
}

/// Deletes slices whose stored pixel maximum is zero.
pub struct SliceFilter {
    policy: DecodePolicy,
}

impl SliceFilter {
    pub fn new(policy: DecodePolicy) -> Self {
        Self { policy }
    }

    /// Remove black slices from disk and return the slices that remain.
    pub fn remove_black_slices(
        &self,
        slices: &SliceSet,
    ) -> Result<(SliceSet, FilterReport), SliceFilterError> {
        let mut report = FilterReport::default();
        let mut kept: Vec<SliceFile> = Vec::with_capacity(slices.len());

        for slice in slices.iter() {
            report.inspected += 1;
            let decoded = match decode_slice(&slice.path) {
                Ok(decoded) => decoded,
                Err(err) => match self.policy {
                    DecodePolicy::Fail => return Err(err.into()),
                    DecodePolicy::Skip => {
                        warn!("skipping undecodable slice: {err}");
                        report.undecodable += 1;
                        kept.push(slice.clone());
                        continue;
                    }
                },
            };

            if decoded.max() == 0.0 {
                fs::remove_file(&slice.path).map_err(|source| SliceFilterError::Remove {
                    path: slice.path.clone(),
                    source,
                })?;
                info!("removed black slice: {}", slice.path.display());
                report.removed += 1;
            } else {
                kept.push(slice.clone());
            }
        }

        if report.removed == 0 {
            info!("no black slices found");
        }

        Ok((SliceSet::from_files(kept), report))
    }
}
