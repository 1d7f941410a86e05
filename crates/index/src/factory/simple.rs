//! Factories for the plain (non-wrapping) merge policies.
//!
//! Each claims the keys it knows and rejects anything left over.

use std::sync::Arc;

use tc_core::IndexSchema;

use super::{MergePolicyFactory, PolicyLoader};
use crate::args::PolicyArgs;
use crate::error::PolicyError;
use crate::policy::{LogDocMergePolicy, MergePolicy, NoMergePolicy, TieredMergePolicy};

#[derive(Debug, Clone, Default)]
pub struct TieredMergePolicyFactory {
    policy: TieredMergePolicy,
}

impl TieredMergePolicyFactory {
    pub fn from_args(mut args: PolicyArgs) -> Result<Self, PolicyError> {
        let mut policy = TieredMergePolicy::default();
        if let Some(v) = args.take_usize("maxMergeAtOnce")? {
            policy.max_merge_at_once = v;
        }
        if let Some(v) = args.take_usize("segmentsPerTier")? {
            policy.segments_per_tier = v;
        }
        if let Some(v) = args.take_f64("maxMergedSegmentMB")? {
            policy.max_merged_segment_mb = v;
        }
        args.ensure_empty("TieredMergePolicyFactory")?;
        Ok(Self { policy })
    }

    pub(crate) fn build(
        _loader: Arc<PolicyLoader>,
        args: PolicyArgs,
        _schema: Arc<IndexSchema>,
    ) -> Result<Box<dyn MergePolicyFactory>, PolicyError> {
        Ok(Box::new(Self::from_args(args)?))
    }
}

impl MergePolicyFactory for TieredMergePolicyFactory {
    fn get_merge_policy(&self) -> Result<Arc<dyn MergePolicy>, PolicyError> {
        Ok(Arc::new(self.policy.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogDocMergePolicyFactory {
    policy: LogDocMergePolicy,
}

impl LogDocMergePolicyFactory {
    pub fn from_args(mut args: PolicyArgs) -> Result<Self, PolicyError> {
        let mut policy = LogDocMergePolicy::default();
        if let Some(v) = args.take_usize("mergeFactor")? {
            policy.merge_factor = v;
        }
        if let Some(v) = args.take_usize("minMergeDocs")? {
            policy.min_merge_docs = v;
        }
        args.ensure_empty("LogDocMergePolicyFactory")?;
        Ok(Self { policy })
    }

    pub(crate) fn build(
        _loader: Arc<PolicyLoader>,
        args: PolicyArgs,
        _schema: Arc<IndexSchema>,
    ) -> Result<Box<dyn MergePolicyFactory>, PolicyError> {
        Ok(Box::new(Self::from_args(args)?))
    }
}

impl MergePolicyFactory for LogDocMergePolicyFactory {
    fn get_merge_policy(&self) -> Result<Arc<dyn MergePolicy>, PolicyError> {
        Ok(Arc::new(self.policy.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoMergePolicyFactory;

impl NoMergePolicyFactory {
    pub(crate) fn build(
        _loader: Arc<PolicyLoader>,
        args: PolicyArgs,
        _schema: Arc<IndexSchema>,
    ) -> Result<Box<dyn MergePolicyFactory>, PolicyError> {
        args.ensure_empty("NoMergePolicyFactory")?;
        Ok(Box::new(NoMergePolicyFactory))
    }
}

impl MergePolicyFactory for NoMergePolicyFactory {
    fn get_merge_policy(&self) -> Result<Arc<dyn MergePolicy>, PolicyError> {
        Ok(Arc::new(NoMergePolicy))
    }
}
