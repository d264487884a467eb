use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{
    ANNOTATION_PAUSED, ANNOTATION_RUNTIME, ANNOTATION_RUNTIME_FAILED, Annotations,
    ResourceVersion, TenantKey, TenantStatus,
};

/// Store-owned record describing one tenant control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantResource {
    /// Namespace and name of the record.
    pub key: TenantKey,
    /// Version assigned by the store on every write.
    #[serde(default)]
    pub resource_version: ResourceVersion,
    /// Set by the store once deletion has been requested.
    #[serde(default, with = "opt_time_serde", skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<SystemTime>,
    /// Reported control plane status (unset until the first status write).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TenantStatus>,
    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
}

impl TenantResource {
    /// Create a fresh record without status, annotations or finalizers.
    pub fn new(key: TenantKey) -> Self {
        Self {
            key,
            resource_version: 0,
            deletion_timestamp: None,
            status: None,
            annotations: Annotations::new(),
            finalizers: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: TenantStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Status with the unset case folded into [`TenantStatus::Provisioning`].
    pub fn effective_status(&self) -> TenantStatus {
        self.status.unwrap_or(TenantStatus::Provisioning)
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.annotations.contains_key(ANNOTATION_PAUSED)
    }

    /// Returns `true` if the last runtime start attempt was recorded as failed.
    pub fn runtime_failed(&self) -> bool {
        self.annotations
            .get(ANNOTATION_RUNTIME)
            .is_some_and(|v| v == ANNOTATION_RUNTIME_FAILED)
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    /// Add a finalizer, returning `false` if it was already present.
    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.finalizers.push(finalizer.to_string());
        true
    }

    /// Remove a finalizer, returning `false` if it was not present.
    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|f| f != finalizer);
        before != self.finalizers.len()
    }
}

mod opt_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => {
                let since_epoch = t
                    .duration_since(UNIX_EPOCH)
                    .map_err(serde::ser::Error::custom)?;
                Some(since_epoch.as_secs()).serialize(serializer)
            }
            None => None::<u64>.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(|s| UNIX_EPOCH + Duration::from_secs(s)))
    }
}
