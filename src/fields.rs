//! Resolution of the registration boundary fields.

use tracing::debug;

use crate::config::FieldsConfig;
use crate::errors::RegPeriodResult;
use crate::store::{FieldId, RegistrationStore};

/// Identifiers of the start and end fields. Either may be unprovisioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationFields {
    pub start: Option<FieldId>,
    pub end: Option<FieldId>,
}

impl RegistrationFields {
    /// Neither field is provisioned, so there is nothing to enforce.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Look up both fields by shortname. A missing definition is not an error.
pub async fn resolve_fields<S>(
    store: &S,
    names: &FieldsConfig,
) -> RegPeriodResult<RegistrationFields>
where
    S: RegistrationStore + ?Sized,
{
    let fields = RegistrationFields {
        start: store.lookup_field_id(&names.start_shortname).await?,
        end: store.lookup_field_id(&names.end_shortname).await?,
    };

    debug!(
        start_field = ?fields.start,
        end_field = ?fields.end,
        "Resolved registration fields"
    );

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn resolves_each_side_independently() {
        let store = MemoryStore::new();
        let end = store.define_field("endreg").unwrap();

        let fields = resolve_fields(&store, &FieldsConfig::default()).await.unwrap();
        assert_eq!(fields.start, None);
        assert_eq!(fields.end, Some(end));
        assert!(!fields.is_empty());
    }

    #[tokio::test]
    async fn unprovisioned_fields_resolve_to_empty() {
        let store = MemoryStore::new();
        let fields = resolve_fields(&store, &FieldsConfig::default()).await.unwrap();
        assert!(fields.is_empty());
    }

    #[tokio::test]
    async fn honours_custom_shortnames() {
        let store = MemoryStore::new();
        let start = store.define_field("course_open").unwrap();
        let names = FieldsConfig {
            start_shortname: "course_open".to_string(),
            end_shortname: "course_close".to_string(),
        };

        let fields = resolve_fields(&store, &names).await.unwrap();
        assert_eq!(fields.start, Some(start));
        assert_eq!(fields.end, None);
    }
}
