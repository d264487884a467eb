use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::ControllerError,
    runtime::{RuntimeContext, Trigger},
};

/// One facet of tenant bootstrapping running inside a tenant runtime.
///
/// The same instance serves every tenant: per-tenant state is reached through
/// the [`RuntimeContext`] passed to each call.
#[async_trait]
pub trait NestedController: Send + Sync + 'static {
    /// Stable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Prepare the controller for a new tenant runtime.
    ///
    /// Any error aborts the start of the whole runtime.
    async fn register(&self, _ctx: &RuntimeContext) -> Result<(), ControllerError> {
        Ok(())
    }

    /// Reconcile the controller's own domain for the tenant.
    ///
    /// Called once when the runtime starts and then once per delivered [`Trigger`].
    async fn reconcile(&self, ctx: &RuntimeContext, trigger: Trigger) -> Result<(), ControllerError>;
}

/// Ordered list of nested controllers started together for every tenant.
#[derive(Clone, Default)]
pub struct ControllerSet {
    controllers: Vec<Arc<dyn NestedController>>,
}

impl ControllerSet {
    #[inline]
    pub fn new() -> Self {
        Self {
            controllers: Vec::new(),
        }
    }

    #[inline]
    pub fn register(&mut self, controller: Arc<dyn NestedController>) {
        self.controllers.push(controller);
    }

    #[inline]
    pub fn with(mut self, controller: Arc<dyn NestedController>) -> Self {
        self.register(controller);
        self
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn NestedController>> {
        self.controllers.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.controllers.iter().map(|c| c.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl NestedController for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn reconcile(&self, _ctx: &RuntimeContext, _t: Trigger) -> Result<(), ControllerError> {
            Ok(())
        }
    }

    #[test]
    fn keeps_registration_order() {
        let mut set = ControllerSet::new().with(Arc::new(Named("dns")));
        set.register(Arc::new(Named("proxy")));

        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert_eq!(set.names(), vec!["dns", "proxy"]);
    }
}
