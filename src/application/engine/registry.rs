//! Registry of flow handlers keyed by flow name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::conversation::FlowName;

use super::handler::FlowHandler;

/// Maps flow names to their handlers.
///
/// Built once at startup; the main menu handler is mandatory and doubles as
/// the fallback for unknown or unregistered flows.
pub struct FlowRegistry {
    handlers: HashMap<FlowName, Arc<dyn FlowHandler>>,
    main_menu: Arc<dyn FlowHandler>,
}

impl FlowRegistry {
    pub fn new(main_menu: Arc<dyn FlowHandler>) -> Self {
        let mut handlers = HashMap::new();
        handlers.insert(main_menu.name(), Arc::clone(&main_menu));
        Self {
            handlers,
            main_menu,
        }
    }

    /// Registers a handler, replacing any previous one for the same flow.
    pub fn register(mut self, handler: Arc<dyn FlowHandler>) -> Self {
        let name = handler.name();
        if name == self.main_menu.name() {
            self.main_menu = Arc::clone(&handler);
        }
        self.handlers.insert(name, handler);
        self
    }

    pub fn get(&self, flow: FlowName) -> Option<Arc<dyn FlowHandler>> {
        self.handlers.get(&flow).cloned()
    }

    pub fn main_menu(&self) -> Arc<dyn FlowHandler> {
        Arc::clone(&self.main_menu)
    }

    pub fn contains(&self, flow: FlowName) -> bool {
        self.handlers.contains_key(&flow)
    }

    pub fn flows(&self) -> Vec<FlowName> {
        let mut flows: Vec<_> = self.handlers.keys().copied().collect();
        flows.sort();
        flows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::{FlowContext, FlowError, StepOutcome};
    use crate::domain::conversation::{FlowDescriptor, IncomingEvent};
    use async_trait::async_trait;

    struct Stub(FlowName);

    #[async_trait]
    impl FlowHandler for Stub {
        fn descriptor(&self) -> &'static FlowDescriptor {
            self.0.descriptor()
        }

        async fn start(&self, _ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
            Ok(())
        }

        async fn handle(
            &self,
            _ctx: &mut FlowContext<'_>,
            _event: &IncomingEvent,
        ) -> Result<StepOutcome, FlowError> {
            Ok(StepOutcome::Advanced)
        }

        async fn prompt_step(&self, _ctx: &mut FlowContext<'_>) -> Result<(), FlowError> {
            Ok(())
        }
    }

    #[test]
    fn main_menu_is_always_registered() {
        let registry = FlowRegistry::new(Arc::new(Stub(FlowName::MainMenu)));

        assert!(registry.contains(FlowName::MainMenu));
        assert!(registry.get(FlowName::OfferManage).is_none());
        assert_eq!(registry.main_menu().name(), FlowName::MainMenu);
    }

    #[test]
    fn register_adds_handlers() {
        let registry = FlowRegistry::new(Arc::new(Stub(FlowName::MainMenu)))
            .register(Arc::new(Stub(FlowName::OfferManage)))
            .register(Arc::new(Stub(FlowName::AgreementList)));

        assert_eq!(
            registry.flows(),
            vec![FlowName::MainMenu, FlowName::AgreementList, FlowName::OfferManage]
        );
    }

    #[test]
    fn default_step_set_comes_from_descriptor() {
        let stub = Stub(FlowName::AgreementList);

        assert!(stub.can_handle_step("view_detail"));
        assert!(!stub.can_handle_step("ask_title"));
        assert_eq!(stub.previous_step("view_detail"), None);
    }
}
