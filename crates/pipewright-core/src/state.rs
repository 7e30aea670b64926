//! Shared engine state for the CLI and any embedding transport.

use std::sync::Arc;

use crate::backends::Backends;
use crate::config::EngineConfig;
use crate::db::Database;
use crate::engine::RunCoordinator;
use crate::providers::{AzureOpenAiGateway, AzureVisionReader, DocumentAnalysisProvider, LlmGateway};
use crate::skills::SkillRegistry;
use crate::store::{
    AiModelStore, BusinessContextStore, ComponentStore, RunStore, SkillStore, UsageStore,
    WorkflowStore,
};
use crate::usage::UsageRecorder;

pub struct AppStateInner {
    pub db: Database,
    pub config: EngineConfig,
    pub workflow_store: WorkflowStore,
    pub component_store: ComponentStore,
    pub skill_store: SkillStore,
    pub ai_model_store: AiModelStore,
    pub business_context_store: BusinessContextStore,
    pub run_store: RunStore,
    pub usage_store: UsageStore,
    pub skill_registry: SkillRegistry,
    pub llm_gateway: Arc<dyn LlmGateway>,
    pub document_provider: Arc<dyn DocumentAnalysisProvider>,
    pub usage_recorder: UsageRecorder,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    /// Wire stores and the Azure providers from `config`.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let usage_store = UsageStore::new(db.clone());
        Self {
            workflow_store: WorkflowStore::new(db.clone()),
            component_store: ComponentStore::new(db.clone()),
            skill_store: SkillStore::new(db.clone()),
            ai_model_store: AiModelStore::new(db.clone()),
            business_context_store: BusinessContextStore::new(db.clone()),
            run_store: RunStore::new(db.clone()),
            skill_registry: SkillRegistry::new(config.skills_dir.clone(), SkillStore::new(db.clone())),
            llm_gateway: Arc::new(AzureOpenAiGateway::new(config.azure_openai.clone())),
            document_provider: Arc::new(AzureVisionReader::new(config.azure_vision.clone())),
            usage_recorder: UsageRecorder::new(Arc::new(usage_store.clone())),
            usage_store,
            config,
            db,
        }
    }

    pub fn with_llm_gateway(mut self, gateway: Arc<dyn LlmGateway>) -> Self {
        self.llm_gateway = gateway;
        self
    }

    pub fn with_document_provider(mut self, provider: Arc<dyn DocumentAnalysisProvider>) -> Self {
        self.document_provider = provider;
        self
    }

    pub fn backends(&self) -> Backends {
        Backends::new(
            &self.config,
            self.llm_gateway.clone(),
            self.document_provider.clone(),
            self.ai_model_store.clone(),
            self.usage_recorder.clone(),
        )
    }

    pub fn coordinator(&self) -> RunCoordinator {
        RunCoordinator::new(
            self.workflow_store.clone(),
            self.component_store.clone(),
            self.skill_store.clone(),
            self.run_store.clone(),
            Arc::new(self.business_context_store.clone()),
            Arc::new(self.backends()),
            self.config.max_steps,
        )
    }
}
