/// Messaging collaborator
///
/// Project creation and collaborator addition post a system-generated
/// welcome message. Message persistence lives outside this crate; the engine
/// only hands the message to a [`ChatNotifier`] and never waits on the
/// outcome for its own result.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat delivery failed: {0}")]
    Delivery(String),
}

/// System message addressed to a project's conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeMessage {
    pub project_id: Uuid,
    pub recipients: Vec<Uuid>,
    pub text: String,
}

impl WelcomeMessage {
    pub fn project_created(project_id: Uuid, project_name: &str, recipients: Vec<Uuid>) -> Self {
        Self {
            project_id,
            recipients,
            text: format!("Welcome to {}! This is the start of the project conversation.", project_name),
        }
    }

    pub fn collaborator_joined(
        project_id: Uuid,
        project_name: &str,
        collaborator_name: &str,
        recipients: Vec<Uuid>,
    ) -> Self {
        Self {
            project_id,
            recipients,
            text: format!("{} joined {}. Say hello!", collaborator_name, project_name),
        }
    }
}

#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn send_welcome(&self, message: WelcomeMessage) -> Result<(), ChatError>;
}

/// Default notifier: writes the message to the log only
#[derive(Debug, Default, Clone)]
pub struct LoggingChatNotifier;

#[async_trait]
impl ChatNotifier for LoggingChatNotifier {
    async fn send_welcome(&self, message: WelcomeMessage) -> Result<(), ChatError> {
        info!(
            project_id = %message.project_id,
            recipients = message.recipients.len(),
            text = %message.text,
            "Welcome message"
        );
        Ok(())
    }
}
